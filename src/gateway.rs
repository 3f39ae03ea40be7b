use std::fmt;

use tracing::{debug, warn};

use crate::data::ImageAttachment;
use crate::languages::LanguageCatalog;
use crate::prompts;
use crate::providers::Provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Translate,
    Simplify,
    ConvertToAac,
    DetectLanguage,
    ExtractText,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Translate => "translate",
            Operation::Simplify => "simplify",
            Operation::ConvertToAac => "convert_to_aac",
            Operation::DetectLanguage => "detect_language",
            Operation::ExtractText => "extract_text",
        }
    }

    /// An image without text legitimately yields an empty answer.
    fn allows_empty_response(&self) -> bool {
        matches!(self, Operation::ExtractText)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single intent sent through the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayRequest {
    Translate {
        text: String,
        source_lang: String,
        target_lang: String,
    },
    Simplify {
        text: String,
        lang: String,
        level: u8,
    },
    ConvertToAac {
        text: String,
        lang: String,
    },
    DetectLanguage {
        text: String,
    },
    ExtractText {
        image: ImageAttachment,
    },
}

impl GatewayRequest {
    pub fn operation(&self) -> Operation {
        match self {
            GatewayRequest::Translate { .. } => Operation::Translate,
            GatewayRequest::Simplify { .. } => Operation::Simplify,
            GatewayRequest::ConvertToAac { .. } => Operation::ConvertToAac,
            GatewayRequest::DetectLanguage { .. } => Operation::DetectLanguage,
            GatewayRequest::ExtractText { .. } => Operation::ExtractText,
        }
    }

    fn into_prompt(self) -> anyhow::Result<PromptParts> {
        let parts = match self {
            GatewayRequest::Translate {
                text,
                source_lang,
                target_lang,
            } => PromptParts {
                system: prompts::render_translate_prompt(&source_lang, &target_lang)?,
                data: None,
                user: text,
            },
            GatewayRequest::Simplify { text, lang, level } => PromptParts {
                system: prompts::render_simplify_prompt(&lang, level)?,
                data: None,
                user: text,
            },
            GatewayRequest::ConvertToAac { text, lang } => PromptParts {
                system: prompts::render_aac_prompt(&lang)?,
                data: None,
                user: text,
            },
            GatewayRequest::DetectLanguage { text } => PromptParts {
                system: prompts::render_detect_language_prompt()?,
                data: None,
                user: text,
            },
            GatewayRequest::ExtractText { image } => PromptParts {
                system: prompts::render_extract_text_prompt()?,
                data: Some(image),
                user: prompts::EXTRACT_TEXT_USER_INPUT.to_string(),
            },
        };
        Ok(parts)
    }
}

struct PromptParts {
    system: String,
    data: Option<ImageAttachment>,
    user: String,
}

#[derive(Debug)]
pub enum GatewayError {
    /// The prompt could not be built.
    Prompt {
        operation: Operation,
        source: anyhow::Error,
    },
    /// Transport, service or response-format failure.
    Request {
        operation: Operation,
        source: anyhow::Error,
    },
    EmptyResponse {
        operation: Operation,
    },
    /// Detection named a language absent from the catalog.
    UnsupportedLanguage {
        name: String,
    },
    UnsupportedImage {
        source: anyhow::Error,
    },
}

impl GatewayError {
    pub fn operation(&self) -> Operation {
        match self {
            GatewayError::Prompt { operation, .. }
            | GatewayError::Request { operation, .. }
            | GatewayError::EmptyResponse { operation } => *operation,
            GatewayError::UnsupportedLanguage { .. } => Operation::DetectLanguage,
            GatewayError::UnsupportedImage { .. } => Operation::ExtractText,
        }
    }

    /// Message suitable for the session's error banner.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::UnsupportedLanguage { .. } => {
                "The detected language is not supported.".to_string()
            }
            GatewayError::UnsupportedImage { .. } => {
                "Unsupported image. Please use a PNG, JPEG or WebP file.".to_string()
            }
            _ => match self.operation() {
                Operation::ExtractText => {
                    "Failed to extract text from the image. Please try again.".to_string()
                }
                Operation::DetectLanguage => "Failed to detect the language.".to_string(),
                _ => "Failed to get a response from the AI model. Please try again.".to_string(),
            },
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Prompt { operation, source } => {
                write!(f, "failed to build {} prompt: {}", operation, source)
            }
            GatewayError::Request { operation, source } => {
                write!(f, "{} request failed: {}", operation, source)
            }
            GatewayError::EmptyResponse { operation } => {
                write!(f, "{} returned an empty response", operation)
            }
            GatewayError::UnsupportedLanguage { name } => {
                write!(f, "detected language '{}' is not in the catalog", name)
            }
            GatewayError::UnsupportedImage { source } => write!(f, "{}", source),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::Prompt { source, .. }
            | GatewayError::Request { source, .. }
            | GatewayError::UnsupportedImage { source } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Stateless front for the generation endpoint; every operation is exactly
/// one provider call.
#[derive(Debug, Clone)]
pub struct Gateway<P: Provider> {
    provider: P,
    catalog: LanguageCatalog,
}

impl<P: Provider> Gateway<P> {
    pub fn new(provider: P, catalog: LanguageCatalog) -> Self {
        Self { provider, catalog }
    }

    pub fn catalog(&self) -> &LanguageCatalog {
        &self.catalog
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, GatewayError> {
        self.execute(GatewayRequest::Translate {
            text: text.to_string(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        })
        .await
    }

    pub async fn simplify(&self, text: &str, lang: &str, level: u8) -> Result<String, GatewayError> {
        self.execute(GatewayRequest::Simplify {
            text: text.to_string(),
            lang: lang.to_string(),
            level,
        })
        .await
    }

    pub async fn convert_to_aac(&self, text: &str, lang: &str) -> Result<String, GatewayError> {
        self.execute(GatewayRequest::ConvertToAac {
            text: text.to_string(),
            lang: lang.to_string(),
        })
        .await
    }

    /// Returns the catalog code of the detected language.
    pub async fn detect_language(&self, text: &str) -> Result<String, GatewayError> {
        let name = self
            .execute(GatewayRequest::DetectLanguage {
                text: text.to_string(),
            })
            .await?;
        match self.catalog.find_by_name(&name) {
            Some(language) => Ok(language.code.clone()),
            None => Err(GatewayError::UnsupportedLanguage {
                name: name.trim().to_string(),
            }),
        }
    }

    pub async fn extract_text(&self, image: ImageAttachment) -> Result<String, GatewayError> {
        self.execute(GatewayRequest::ExtractText { image }).await
    }

    pub async fn execute(&self, request: GatewayRequest) -> Result<String, GatewayError> {
        let operation = request.operation();
        let prompt = request
            .into_prompt()
            .map_err(|source| GatewayError::Prompt { operation, source })?;

        let mut provider = self.provider.clone().append_system_input(prompt.system);
        if let Some(data) = prompt.data {
            provider = provider.append_user_data(data);
        }
        debug!(operation = operation.as_str(), model = self.model(), "calling model");
        let response = provider
            .append_user_input(prompt.user)
            .generate()
            .await
            .map_err(|source| {
                warn!(operation = operation.as_str(), "model call failed: {:#}", source);
                GatewayError::Request { operation, source }
            })?;

        if let Some(usage) = response.usage.as_ref() {
            debug!(
                operation = operation.as_str(),
                model = response.model.as_deref().unwrap_or("unavailable"),
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "model call finished"
            );
        }

        if response.text.trim().is_empty() && !operation.allows_empty_response() {
            return Err(GatewayError::EmptyResponse { operation });
        }
        Ok(response.text)
    }
}
