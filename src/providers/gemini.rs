use anyhow::anyhow;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{
    Message, MessagePart, MessageRole, Provider, ProviderFuture, ProviderResponse, ProviderUsage,
};
use crate::data::ImageAttachment;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub(crate) const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone)]
pub struct Gemini {
    key: String,
    model: String,
    client: reqwest::Client,
    messages: Vec<Message>,
}

impl Gemini {
    /// Fails when the credential is blank so a gateway can never be built
    /// without one.
    pub fn new(key: impl Into<String>) -> anyhow::Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(anyhow!("Gemini API key is empty"));
        }
        Ok(Self {
            key,
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::Client::new(),
            messages: Vec::new(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model.trim().to_string();
        }
        self
    }

    fn request_body(messages: Vec<Message>) -> Value {
        let (system_inputs, user_inputs): (Vec<Message>, Vec<Message>) = messages
            .into_iter()
            .partition(|message| matches!(message.role, MessageRole::System));

        let system_instruction = system_inputs
            .into_iter()
            .flat_map(|message| message.parts)
            .filter_map(|part| match part {
                MessagePart::Text(text) => Some(text),
                MessagePart::Data(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        // Gemini expects a single user turn; every part goes into it.
        let parts = user_inputs
            .into_iter()
            .flat_map(|message| message.parts)
            .map(|part| match part {
                MessagePart::Text(text) => json!({"text": text}),
                MessagePart::Data(data) => json!({
                    "inline_data": {
                        "mime_type": data.mime,
                        "data": BASE64.encode(&data.bytes)
                    }
                }),
            })
            .collect::<Vec<_>>();

        let mut body = json!({
            "contents": [
                {
                    "role": "user",
                    "parts": parts
                }
            ]
        });
        if !system_instruction.trim().is_empty() {
            body["systemInstruction"] = json!({"parts": [{"text": system_instruction}]});
        }
        body
    }
}

impl Provider for Gemini {
    fn model(&self) -> &str {
        &self.model
    }

    fn append_system_input(mut self, input: String) -> Self {
        self.messages.push(Message::system(input));
        self
    }

    fn append_user_input(mut self, input: String) -> Self {
        self.messages.push(Message::user(input));
        self
    }

    fn append_user_data(mut self, data: ImageAttachment) -> Self {
        self.messages.push(Message::user_data(data));
        self
    }

    fn generate(self) -> ProviderFuture {
        Box::pin(async move {
            let url = format!("{}/{}:generateContent", BASE_URL, self.model);
            let body = Self::request_body(self.messages);

            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", self.key.as_str())
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if status.is_success() {
                return extract_text_response(&text, &self.model);
            }
            Err(anyhow!(
                "Gemini API error ({}): {}",
                status,
                extract_gemini_error(&text).unwrap_or(text)
            ))
        })
    }
}

fn extract_text_response(
    text: &str,
    fallback_model: &str,
) -> Result<ProviderResponse, anyhow::Error> {
    let payload: GeminiResponse = serde_json::from_str(text)
        .map_err(|err| anyhow!("failed to parse Gemini response JSON: {}", err))?;
    let content = payload
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .ok_or_else(|| anyhow!("no candidate returned from Gemini"))?;

    let texts = content
        .parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect::<Vec<_>>();
    let model = payload
        .model_version
        .filter(|value| !value.trim().is_empty())
        .or_else(|| Some(fallback_model.to_string()));
    let usage = payload.usage_metadata.map(|usage| ProviderUsage {
        prompt_tokens: usage.prompt_token_count,
        completion_tokens: usage.candidates_token_count,
        total_tokens: usage.total_token_count,
    });
    Ok(ProviderResponse {
        text: texts.concat(),
        model,
        usage,
    })
}

fn extract_gemini_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<GeminiError>,
    }

    #[derive(Deserialize)]
    struct GeminiError {
        message: Option<String>,
        status: Option<String>,
        code: Option<i32>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    let mut parts = Vec::new();
    if let Some(message) = error.message
        && !message.trim().is_empty()
    {
        parts.push(message);
    }
    if let Some(status) = error.status
        && !status.trim().is_empty()
    {
        parts.push(format!("status: {}", status));
    }
    if let Some(code) = error.code {
        parts.push(format!("code: {}", code));
    }
    if parts.is_empty() {
        Some("unknown error".to_string())
    } else {
        Some(parts.join(" | "))
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
    #[serde(rename = "modelVersion")]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u64>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u64>,
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}
