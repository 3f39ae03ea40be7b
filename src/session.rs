use anyhow::{Result, anyhow};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::data::ImageAttachment;
use crate::detection::{DetectionCoordinator, DetectionPhase};
use crate::gateway::{Gateway, GatewayError, GatewayRequest};
use crate::languages::{AUTO_DETECT, Language, LanguageCatalog, is_auto, normalize_code};
use crate::prompts::{AAC_SEPARATOR, clamp_level};
use crate::providers::Provider;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TranslationMode {
    Normal,
    EasyRead,
    Aac,
}

impl TranslationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationMode::Normal => "normal",
            TranslationMode::EasyRead => "easy-read",
            TranslationMode::Aac => "aac",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "normal" | "translate" => Some(TranslationMode::Normal),
            "easy-read" | "easyread" | "easy" | "simplify" => Some(TranslationMode::EasyRead),
            "aac" => Some(TranslationMode::Aac),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub mode: TranslationMode,
    pub input_text: String,
    pub output_text: String,
    pub source_lang: String,
    pub target_lang: String,
    pub easy_read_level: u8,
    pub is_loading: bool,
    pub is_detecting_language: bool,
    pub error: Option<String>,
    /// Data URL of the last image the input text was extracted from.
    pub image_preview: Option<String>,
}

impl Session {
    pub fn new(settings: &Settings) -> Self {
        Self {
            mode: TranslationMode::Normal,
            input_text: String::new(),
            output_text: String::new(),
            source_lang: AUTO_DETECT.to_string(),
            target_lang: settings.default_target_lang.clone(),
            easy_read_level: clamp_level(settings.default_easy_read_level),
            is_loading: false,
            is_detecting_language: false,
            error: None,
            image_preview: None,
        }
    }

    pub(crate) fn reconcile_target(&mut self, catalog: &LanguageCatalog) {
        if is_auto(&self.source_lang) || self.source_lang != self.target_lang {
            return;
        }
        if let Some(target) = catalog.fallback_target(&self.source_lang) {
            debug!(
                source = self.source_lang.as_str(),
                target = target.code.as_str(),
                "target collided with source; reassigned"
            );
            self.target_lang = target.code.clone();
        }
    }
}

pub type SharedSession = Arc<Mutex<Session>>;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RenderedOutput {
    Empty,
    Text(String),
    Keywords(Vec<String>),
}

pub fn aac_keywords(output: &str) -> Vec<String> {
    output
        .split(AAC_SEPARATOR)
        .map(str::trim)
        .filter(|keyword| !keyword.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn render_output(session: &Session) -> RenderedOutput {
    if session.is_loading || session.output_text.is_empty() {
        return RenderedOutput::Empty;
    }
    match session.mode {
        TranslationMode::Aac => RenderedOutput::Keywords(aac_keywords(&session.output_text)),
        TranslationMode::Normal | TranslationMode::EasyRead => {
            RenderedOutput::Text(session.output_text.clone())
        }
    }
}

pub fn generation_request(session: &Session, catalog: &LanguageCatalog) -> GatewayRequest {
    let text = session.input_text.clone();
    let source_lang = catalog.display_name(&session.source_lang);
    match session.mode {
        TranslationMode::Normal => GatewayRequest::Translate {
            text,
            source_lang,
            target_lang: catalog.display_name(&session.target_lang),
        },
        TranslationMode::EasyRead => GatewayRequest::Simplify {
            text,
            lang: source_lang,
            level: session.easy_read_level,
        },
        TranslationMode::Aac => GatewayRequest::ConvertToAac {
            text,
            lang: source_lang,
        },
    }
}

pub struct TranslationSession<P: Provider> {
    gateway: Arc<Gateway<P>>,
    session: SharedSession,
    detection: DetectionCoordinator<P>,
    max_input_chars: usize,
}

impl<P: Provider> TranslationSession<P> {
    pub fn new(gateway: Gateway<P>, settings: &Settings) -> Self {
        let gateway = Arc::new(gateway);
        let session = Arc::new(Mutex::new(Session::new(settings)));
        let detection =
            DetectionCoordinator::new(Arc::clone(&gateway), Arc::clone(&session), settings);
        Self {
            gateway,
            session,
            detection,
            max_input_chars: settings.max_input_chars,
        }
    }

    pub fn snapshot(&self) -> Session {
        lock(&self.session).clone()
    }

    pub fn catalog(&self) -> &LanguageCatalog {
        self.gateway.catalog()
    }

    pub fn detection_phase(&self) -> DetectionPhase {
        self.detection.phase()
    }

    pub fn source_options(&self) -> Vec<Language> {
        self.catalog().source_options()
    }

    pub fn target_options(&self) -> Vec<Language> {
        let source = lock(&self.session).source_lang.clone();
        self.catalog().target_options(&source)
    }

    pub fn rendered_output(&self) -> RenderedOutput {
        render_output(&lock(&self.session))
    }

    pub fn set_mode(&self, mode: TranslationMode) {
        lock(&self.session).mode = mode;
    }

    pub fn set_easy_read_level(&self, level: u8) {
        lock(&self.session).easy_read_level = clamp_level(level);
    }

    pub fn set_input_text(&self, text: impl Into<String>) {
        let text = self.bound_input(text.into());
        lock(&self.session).input_text = text;
        self.detection.on_input_changed();
    }

    pub fn set_source_lang(&self, code: &str) -> Result<()> {
        let code = if is_auto(code) {
            AUTO_DETECT.to_string()
        } else {
            let code = normalize_code(code);
            if !self.catalog().contains(&code) {
                return Err(anyhow!("unknown source language '{}'", code));
            }
            code
        };
        {
            let mut session = lock(&self.session);
            session.source_lang = code;
            session.reconcile_target(self.gateway.catalog());
        }
        self.detection.on_source_changed();
        Ok(())
    }

    pub fn set_target_lang(&self, code: &str) -> Result<()> {
        let code = normalize_code(code);
        if !self.catalog().contains(&code) {
            return Err(anyhow!("unknown target language '{}'", code));
        }
        let mut session = lock(&self.session);
        if session.source_lang == code {
            return Err(anyhow!(
                "target language '{}' must differ from the source language",
                code
            ));
        }
        session.target_lang = code;
        Ok(())
    }

    pub fn swap_languages(&self) -> bool {
        let mut session = lock(&self.session);
        if session.mode != TranslationMode::Normal || is_auto(&session.source_lang) {
            debug!("swap ignored");
            return false;
        }
        let session = &mut *session;
        std::mem::swap(&mut session.source_lang, &mut session.target_lang);
        true
    }

    pub async fn generate(&self) {
        let Some(request) = self.begin_generation() else {
            return;
        };
        let operation = request.operation();
        info!(operation = operation.as_str(), "generating");
        let result = self.gateway.execute(request).await;

        let mut session = lock(&self.session);
        match result {
            Ok(text) => session.output_text = text,
            Err(err) => {
                warn!(operation = operation.as_str(), "generation failed: {}", err);
                session.error = Some(err.user_message());
            }
        }
        session.is_loading = false;
    }

    fn begin_generation(&self) -> Option<GatewayRequest> {
        let mut session = lock(&self.session);
        if session.is_loading {
            debug!("generation already in flight; ignoring");
            return None;
        }
        if session.input_text.trim().is_empty() || is_auto(&session.source_lang) {
            debug!("nothing to generate yet");
            return None;
        }
        let request = generation_request(&session, self.gateway.catalog());
        session.is_loading = true;
        session.error = None;
        session.output_text.clear();
        Some(request)
    }

    pub async fn upload_image(&self, bytes: Vec<u8>, mime: &str) {
        {
            let mut session = lock(&self.session);
            if session.is_loading {
                debug!("image ignored while a request is in flight");
                return;
            }
            session.is_loading = true;
            session.error = None;
            session.output_text.clear();
        }

        let outcome = self.extract_from_image(bytes, mime).await;

        let applied = {
            let mut session = lock(&self.session);
            session.is_loading = false;
            match outcome {
                Ok((text, preview)) => {
                    session.input_text = self.bound_input(text);
                    session.image_preview = Some(preview);
                    true
                }
                Err(err) => {
                    warn!("image extraction failed: {}", err);
                    session.error = Some(err.user_message());
                    false
                }
            }
        };
        if applied {
            self.detection.on_input_changed();
        }
    }

    async fn extract_from_image(
        &self,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Result<(String, String), GatewayError> {
        let image = ImageAttachment::from_bytes(bytes, Some(mime))
            .map_err(|source| GatewayError::UnsupportedImage { source })?;
        let preview = image.preview_url();
        let text = self.gateway.extract_text(image).await?;
        Ok((text, preview))
    }

    fn bound_input(&self, text: String) -> String {
        if text.chars().count() <= self.max_input_chars {
            return text;
        }
        debug!(limit = self.max_input_chars, "input truncated");
        text.chars().take(self.max_input_chars).collect()
    }
}
