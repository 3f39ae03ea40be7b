use anyhow::{Context, Result};
use tracing::info;

pub mod data;
pub mod detection;
pub mod gateway;
pub mod languages;
pub mod logging;
pub mod prompts;
mod providers;
pub mod session;
pub mod settings;
#[cfg(test)]
mod test_util;

pub use data::ImageAttachment;
pub use detection::{DetectionCoordinator, DetectionPhase};
pub use gateway::{Gateway, GatewayError, GatewayRequest, Operation};
pub use languages::{Language, LanguageCatalog};
pub use providers::{
    Gemini, Provider, ProviderFuture, ProviderResponse, ProviderUsage, resolve_key,
};
pub use session::{RenderedOutput, Session, TranslationMode, TranslationSession};
pub use settings::Settings;

/// Overrides applied on top of the environment settings.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub key: Option<String>,
    pub model: Option<String>,
    pub target_lang: Option<String>,
}

/// Builds a ready session backed by Gemini. Fails when no credential is
/// available.
pub fn build_session(config: &Config) -> Result<TranslationSession<Gemini>> {
    let catalog = LanguageCatalog::load()?;
    let mut settings = settings::load_settings(&catalog)?;
    if let Some(model) = config.model.as_deref()
        && !model.trim().is_empty()
    {
        settings.model = model.trim().to_string();
    }
    if let Some(target) = config.target_lang.as_deref() {
        settings.default_target_lang = settings::catalog_code(&catalog, target)
            .with_context(|| "invalid target language")?;
    }
    let gateway = build_gateway(&settings, config.key.as_deref(), catalog)?;
    Ok(TranslationSession::new(gateway, &settings))
}

pub fn build_gateway(
    settings: &Settings,
    key: Option<&str>,
    catalog: LanguageCatalog,
) -> Result<Gateway<Gemini>> {
    let key = resolve_key(key).with_context(|| "no API key found for Gemini")?;
    let provider = Gemini::new(key)?.with_model(settings.model.clone());
    info!(model = provider.model(), "gateway ready");
    Ok(Gateway::new(provider, catalog))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_requires_a_credential() {
        let catalog = LanguageCatalog::load().unwrap();
        let settings = Settings::default();
        let gateway = build_gateway(&settings, Some("test-key"), catalog.clone()).unwrap();
        assert_eq!(gateway.model(), settings.model);
        assert!(Gemini::new("").is_err());
    }
}
