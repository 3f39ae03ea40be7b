use std::sync::{Arc, Mutex};
use std::time::Duration;

use aac_translator::{
    Gateway, ImageAttachment, LanguageCatalog, Provider, ProviderFuture, ProviderResponse,
    RenderedOutput, Settings, TranslationMode, TranslationSession,
};
use anyhow::anyhow;
use tokio::time::sleep;

/// Answers by looking at the system prompt, recording each user input.
#[derive(Clone, Default)]
struct ScriptedProvider {
    system: String,
    user: String,
    fail_generation: bool,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedProvider {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Provider for ScriptedProvider {
    fn model(&self) -> &str {
        "scripted"
    }

    fn append_system_input(mut self, input: String) -> Self {
        self.system = input;
        self
    }

    fn append_user_input(mut self, input: String) -> Self {
        self.user = input;
        self
    }

    fn append_user_data(self, _data: ImageAttachment) -> Self {
        self
    }

    fn generate(self) -> ProviderFuture {
        Box::pin(async move {
            self.calls.lock().unwrap().push(self.user.clone());
            if self.system.contains("Identify the language") {
                return Ok(ProviderResponse::text("French"));
            }
            if self.fail_generation {
                return Err(anyhow!("service unavailable"));
            }
            if self.system.contains("AAC") {
                return Ok(ProviderResponse::text("I - want - water"));
            }
            Ok(ProviderResponse::text("Hello, how are you?"))
        })
    }
}

fn session(provider: ScriptedProvider) -> TranslationSession<ScriptedProvider> {
    let gateway = Gateway::new(provider, LanguageCatalog::load().unwrap());
    TranslationSession::new(gateway, &Settings::default())
}

#[tokio::test(start_paused = true)]
async fn detect_then_translate() {
    let provider = ScriptedProvider::default();
    let session = session(provider.clone());

    session.set_input_text("Bonjour, comment allez-vous?");
    session.generate().await;
    assert!(provider.calls().is_empty());

    sleep(Duration::from_millis(800)).await;
    assert_eq!(session.snapshot().source_lang, "fr");
    assert!(session.target_options().iter().all(|lang| lang.code != "fr"));

    session.generate().await;
    assert_eq!(
        session.rendered_output(),
        RenderedOutput::Text("Hello, how are you?".to_string())
    );
    assert_eq!(
        provider.calls(),
        vec!["Bonjour, comment allez-vous?", "Bonjour, comment allez-vous?"]
    );
}

#[tokio::test(start_paused = true)]
async fn aac_mode_produces_keyword_chips() {
    let session = session(ScriptedProvider::default());
    session.set_source_lang("en").unwrap();
    session.set_mode(TranslationMode::Aac);
    session.set_input_text("I would like a glass of water");
    session.generate().await;

    assert_eq!(
        session.rendered_output(),
        RenderedOutput::Keywords(vec![
            "I".to_string(),
            "want".to_string(),
            "water".to_string()
        ])
    );
}

#[tokio::test(start_paused = true)]
async fn gateway_failure_surfaces_as_error() {
    let provider = ScriptedProvider {
        fail_generation: true,
        ..ScriptedProvider::default()
    };
    let session = session(provider);
    session.set_source_lang("fr").unwrap();
    session.set_input_text("Bonjour, comment allez-vous?");
    session.generate().await;

    let state = session.snapshot();
    assert!(!state.is_loading);
    assert_eq!(state.output_text, "");
    assert!(state.error.is_some());
}

#[tokio::test(start_paused = true)]
async fn clearing_input_returns_to_auto() {
    let session = session(ScriptedProvider::default());
    session.set_source_lang("fr").unwrap();
    session.set_input_text("Bonjour");
    session.set_input_text("");
    assert_eq!(session.snapshot().source_lang, "auto");
}
