use anyhow::{Result, anyhow};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

use crate::data::ImageAttachment;

mod gemini;

pub use gemini::Gemini;
pub(crate) use gemini::DEFAULT_MODEL;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProviderUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderResponse {
    pub text: String,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

impl ProviderResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
            usage: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone)]
pub enum MessagePart {
    Text(String),
    Data(ImageAttachment),
}

impl Message {
    pub fn system(content: String) -> Self {
        Self {
            role: MessageRole::System,
            parts: vec![MessagePart::Text(content)],
        }
    }

    pub fn user(content: String) -> Self {
        Self {
            role: MessageRole::User,
            parts: vec![MessagePart::Text(content)],
        }
    }

    pub fn user_data(data: ImageAttachment) -> Self {
        Self {
            role: MessageRole::User,
            parts: vec![MessagePart::Data(data)],
        }
    }
}

pub type ProviderFuture = Pin<Box<dyn Future<Output = Result<ProviderResponse>> + Send>>;

/// One request/response exchange with a text generation endpoint.
///
/// Builders consume `self` so a shared, configured provider can be cloned
/// per call without leaking messages between calls.
pub trait Provider: Clone + Send + Sync + 'static {
    fn model(&self) -> &str;
    fn append_system_input(self, input: String) -> Self;
    fn append_user_input(self, input: String) -> Self;
    fn append_user_data(self, data: ImageAttachment) -> Self;
    fn generate(self) -> ProviderFuture;
}

pub fn resolve_key(override_key: Option<&str>) -> Result<String> {
    if let Some(key) = override_key
        && !key.trim().is_empty()
    {
        return Ok(key.trim().to_string());
    }
    get_env("GEMINI_API_KEY")
        .or_else(|| get_env("GOOGLE_API_KEY"))
        .ok_or_else(|| anyhow!("API key not found (checked GEMINI_API_KEY, GOOGLE_API_KEY)"))
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::resolve_key;

    #[test]
    fn explicit_key_wins() {
        assert_eq!(resolve_key(Some("  secret ")).unwrap(), "secret");
    }
}
