use anyhow::{Context, Result, anyhow};
use std::time::Duration;

use crate::languages::{ENGLISH, LanguageCatalog, normalize_code};
use crate::providers::DEFAULT_MODEL;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(700);
pub const DEFAULT_MIN_DETECT_CHARS: usize = 10;
pub const DEFAULT_MAX_INPUT_CHARS: usize = 20_000;
pub const DEFAULT_EASY_READ_LEVEL: u8 = 5;

const MODEL_ENV: &str = "AAC_TRANSLATOR_MODEL";
const TARGET_LANG_ENV: &str = "AAC_TRANSLATOR_TARGET_LANG";
const FALLBACK_LANG_ENV: &str = "AAC_TRANSLATOR_FALLBACK_LANG";
const DEBOUNCE_ENV: &str = "AAC_TRANSLATOR_DEBOUNCE_MS";

#[derive(Debug, Clone)]
pub struct Settings {
    pub model: String,
    pub default_target_lang: String,
    /// Source language applied when detection fails or names an unknown
    /// language.
    pub fallback_source_lang: String,
    pub debounce: Duration,
    pub min_detect_chars: usize,
    pub max_input_chars: usize,
    pub default_easy_read_level: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            default_target_lang: ENGLISH.to_string(),
            fallback_source_lang: ENGLISH.to_string(),
            debounce: DEFAULT_DEBOUNCE,
            min_detect_chars: DEFAULT_MIN_DETECT_CHARS,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            default_easy_read_level: DEFAULT_EASY_READ_LEVEL,
        }
    }
}

pub fn load_settings(catalog: &LanguageCatalog) -> Result<Settings> {
    load_settings_from(catalog, |key| std::env::var(key).ok())
}

pub fn load_settings_from<F>(catalog: &LanguageCatalog, lookup: F) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = Settings::default();
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(model) = get(MODEL_ENV) {
        settings.model = model.trim().to_string();
    }
    if let Some(lang) = get(TARGET_LANG_ENV) {
        settings.default_target_lang = catalog_code(catalog, &lang)
            .with_context(|| format!("invalid {}", TARGET_LANG_ENV))?;
    }
    if let Some(lang) = get(FALLBACK_LANG_ENV) {
        settings.fallback_source_lang = catalog_code(catalog, &lang)
            .with_context(|| format!("invalid {}", FALLBACK_LANG_ENV))?;
    }
    if let Some(raw) = get(DEBOUNCE_ENV) {
        let millis = raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid {} '{}'", DEBOUNCE_ENV, raw.trim()))?;
        settings.debounce = Duration::from_millis(millis);
    }
    Ok(settings)
}

pub(crate) fn catalog_code(catalog: &LanguageCatalog, code: &str) -> Result<String> {
    let code = normalize_code(code);
    if catalog.contains(&code) {
        Ok(code)
    } else {
        Err(anyhow!("unknown language code '{}'", code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        let catalog = LanguageCatalog::load()?;
        load_settings_from(&catalog, |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_variables() {
        let settings = load(&[]).unwrap();
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.default_target_lang, "en");
        assert_eq!(settings.fallback_source_lang, "en");
        assert_eq!(settings.debounce, Duration::from_millis(700));
        assert_eq!(settings.max_input_chars, 20_000);
    }

    #[test]
    fn variables_override_defaults() {
        let settings = load(&[
            (MODEL_ENV, "gemini-2.0-flash"),
            (TARGET_LANG_ENV, " ES "),
            (FALLBACK_LANG_ENV, "de"),
            (DEBOUNCE_ENV, "250"),
        ])
        .unwrap();
        assert_eq!(settings.model, "gemini-2.0-flash");
        assert_eq!(settings.default_target_lang, "es");
        assert_eq!(settings.fallback_source_lang, "de");
        assert_eq!(settings.debounce, Duration::from_millis(250));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = load(&[(FALLBACK_LANG_ENV, "xx")]).unwrap_err();
        assert!(format!("{:#}", err).contains("unknown language code 'xx'"));
        assert!(load(&[(DEBOUNCE_ENV, "soon")]).is_err());
        assert!(load(&[(TARGET_LANG_ENV, "auto")]).is_err());
    }

    #[test]
    fn blank_variables_are_ignored() {
        let settings = load(&[(MODEL_ENV, "  ")]).unwrap();
        assert_eq!(settings.model, DEFAULT_MODEL);
    }
}
