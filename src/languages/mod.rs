use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Pseudo-language offered as a source option only.
pub const AUTO_DETECT: &str = "auto";
pub const AUTO_DETECT_NAME: &str = "Detect Language";
pub const ENGLISH: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct LanguageCatalog {
    languages: Vec<Language>,
}

impl LanguageCatalog {
    pub fn load() -> Result<Self> {
        let raw = include_str!("catalog.json");
        let parsed: CatalogFile =
            serde_json::from_str(raw).with_context(|| "failed to parse language catalog")?;
        Ok(Self::from_languages(parsed.languages))
    }

    pub fn from_languages(languages: Vec<Language>) -> Self {
        let languages = languages
            .into_iter()
            .map(|language| Language {
                code: normalize_code(&language.code),
                name: language.name.trim().to_string(),
            })
            .collect();
        Self { languages }
    }

    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn get(&self, code: &str) -> Option<&Language> {
        let code = normalize_code(code);
        self.languages.iter().find(|language| language.code == code)
    }

    pub fn name(&self, code: &str) -> Option<&str> {
        self.get(code).map(|language| language.name.as_str())
    }

    /// Name shown to the user, including the detect sentinel.
    pub fn display_name(&self, code: &str) -> String {
        if is_auto(code) {
            return AUTO_DETECT_NAME.to_string();
        }
        self.name(code)
            .map(str::to_string)
            .unwrap_or_else(|| normalize_code(code))
    }

    /// Matches an English language name as returned by the model.
    pub fn find_by_name(&self, name: &str) -> Option<&Language> {
        let wanted = name.trim().trim_end_matches('.').trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.languages
            .iter()
            .find(|language| language.name.to_lowercase() == wanted)
    }

    pub fn source_options(&self) -> Vec<Language> {
        let mut options = Vec::with_capacity(self.languages.len() + 1);
        options.push(Language {
            code: AUTO_DETECT.to_string(),
            name: AUTO_DETECT_NAME.to_string(),
        });
        options.extend(self.languages.iter().cloned());
        options
    }

    pub fn target_options(&self, source: &str) -> Vec<Language> {
        let source = normalize_code(source);
        self.languages
            .iter()
            .filter(|language| language.code != source)
            .cloned()
            .collect()
    }

    /// Target to use when `source` would collide with the current target:
    /// English when possible, otherwise the first other catalog entry.
    pub fn fallback_target(&self, source: &str) -> Option<&Language> {
        let source = normalize_code(source);
        if source != ENGLISH
            && let Some(english) = self.get(ENGLISH)
        {
            return Some(english);
        }
        self.languages
            .iter()
            .find(|language| language.code != source)
    }
}

pub fn is_auto(code: &str) -> bool {
    code.trim().eq_ignore_ascii_case(AUTO_DETECT)
}

pub(crate) fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    languages: Vec<Language>,
}
