//! Language type: validated language handle.
//!
//! `Language` can only be constructed for codes present and enabled in the
//! registry, so glossary paths and provider calls never see an unknown code.

use crate::i18n::{LanguageConfig, LanguageRegistry};
use anyhow::{bail, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A validated language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Language {
    code: &'static str,
}

impl Language {
    pub const AUTO: Language = Language { code: "auto" };
    pub const ENGLISH: Language = Language { code: "en" };
    pub const GUJARATI: Language = Language { code: "gu" };

    /// Create a Language from a language code string.
    ///
    /// # Returns
    /// * `Ok(Language)` if the code is valid and the language is enabled
    /// * `Err` if the code is not found or the language is disabled
    pub fn from_code(code: &str) -> Result<Language> {
        let registry = LanguageRegistry::get();

        match registry.get_by_code(code) {
            Some(config) if config.enabled => Ok(Language { code: config.code }),
            Some(_) => bail!("Language '{}' is not enabled", code),
            None => bail!("Unknown language code: '{}'", code),
        }
    }

    /// Like `from_code`, but also rejects languages that cannot be translated
    /// into (`auto`).
    pub fn target_from_code(code: &str) -> Result<Language> {
        let language = Language::from_code(code)?;
        if !language.is_target() {
            let targets: Vec<&str> = LanguageRegistry::get()
                .list_targets()
                .iter()
                .map(|lang| lang.code)
                .collect();
            bail!(
                "Language '{}' cannot be a translation target (expected one of: {})",
                code,
                targets.join(", ")
            );
        }
        Ok(language)
    }

    /// The pivot language summaries and bulletins are generated in.
    pub fn canonical() -> Language {
        let config = LanguageRegistry::get().canonical();
        Language { code: config.code }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the full language configuration from the registry.
    ///
    /// # Panics
    /// Panics if the code is missing from the registry, which cannot happen
    /// for values built through `from_code` or the constants.
    pub fn config(&self) -> &'static LanguageConfig {
        LanguageRegistry::get()
            .get_by_code(self.code)
            .expect("Language code should always be valid")
    }

    pub fn is_canonical(&self) -> bool {
        self.config().is_canonical
    }

    /// Whether the language can be requested as a translation target.
    pub fn is_target(&self) -> bool {
        self.config().is_target
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code)
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Language::from_code(&code).map_err(serde::de::Error::custom)
    }
}

/// `deserialize_with` helper for fields that name a translation target.
pub fn deserialize_target<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Language, D::Error> {
    let code = String::deserialize(deserializer)?;
    Language::target_from_code(&code).map_err(serde::de::Error::custom)
}
