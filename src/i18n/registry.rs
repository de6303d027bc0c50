//! Language registry: the language codes the service accepts.
//!
//! The registry is built once on first access with `OnceLock` and is
//! immutable afterwards. Codes are the two-letter codes the translation
//! provider expects, plus `auto` for provider-side source detection.

use serde::Serialize;
use std::sync::OnceLock;

/// Configuration for a supported language.
#[derive(Debug, Clone, Serialize)]
pub struct LanguageConfig {
    /// Provider language code (e.g., "en", "gu", "auto")
    pub code: &'static str,

    /// English name of the language (e.g., "English", "Gujarati")
    pub name: &'static str,

    /// Native name of the language (e.g., "English", "ગુજરાતી")
    pub native_name: &'static str,

    /// Whether this is the pivot language summaries and bulletins are generated in
    pub is_canonical: bool,

    /// Whether the language may be requested as a translation target
    pub is_target: bool,

    /// Whether this language is enabled for use
    pub enabled: bool,
}

/// Global language registry singleton.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Get a language configuration by its code.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// Get all enabled languages.
    pub fn list_enabled(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().filter(|lang| lang.enabled).collect()
    }

    /// Get all enabled languages that can be translated into.
    pub fn list_targets(&self) -> Vec<&LanguageConfig> {
        self.languages
            .iter()
            .filter(|lang| lang.enabled && lang.is_target)
            .collect()
    }

    /// Get the canonical language configuration.
    ///
    /// # Panics
    /// Panics if the registry does not define exactly one canonical language.
    pub fn canonical(&self) -> &LanguageConfig {
        let canonical_langs: Vec<_> = self
            .languages
            .iter()
            .filter(|lang| lang.is_canonical)
            .collect();

        match canonical_langs.len() {
            0 => panic!("No canonical language found in registry"),
            1 => canonical_langs[0],
            _ => panic!("Multiple canonical languages found in registry"),
        }
    }
}

fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            code: "auto",
            name: "Auto Detect",
            native_name: "Auto Detect",
            is_canonical: false,
            is_target: false,
            enabled: true,
        },
        LanguageConfig {
            code: "en",
            name: "English",
            native_name: "English",
            is_canonical: true,
            is_target: true,
            enabled: true,
        },
        LanguageConfig {
            code: "gu",
            name: "Gujarati",
            native_name: "ગુજરાતી",
            is_canonical: false,
            is_target: true,
            enabled: true,
        },
    ]
}
