use anyhow::{bail, Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Environment
    pub environment: String,
    pub port: u16,

    // Glossary tables (<glossary_dir>/pre/<code>.json, <glossary_dir>/post/<code>.json)
    pub glossary_dir: String,

    // Machine translation
    pub google_translate_url: String,

    // OpenAI
    pub openai_api_key: String,
    pub openai_organization_id: Option<String>,
    pub openai_api_url: String,
    pub openai_model: String,
    pub openai_temperature: f32,
    pub openai_tts_model: String,
    pub openai_tts_voice: String,
    pub openai_stt_model: String,

    // Outbound HTTP
    pub request_timeout_secs: u64,

    // Admin API key (glossary reload); admin routes are closed when unset
    pub api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            port: parse_env("PORT", 8080)?,

            glossary_dir: std::env::var("GLOSSARY_DIR")
                .unwrap_or_else(|_| "data/glossary".to_string()),

            google_translate_url: std::env::var("GOOGLE_TRANSLATE_URL")
                .unwrap_or_else(|_| "https://translate.googleapis.com/translate_a/single".to_string()),

            openai_api_key: std::env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY not set")?,
            openai_organization_id: non_empty_env("OPENAI_ORGANIZATION_ID"),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_temperature: parse_env("OPENAI_TEMPERATURE", 1.0)?,
            openai_tts_model: std::env::var("OPENAI_TTS_MODEL")
                .unwrap_or_else(|_| "tts-1".to_string()),
            openai_tts_voice: std::env::var("OPENAI_TTS_VOICE")
                .unwrap_or_else(|_| "alloy".to_string()),
            openai_stt_model: std::env::var("OPENAI_STT_MODEL")
                .unwrap_or_else(|_| "whisper-1".to_string()),

            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 60)?,

            api_key: non_empty_env("API_KEY"),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.openai_api_key.trim().is_empty() {
            bail!("OPENAI_API_KEY must not be empty");
        }
        if !(0.0..=2.0).contains(&self.openai_temperature) {
            bail!(
                "OPENAI_TEMPERATURE must be between 0.0 and 2.0, got {}",
                self.openai_temperature
            );
        }
        if self.request_timeout_secs == 0 {
            bail!("REQUEST_TIMEOUT_SECS must be greater than 0");
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an optional variable, falling back to `default` when unset. A set
/// but unparseable value is an error rather than a silent default.
fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {}={:?}: {}", key, value, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "ENVIRONMENT",
        "PORT",
        "GLOSSARY_DIR",
        "GOOGLE_TRANSLATE_URL",
        "OPENAI_API_KEY",
        "OPENAI_ORGANIZATION_ID",
        "OPENAI_API_URL",
        "OPENAI_MODEL",
        "OPENAI_TEMPERATURE",
        "OPENAI_TTS_MODEL",
        "OPENAI_TTS_VOICE",
        "OPENAI_STT_MODEL",
        "REQUEST_TIMEOUT_SECS",
        "API_KEY",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_requires_openai_key() {
        clear_env();

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY not set"));
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");

        let config = Config::from_env().expect("Should load");

        assert_eq!(config.environment, "development");
        assert_eq!(config.port, 8080);
        assert_eq!(config.glossary_dir, "data/glossary");
        assert_eq!(
            config.google_translate_url,
            "https://translate.googleapis.com/translate_a/single"
        );
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert!((config.openai_temperature - 1.0).abs() < f32::EPSILON);
        assert_eq!(config.openai_tts_model, "tts-1");
        assert_eq!(config.openai_tts_voice, "alloy");
        assert_eq!(config.openai_stt_model, "whisper-1");
        assert_eq!(config.request_timeout_secs, 60);
        assert!(config.openai_organization_id.is_none());
        assert!(config.api_key.is_none());
        assert!(!config.is_production());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("ENVIRONMENT", "production");
        std::env::set_var("PORT", "3000");
        std::env::set_var("GLOSSARY_DIR", "/srv/glossary");
        std::env::set_var("OPENAI_ORGANIZATION_ID", "org-123");
        std::env::set_var("OPENAI_TEMPERATURE", "0.2");
        std::env::set_var("API_KEY", "admin-secret");

        let config = Config::from_env().expect("Should load");

        assert!(config.is_production());
        assert_eq!(config.port, 3000);
        assert_eq!(config.glossary_dir, "/srv/glossary");
        assert_eq!(config.openai_organization_id.as_deref(), Some("org-123"));
        assert!((config.openai_temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.api_key.as_deref(), Some("admin-secret"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_port_is_error() {
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("PORT", "not-a-port");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("Invalid PORT"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_out_of_range_temperature_is_error() {
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("OPENAI_TEMPERATURE", "3.5");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("OPENAI_TEMPERATURE"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_blank_optional_values_are_none() {
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("API_KEY", "  ");

        let config = Config::from_env().expect("Should load");
        assert!(config.api_key.is_none());

        clear_env();
    }
}
