use thiserror::Error;

/// Failure talking to an external provider (translation, LLM, audio).
///
/// Provider failures are never retried; they propagate to the caller as-is.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Failed to reach {provider}: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Unexpected response from {provider}: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn http(provider: &'static str, source: reqwest::Error) -> Self {
        Self::Http { provider, source }
    }

    pub fn invalid(provider: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider,
            message: message.into(),
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            Self::Http { provider, .. }
            | Self::Api { provider, .. }
            | Self::InvalidResponse { provider, .. } => *provider,
        }
    }
}

/// Failure of a translation run.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Language '{0}' cannot be a translation target")]
    InvalidTarget(&'static str),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Speech-to-text failure, separating the one case callers report specially.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Language is not supported by the transcription model")]
    UnsupportedLanguage,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
