//! HTTP API over the request handler.

use crate::config::Config;
use crate::error::{ProviderError, TranslationError};
use crate::glossary::GlossaryStore;
use crate::google;
use crate::handler::{
    ChatReply, Envelope, FeatureTranslation, FeatureTranslationRequest, RequestHandler,
    SpeechToTextReply,
};
use crate::i18n::{Language, LanguageConfig, LanguageRegistry};
use crate::openai::{ChatTurn, Difficulty, QuestionFormat};
use crate::security::is_admin_authorized;
use crate::translation::{TranslationRequest, TranslationResult};
use axum::{
    extract::{Json, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub const ADMIN_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub handler: RequestHandler,
    pub glossary: Arc<GlossaryStore>,
}

/// Errors that end a request with a non-200 status.
///
/// Response bodies carry a fixed message per code; upstream detail (status,
/// provider body) only goes to the log.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Upstream(#[from] ProviderError),

    #[error("Language '{0}' cannot be a translation target")]
    InvalidTarget(&'static str),

    #[error("Invalid or missing API key")]
    Forbidden,
}

impl From<TranslationError> for ApiError {
    fn from(err: TranslationError) -> Self {
        match err {
            TranslationError::InvalidTarget(code) => ApiError::InvalidTarget(code),
            TranslationError::Provider(e) => ApiError::Upstream(e),
        }
    }
}

impl ApiError {
    fn is_translation_failure(&self) -> bool {
        matches!(self, ApiError::Upstream(e) if e.provider() == google::PROVIDER)
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Upstream(_) if self.is_translation_failure() => "TRANSLATION_FAILED",
            ApiError::Upstream(_) => "AI_PROVIDER_FAILED",
            ApiError::InvalidTarget(_) => "UNSUPPORTED_TARGET_LANGUAGE",
            ApiError::Forbidden => "FORBIDDEN",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Upstream(_) if self.is_translation_failure() => {
                "Translation failed".to_string()
            }
            ApiError::Upstream(_) => "AI provider request failed".to_string(),
            ApiError::InvalidTarget(_) | ApiError::Forbidden => self.to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::InvalidTarget(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Upstream(e) = &self {
            error!("Upstream provider failed: {}", e);
        }
        (
            self.status(),
            Json(serde_json::json!({
                "error": true,
                "message": self.message(),
                "code": self.code(),
            })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsBody {
    pub text: String,
    pub difficulty_level: Difficulty,
    pub format: QuestionFormat,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    pub chats: Vec<ChatTurn>,
    #[serde(deserialize_with = "crate::i18n::deserialize_target")]
    pub target_language: Language,
}

#[derive(Debug, Deserialize)]
pub struct SpeechToTextBody {
    pub audio: Vec<u8>,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct TextToSpeechBody {
    pub input: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/languages", get(list_languages))
        // Translation
        .route("/api/translate", post(translate))
        .route("/api/translate/features", post(translate_with_features))
        // AI features
        .route("/api/summarize", post(summarize))
        .route("/api/bulletins", post(bulletins))
        .route("/api/questions", post(generate_questions))
        .route("/api/chat", post(chat))
        .route("/api/speech-to-text", post(speech_to_text))
        .route("/api/text-to-speech", post(text_to_speech))
        // Admin
        .route("/admin/glossary/reload", post(reload_glossary))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_languages() -> Json<Vec<&'static LanguageConfig>> {
    Json(LanguageRegistry::get().list_enabled())
}

async fn translate(
    State(state): State<AppState>,
    Json(request): Json<TranslationRequest>,
) -> Result<Json<TranslationResult>, ApiError> {
    Ok(Json(state.handler.translate(request).await?))
}

async fn translate_with_features(
    State(state): State<AppState>,
    Json(request): Json<FeatureTranslationRequest>,
) -> Result<Json<Envelope<FeatureTranslation>>, ApiError> {
    Ok(Json(state.handler.translate_with_features(request).await?))
}

async fn summarize(
    State(state): State<AppState>,
    Json(body): Json<TextBody>,
) -> Result<Json<Envelope<String>>, ApiError> {
    Ok(Json(state.handler.summarize(&body.text).await?))
}

async fn bulletins(
    State(state): State<AppState>,
    Json(body): Json<TextBody>,
) -> Result<Json<Envelope<String>>, ApiError> {
    Ok(Json(state.handler.bulletins(&body.text).await?))
}

async fn generate_questions(
    State(state): State<AppState>,
    Json(body): Json<QuestionsBody>,
) -> Result<Json<String>, ApiError> {
    let questions = state
        .handler
        .generate_questions(&body.text, body.difficulty_level, body.format)
        .await?;
    Ok(Json(questions))
}

async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatReply>, ApiError> {
    Ok(Json(state.handler.chat(&body.chats, body.target_language).await?))
}

async fn speech_to_text(
    State(state): State<AppState>,
    Json(body): Json<SpeechToTextBody>,
) -> Json<SpeechToTextReply> {
    Json(
        state
            .handler
            .speech_to_text(body.audio, &body.mime_type, &body.language)
            .await,
    )
}

async fn text_to_speech(
    State(state): State<AppState>,
    Json(body): Json<TextToSpeechBody>,
) -> Result<impl IntoResponse, ApiError> {
    let audio = state.handler.text_to_speech(&body.input).await?;
    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio))
}

/// POST /admin/glossary/reload
///
/// Drops cached glossary tables so edits on disk take effect on the next
/// request.
async fn reload_glossary(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let provided = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if !is_admin_authorized(state.config.api_key.as_deref(), provided) {
        warn!("Rejected glossary reload: invalid or missing API key");
        return Err(ApiError::Forbidden);
    }

    let cleared = state.glossary.invalidate().await;
    info!(
        "Glossary cache cleared ({} tables) under {}",
        cleared,
        state.glossary.root().display()
    );

    Ok(Json(serde_json::json!({
        "error": false,
        "message": "Glossary cache cleared",
        "cleared": cleared,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_failure_maps_to_bad_gateway() {
        let err = ApiError::from(ProviderError::Api {
            provider: google::PROVIDER,
            status: 500,
            body: "down".to_string(),
        });

        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code(), "TRANSLATION_FAILED");
    }

    #[test]
    fn test_ai_failure_has_its_own_code() {
        let err = ApiError::from(ProviderError::invalid("OpenAI", "no choices"));

        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code(), "AI_PROVIDER_FAILED");
    }

    #[tokio::test]
    async fn test_error_body_hides_upstream_detail() {
        let err = ApiError::from(ProviderError::Api {
            provider: google::PROVIDER,
            status: 500,
            body: "internal stack trace".to_string(),
        });

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "error": true,
                "message": "Translation failed",
                "code": "TRANSLATION_FAILED"
            })
        );
    }

    #[test]
    fn test_ai_failure_message_is_fixed() {
        let err = ApiError::from(ProviderError::Api {
            provider: "OpenAI",
            status: 429,
            body: "rate limited for org-123".to_string(),
        });

        assert_eq!(err.message(), "AI provider request failed");
    }

    #[test]
    fn test_invalid_target_is_unprocessable() {
        let err = ApiError::from(TranslationError::InvalidTarget("auto"));

        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "UNSUPPORTED_TARGET_LANGUAGE");
        assert_eq!(err.message(), "Language 'auto' cannot be a translation target");
    }

    #[test]
    fn test_translation_error_keeps_provider_code() {
        let err = ApiError::from(TranslationError::from(ProviderError::invalid("OpenAI", "x")));
        assert_eq!(err.code(), "AI_PROVIDER_FAILED");
    }

    #[test]
    fn test_chat_body_rejects_auto_target() {
        let result = serde_json::from_str::<ChatBody>(
            r#"{"chats": [{"role": "user", "message": "hi"}], "targetLanguage": "auto"}"#,
        );
        assert!(result.is_err());

        let body: ChatBody = serde_json::from_str(
            r#"{"chats": [{"role": "user", "message": "hi"}], "targetLanguage": "gu"}"#,
        )
        .unwrap();
        assert_eq!(body.target_language, Language::GUJARATI);
    }

    #[test]
    fn test_forbidden() {
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::Forbidden.code(), "FORBIDDEN");
    }

    #[test]
    fn test_speech_body_uses_type_field() {
        let body: SpeechToTextBody = serde_json::from_str(
            r#"{"audio": [1, 2, 3], "type": "audio/webm", "language": "gu"}"#,
        )
        .unwrap();

        assert_eq!(body.audio, vec![1, 2, 3]);
        assert_eq!(body.mime_type, "audio/webm");
    }

    #[test]
    fn test_questions_body() {
        let body: QuestionsBody = serde_json::from_str(
            r#"{"text": "t", "difficultyLevel": "hard", "format": "true-false"}"#,
        )
        .unwrap();

        assert_eq!(body.difficulty_level, Difficulty::Hard);
        assert_eq!(body.format, QuestionFormat::TrueFalse);
    }
}
