//! Product-level operations: each one sequences the translator and the AI
//! adapters for a single request and shapes the response envelope.
//!
//! Translation failures are fatal and returned as `Err`. An AI adapter that
//! produces nothing is a reported failure inside an `Ok` envelope.

use crate::error::{ProviderError, SpeechError, TranslationError};
use crate::glossary::GlossaryTable;
use crate::i18n::Language;
use crate::openai::{ChatTurn, Difficulty, QuestionFormat, SpeechService, TextAssistant, EMPTY_CHAT_REPLY};
use crate::translation::{Layers, TranslationRequest, TranslationResult, Translator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
    Success,
    FailedToSummarize,
    FailedToGenerateBulletins,
    Done,
    UnsupportedLanguage,
    UnknownError,
}

/// `{error, message, code, data?}` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub error: bool,
    pub message: String,
    pub code: ResponseCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            error: false,
            message: String::new(),
            code: ResponseCode::Success,
            data: Some(data),
        }
    }

    pub fn failure(code: ResponseCode, message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            code,
            data: None,
        }
    }
}

/// Product toggles for a translation request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    /// Skip both glossary layers and return plain machine translation.
    pub pure_gujarati: bool,
    pub auto_summarize: bool,
    pub auto_bulletins: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureTranslationRequest {
    pub input: String,
    #[serde(default)]
    pub features: Features,
    pub source_language: Language,
    #[serde(deserialize_with = "crate::i18n::deserialize_target")]
    pub target_language: Language,
    /// The caller's own post-replacement entries for the target language.
    #[serde(default)]
    pub custom_replacer: GlossaryTable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summarized: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bulletined: Option<String>,
    pub original: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureTranslation {
    pub reference_id: Uuid,
    pub output: TranslatedOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub original: String,
    pub translated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechToTextReply {
    pub code: ResponseCode,
    pub message: String,
    pub response: Option<String>,
}

#[derive(Clone)]
pub struct RequestHandler {
    translator: Translator,
    assistant: Arc<dyn TextAssistant>,
    speech: Arc<dyn SpeechService>,
}

impl RequestHandler {
    pub fn new(
        translator: Translator,
        assistant: Arc<dyn TextAssistant>,
        speech: Arc<dyn SpeechService>,
    ) -> Self {
        Self {
            translator,
            assistant,
            speech,
        }
    }

    /// Layered translation exactly as requested.
    pub async fn translate(
        &self,
        request: TranslationRequest,
    ) -> Result<TranslationResult, TranslationError> {
        self.translator.translate(request).await
    }

    /// Translate with optional summary and bulletin variants.
    ///
    /// Summaries and bulletins are generated in English; non-English input is
    /// pivoted through English first. The original and any derived variants
    /// are translated concurrently.
    pub async fn translate_with_features(
        &self,
        request: FeatureTranslationRequest,
    ) -> Result<Envelope<FeatureTranslation>, TranslationError> {
        let reference_id = Uuid::new_v4();
        let features = request.features;
        let source = request.source_language;
        let target = request.target_language;
        let english = Language::canonical();

        if !target.is_target() {
            return Err(TranslationError::InvalidTarget(target.code()));
        }

        info!(
            %reference_id,
            "Translation request {} -> {} (summarize: {}, bulletins: {}, pure: {})",
            source.code(),
            target.code(),
            features.auto_summarize,
            features.auto_bulletins,
            features.pure_gujarati
        );

        let pivoted = (features.auto_summarize || features.auto_bulletins) && source != english;
        let working_text = if pivoted {
            self.translator
                .translate(TranslationRequest::new(
                    request.input.as_str(),
                    source,
                    english,
                    Layers::NONE,
                ))
                .await?
                .result
        } else {
            request.input.clone()
        };

        let summarized = if features.auto_summarize {
            match self.assistant.summarize(&working_text).await? {
                Some(summary) => Some(summary),
                None => {
                    return Ok(Envelope::failure(
                        ResponseCode::FailedToSummarize,
                        "Failed to summarize",
                    ))
                }
            }
        } else {
            None
        };

        let bulletined = if features.auto_bulletins {
            let basis = summarized.as_deref().unwrap_or(&working_text);
            match self.assistant.generate_bulletins(basis).await? {
                Some(bullets) => Some(bullets),
                None => {
                    return Ok(Envelope::failure(
                        ResponseCode::FailedToGenerateBulletins,
                        "Failed to generate bulletins",
                    ))
                }
            }
        } else {
            None
        };

        let layers = Layers::uniform(!features.pure_gujarati);
        let derived_source = if pivoted { english } else { source };
        let translate_to_target = |input: &str, from: Language| {
            self.translator.translate(
                TranslationRequest::new(input, from, target, layers)
                    .with_post_overrides(request.custom_replacer.clone()),
            )
        };

        let original = translate_to_target(&request.input, source);
        let summarized = async {
            match summarized.as_deref() {
                Some(text) => translate_to_target(text, derived_source)
                    .await
                    .map(|r| Some(r.result)),
                None => Ok(None),
            }
        };
        let bulletined = async {
            match bulletined.as_deref() {
                Some(text) => translate_to_target(text, derived_source)
                    .await
                    .map(|r| Some(r.result)),
                None => Ok(None),
            }
        };

        let (original, summarized, bulletined) =
            futures::try_join!(original, summarized, bulletined)?;

        info!(%reference_id, "Translation request completed");

        Ok(Envelope::success(FeatureTranslation {
            reference_id,
            output: TranslatedOutput {
                summarized,
                bulletined,
                original: original.result,
            },
        }))
    }

    pub async fn summarize(&self, text: &str) -> Result<Envelope<String>, ProviderError> {
        Ok(match self.assistant.summarize(text).await? {
            Some(summary) => Envelope::success(summary),
            None => Envelope::failure(ResponseCode::FailedToSummarize, "Failed to summarize"),
        })
    }

    pub async fn bulletins(&self, text: &str) -> Result<Envelope<String>, ProviderError> {
        Ok(match self.assistant.generate_bulletins(text).await? {
            Some(bullets) => Envelope::success(bullets),
            None => Envelope::failure(
                ResponseCode::FailedToGenerateBulletins,
                "Failed to generate bulletins",
            ),
        })
    }

    /// Generated questions, or an empty string when there is nothing to ask.
    pub async fn generate_questions(
        &self,
        text: &str,
        difficulty: Difficulty,
        format: QuestionFormat,
    ) -> Result<String, ProviderError> {
        Ok(self
            .assistant
            .generate_questions(text, difficulty, format)
            .await?
            .unwrap_or_default())
    }

    /// Answer in English, plus a glossary-aware translation for non-English targets.
    pub async fn chat(
        &self,
        history: &[ChatTurn],
        target: Language,
    ) -> Result<ChatReply, TranslationError> {
        if !target.is_target() {
            return Err(TranslationError::InvalidTarget(target.code()));
        }

        let original = self.assistant.chat(history, target).await?;

        if target.is_canonical() {
            return Ok(ChatReply {
                original,
                translated: None,
            });
        }

        let translated = self
            .translator
            .translate(TranslationRequest::new(
                original.as_str(),
                Language::canonical(),
                target,
                Layers::ALL,
            ))
            .await?
            .result;
        let translated = if translated.is_empty() {
            EMPTY_CHAT_REPLY.to_string()
        } else {
            translated
        };

        Ok(ChatReply {
            original,
            translated: Some(translated),
        })
    }

    /// Transcription never fails the request; failures come back as codes.
    pub async fn speech_to_text(
        &self,
        audio: Vec<u8>,
        mime_type: &str,
        language: &str,
    ) -> SpeechToTextReply {
        match self.speech.speech_to_text(audio, mime_type, language).await {
            Ok(text) => SpeechToTextReply {
                code: ResponseCode::Done,
                message: String::new(),
                response: Some(text),
            },
            Err(SpeechError::UnsupportedLanguage) => SpeechToTextReply {
                code: ResponseCode::UnsupportedLanguage,
                message: "Language is not Supported".to_string(),
                response: None,
            },
            Err(SpeechError::Provider(e)) => {
                error!("Speech to text failed: {}", e);
                SpeechToTextReply {
                    code: ResponseCode::UnknownError,
                    message: "Unknown error".to_string(),
                    response: None,
                }
            }
        }
    }

    pub async fn text_to_speech(&self, text: &str) -> Result<Vec<u8>, ProviderError> {
        self.speech.text_to_speech(text).await
    }
}
