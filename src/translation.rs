use crate::error::TranslationError;
use crate::glossary::GlossaryTable;
use crate::google::MachineTranslator;
use crate::i18n::Language;
use crate::replacer::{ChangeRecord, Replacer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Which glossary layers run around machine translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layers {
    pub pre_replacer: bool,
    pub post_replacer: bool,
}

impl Layers {
    pub const NONE: Layers = Layers {
        pre_replacer: false,
        post_replacer: false,
    };

    pub const ALL: Layers = Layers {
        pre_replacer: true,
        post_replacer: true,
    };

    /// Both layers on or both off.
    pub fn uniform(enabled: bool) -> Self {
        Layers {
            pre_replacer: enabled,
            post_replacer: enabled,
        }
    }
}

/// Caller-supplied glossary overrides, merged over the defaults per layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseAddon {
    #[serde(default)]
    pub pre_replacer: GlossaryTable,
    #[serde(default)]
    pub post_replacer: GlossaryTable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    pub input: String,
    pub source_language: Language,
    #[serde(deserialize_with = "crate::i18n::deserialize_target")]
    pub target_language: Language,
    pub layers: Layers,
    #[serde(default)]
    pub database_addon: DatabaseAddon,
}

impl TranslationRequest {
    /// Request with the given layers and no overrides.
    pub fn new(
        input: impl Into<String>,
        source_language: Language,
        target_language: Language,
        layers: Layers,
    ) -> Self {
        Self {
            input: input.into(),
            source_language,
            target_language,
            layers,
            database_addon: DatabaseAddon::default(),
        }
    }

    pub fn with_post_overrides(mut self, overrides: GlossaryTable) -> Self {
        self.database_addon.post_replacer = overrides;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changes {
    pub post_replacer: Vec<ChangeRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub result: String,
    pub changes: Changes,
}

/// Pre-replacement, machine translation and post-replacement, in that order.
#[derive(Clone)]
pub struct Translator {
    client: Arc<dyn MachineTranslator>,
    replacer: Replacer,
}

impl Translator {
    pub fn new(client: Arc<dyn MachineTranslator>, replacer: Replacer) -> Self {
        Self { client, replacer }
    }

    /// Translate one request.
    ///
    /// A target that cannot be translated into (`auto`) is rejected before
    /// anything else. Blank input short-circuits to an empty result without
    /// calling the provider. Provider failures are returned as-is; there is no
    /// retry and no partial result.
    pub async fn translate(
        &self,
        request: TranslationRequest,
    ) -> Result<TranslationResult, TranslationError> {
        if !request.target_language.is_target() {
            return Err(TranslationError::InvalidTarget(request.target_language.code()));
        }

        let input = request.input.trim();
        if input.is_empty() {
            debug!("Blank input, skipping translation");
            return Ok(TranslationResult::default());
        }

        let source = request.source_language;
        let target = request.target_language;

        let input = if request.layers.pre_replacer {
            self.replacer
                .pre_replace(input, source, &request.database_addon.pre_replacer)
                .await
        } else {
            input.to_string()
        };

        let mut translation = self.client.translate(&input, source, target).await?;
        let mut changes = Changes::default();

        if request.layers.post_replacer {
            let replaced = self
                .replacer
                .post_replace(&translation, target, &request.database_addon.post_replacer)
                .await;
            translation = replaced.result;
            changes.post_replacer = replaced.changes;
        }

        info!(
            "Translated {} -> {} ({} post-replacer changes)",
            source.code(),
            target.code(),
            changes.post_replacer.len()
        );

        Ok(TranslationResult {
            result: translation,
            changes,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::glossary::GlossaryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Deterministic stand-in provider: records every call and answers from
    /// a fixed function.
    pub(crate) struct FakeTranslator {
        pub calls: AtomicUsize,
        pub inputs: Mutex<Vec<(String, Language, Language)>>,
        respond: Box<dyn Fn(&str, Language, Language) -> Result<String, ProviderError> + Send + Sync>,
    }

    impl FakeTranslator {
        pub fn new<F>(respond: F) -> Self
        where
            F: Fn(&str, Language, Language) -> Result<String, ProviderError> + Send + Sync + 'static,
        {
            Self {
                calls: AtomicUsize::new(0),
                inputs: Mutex::new(Vec::new()),
                respond: Box::new(respond),
            }
        }

        /// Echoes the input tagged with the target code, e.g. `[gu] hello`.
        pub fn tagging() -> Self {
            Self::new(|text, _, target| Ok(format!("[{}] {}", target.code(), text)))
        }

        pub fn failing() -> Self {
            Self::new(|_, _, _| {
                Err(ProviderError::Api {
                    provider: "fake",
                    status: 500,
                    body: "boom".to_string(),
                })
            })
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MachineTranslator for FakeTranslator {
        async fn translate(
            &self,
            text: &str,
            source: Language,
            target: Language,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inputs
                .lock()
                .unwrap()
                .push((text.to_string(), source, target));
            (self.respond)(text, source, target)
        }
    }

    fn write_table(dir: &TempDir, stage: &str, code: &str, json: &str) {
        let stage_dir = dir.path().join(stage);
        std::fs::create_dir_all(&stage_dir).unwrap();
        std::fs::write(stage_dir.join(format!("{}.json", code)), json).unwrap();
    }

    fn translator(dir: &TempDir, client: Arc<FakeTranslator>) -> Translator {
        let store = Arc::new(GlossaryStore::new(dir.path()));
        Translator::new(client, Replacer::new(store))
    }

    // ==================== Short-circuit Tests ====================

    #[tokio::test]
    async fn test_blank_input_returns_empty_without_calling_provider() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(FakeTranslator::tagging());
        let translator = translator(&dir, Arc::clone(&client));

        for input in ["", "  ", "\n\t "] {
            let result = translator
                .translate(TranslationRequest::new(
                    input,
                    Language::ENGLISH,
                    Language::GUJARATI,
                    Layers::ALL,
                ))
                .await
                .expect("Should succeed");

            assert_eq!(result, TranslationResult::default());
            assert_eq!(result.result, "");
            assert!(result.changes.post_replacer.is_empty());
        }

        assert_eq!(client.call_count(), 0);
    }

    // ==================== Layer Toggle Tests ====================

    #[tokio::test]
    async fn test_layers_off_returns_raw_provider_output_for_trimmed_input() {
        let dir = TempDir::new().unwrap();
        write_table(&dir, "pre", "en", r#"{"hello": "bye"}"#);
        write_table(&dir, "post", "gu", r#"{"hello": "bye"}"#);
        let client = Arc::new(FakeTranslator::tagging());
        let translator = translator(&dir, Arc::clone(&client));

        let result = translator
            .translate(TranslationRequest::new(
                "  hello  ",
                Language::ENGLISH,
                Language::GUJARATI,
                Layers::NONE,
            ))
            .await
            .unwrap();

        assert_eq!(result.result, "[gu] hello");
        assert!(result.changes.post_replacer.is_empty());
        assert_eq!(
            client.inputs.lock().unwrap()[0],
            ("hello".to_string(), Language::ENGLISH, Language::GUJARATI)
        );
    }

    #[tokio::test]
    async fn test_pre_layer_rewrites_provider_input() {
        let dir = TempDir::new().unwrap();
        write_table(&dir, "pre", "en", r#"{"colour": "color"}"#);
        let client = Arc::new(FakeTranslator::tagging());
        let translator = translator(&dir, Arc::clone(&client));

        let result = translator
            .translate(TranslationRequest::new(
                "colour",
                Language::ENGLISH,
                Language::GUJARATI,
                Layers {
                    pre_replacer: true,
                    post_replacer: false,
                },
            ))
            .await
            .unwrap();

        assert_eq!(result.result, "[gu] color");
        assert!(result.changes.post_replacer.is_empty());
    }

    #[tokio::test]
    async fn test_post_layer_uses_target_language_table() {
        let dir = TempDir::new().unwrap();
        write_table(&dir, "post", "gu", r#"{"cat": "dog"}"#);
        write_table(&dir, "post", "en", r#"{"cat": "wrong"}"#);
        let client = Arc::new(FakeTranslator::new(|_, _, _| Ok("I have a cat".to_string())));
        let translator = translator(&dir, client);

        let result = translator
            .translate(TranslationRequest::new(
                "anything",
                Language::ENGLISH,
                Language::GUJARATI,
                Layers {
                    pre_replacer: false,
                    post_replacer: true,
                },
            ))
            .await
            .unwrap();

        assert_eq!(result.result, "I have a dog");
        assert_eq!(result.changes.post_replacer.len(), 1);
        assert_eq!(result.changes.post_replacer[0].old.starting_index, 9);
        assert_eq!(result.changes.post_replacer[0].new.end_index, 12);
    }

    #[tokio::test]
    async fn test_database_addon_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        write_table(&dir, "post", "gu", r#"{"cat": "dog"}"#);
        let client = Arc::new(FakeTranslator::new(|_, _, _| Ok("a cat".to_string())));
        let translator = translator(&dir, client);

        let overrides: GlossaryTable = [("cat", "tiger")].into_iter().collect();
        let result = translator
            .translate(
                TranslationRequest::new("x", Language::ENGLISH, Language::GUJARATI, Layers::ALL)
                    .with_post_overrides(overrides),
            )
            .await
            .unwrap();

        assert_eq!(result.result, "a tiger");
    }

    // ==================== Error Tests ====================

    #[tokio::test]
    async fn test_auto_target_is_rejected_without_calling_provider() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(FakeTranslator::tagging());
        let translator = translator(&dir, Arc::clone(&client));

        let result = translator
            .translate(TranslationRequest::new(
                "hello",
                Language::ENGLISH,
                Language::AUTO,
                Layers::ALL,
            ))
            .await;

        assert!(matches!(result, Err(TranslationError::InvalidTarget("auto"))));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(FakeTranslator::failing());
        let translator = translator(&dir, Arc::clone(&client));

        let result = translator
            .translate(TranslationRequest::new(
                "hello",
                Language::ENGLISH,
                Language::GUJARATI,
                Layers::ALL,
            ))
            .await;

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("500"));
        assert_eq!(client.call_count(), 1);
    }

    // ==================== Serialization Tests ====================

    #[test]
    fn test_request_deserializes_without_database_addon() {
        let request: TranslationRequest = serde_json::from_str(
            r#"{
                "input": "hi",
                "sourceLanguage": "en",
                "targetLanguage": "gu",
                "layers": {"preReplacer": true, "postReplacer": false}
            }"#,
        )
        .unwrap();

        assert!(request.layers.pre_replacer);
        assert!(request.database_addon.pre_replacer.is_empty());
        assert!(request.database_addon.post_replacer.is_empty());
    }

    #[test]
    fn test_request_rejects_auto_target() {
        let result = serde_json::from_str::<TranslationRequest>(
            r#"{
                "input": "hi",
                "sourceLanguage": "en",
                "targetLanguage": "auto",
                "layers": {"preReplacer": false, "postReplacer": false}
            }"#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_auto_source_is_accepted() {
        let request: TranslationRequest = serde_json::from_str(
            r#"{
                "input": "hi",
                "sourceLanguage": "auto",
                "targetLanguage": "gu",
                "layers": {"preReplacer": false, "postReplacer": false}
            }"#,
        )
        .unwrap();

        assert_eq!(request.source_language, Language::AUTO);
    }

    #[test]
    fn test_result_serializes_in_wire_shape() {
        let json = serde_json::to_value(TranslationResult::default()).unwrap();
        assert_eq!(json, serde_json::json!({"result": "", "changes": {"postReplacer": []}}));
    }
}
