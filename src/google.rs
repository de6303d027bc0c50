//! Machine translation through the public Google Translate endpoint.

use crate::error::ProviderError;
use crate::i18n::Language;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

pub const PROVIDER: &str = "Google Translate";

/// Text translation provider used by the translation pipeline.
#[async_trait]
pub trait MachineTranslator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, ProviderError>;
}

/// Client for `translate_a/single` (`client=gtx`), the keyless endpoint the
/// Google Translate web widget uses.
#[derive(Debug, Clone)]
pub struct GoogleTranslateClient {
    client: reqwest::Client,
    api_url: String,
}

impl GoogleTranslateClient {
    pub fn new(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }
}

#[async_trait]
impl MachineTranslator for GoogleTranslateClient {
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, ProviderError> {
        let characters = text.chars().count();
        info!(
            "Translating {} characters from {} to {}",
            characters,
            source.code(),
            target.code()
        );
        debug!("Translation input: {:?}", text);

        let response = self
            .client
            .post(&self.api_url)
            .query(&[
                ("client", "gtx"),
                ("sl", source.code()),
                ("tl", target.code()),
                ("dt", "t"),
            ])
            .form(&[("q", text)])
            .send()
            .await
            .map_err(|e| ProviderError::http(PROVIDER, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(ProviderError::Api {
                provider: PROVIDER,
                status,
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::http(PROVIDER, e))?;
        let translated = parse_translation(&body)?;

        info!("Translation of {} characters completed", characters);
        debug!("Translation output: {:?}", translated);

        Ok(translated)
    }
}

/// Join the translated segments of a `translate_a/single` response.
///
/// The body is a nested array whose first element lists sentence segments as
/// `[translated, original, ...]`. A `null` first element means there was
/// nothing to translate.
fn parse_translation(body: &Value) -> Result<String, ProviderError> {
    let segments = match body.get(0) {
        Some(Value::Array(segments)) => segments,
        Some(Value::Null) => return Ok(String::new()),
        _ => return Err(ProviderError::invalid(PROVIDER, "missing translation segments")),
    };

    Ok(segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect())
}
