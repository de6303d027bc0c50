use crate::config::Config;
use crate::error::{ProviderError, SpeechError};
use crate::i18n::Language;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

const PROVIDER: &str = "OpenAI";

/// Reply used when the chat model returns nothing.
pub const EMPTY_CHAT_REPLY: &str = "I could not answer that";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionFormat {
    Mcq,
    ShortAnswer,
    LongAnswer,
    TrueFalse,
}

impl fmt::Display for QuestionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QuestionFormat::Mcq => "multiple choice",
            QuestionFormat::ShortAnswer => "short answer",
            QuestionFormat::LongAnswer => "long answer",
            QuestionFormat::TrueFalse => "true/false",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of a chat conversation as the client sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub message: String,
}

/// LLM-backed text features. `None` means the input was blank or the model
/// produced no text.
#[async_trait]
pub trait TextAssistant: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<Option<String>, ProviderError>;

    async fn generate_bulletins(&self, text: &str) -> Result<Option<String>, ProviderError>;

    async fn generate_questions(
        &self,
        text: &str,
        difficulty: Difficulty,
        format: QuestionFormat,
    ) -> Result<Option<String>, ProviderError>;

    /// Answer the last user turn in English. `target` only shapes the
    /// instructions; translation happens afterwards.
    async fn chat(&self, history: &[ChatTurn], target: Language) -> Result<String, ProviderError>;
}

/// Audio transcription and synthesis.
#[async_trait]
pub trait SpeechService: Send + Sync {
    async fn speech_to_text(
        &self,
        audio: Vec<u8>,
        mime_type: &str,
        language: &str,
    ) -> Result<String, SpeechError>;

    /// Synthesize `text` as mp3 bytes.
    async fn text_to_speech(&self, text: &str) -> Result<Vec<u8>, ProviderError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

impl Message {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
}

fn build_summary_prompt(text: &str) -> String {
    format!(
        "Summarize text plainly, without altering details or tone. text: {}\nSummary:",
        text
    )
}

fn build_bulletins_prompt(text: &str) -> String {
    format!(
        "Transform the text into bullet points without altering content, tone, or omitting/adding details. start with \"•\". \nText: {}\nAnswer:",
        text
    )
}

fn build_questions_prompt(text: &str, difficulty: Difficulty, format: QuestionFormat) -> String {
    format!(
        "Generate {} difficulty {} questions from the paragraph without redundancy or duplication.\ntext: {}\nQuestions:\n",
        difficulty, format, text
    )
}

fn build_chat_system_prompt(target: Language) -> String {
    let mut prompt = format!(
        r#"You will act as a helpful assistant for a student. If user asks about you, tell them that you are a "AskBot" built by "Varnantar Team" to guide students (Do not forget to mention "Varnantar Team" in any situation). Your answer format must be markdown. Use KaTeX for math equations when needed.

Metadata (This list/info must NOT affect your response in any ways)
- Target Language: {} (do NOT respond in this language, only respond in ENGLISH)

Instructions:
- You will always respond in English regardless of what user says
- Always respond in language that machine translation can easily translate into a non-English language, without complex words"#,
        target.code()
    );

    if !target.is_canonical() {
        prompt.push_str(
            "\n- If the user asks about programming code, tell them that rendering programming code in other languages is currently not supported and does not make sense.",
        );
    }

    prompt
}

/// Extension for an upload name from a MIME type (`audio/webm;codecs=opus` -> `webm`).
fn extension_for(mime_type: &str) -> &str {
    mime_type
        .split('/')
        .nth(1)
        .and_then(|subtype| subtype.split(';').next())
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
        .unwrap_or("bin")
}

/// OpenAI settings needed by the client, split out of `Config` so tests can
/// point the client at a mock server.
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub organization_id: Option<String>,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub tts_model: String,
    pub tts_voice: String,
    pub stt_model: String,
}

impl From<&Config> for OpenAiSettings {
    fn from(config: &Config) -> Self {
        Self {
            api_key: config.openai_api_key.clone(),
            organization_id: config.openai_organization_id.clone(),
            api_url: config.openai_api_url.trim_end_matches('/').to_string(),
            model: config.openai_model.clone(),
            temperature: config.openai_temperature,
            tts_model: config.openai_tts_model.clone(),
            tts_voice: config.openai_tts_voice.clone(),
            stt_model: config.openai_stt_model.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    settings: OpenAiSettings,
}

impl OpenAiClient {
    pub fn new(client: reqwest::Client, settings: OpenAiSettings) -> Self {
        Self { client, settings }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.api_url, path)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .post(self.endpoint(path))
            .header("Authorization", format!("Bearer {}", self.settings.api_key));

        match &self.settings.organization_id {
            Some(org) => request.header("OpenAI-Organization", org),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ProviderError> {
        let response = request
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

        Ok(response)
    }

    /// Run a chat completion and return the first choice's text, `None` when
    /// the model returned no text.
    async fn complete(
        &self,
        messages: Vec<Message>,
        max_tokens: u32,
    ) -> Result<Option<String>, ProviderError> {
        let request = ChatRequest {
            model: self.settings.model.clone(),
            messages,
            max_tokens,
            temperature: self.settings.temperature,
        };

        let response = self.send(self.post("chat/completions").json(&request)).await?;
        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::http(PROVIDER, e))?;

        Ok(chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty()))
    }

    async fn complete_prompt(
        &self,
        feature: &str,
        text: &str,
        prompt: String,
        max_tokens: u32,
    ) -> Result<Option<String>, ProviderError> {
        if text.trim().is_empty() {
            debug!("{}: blank input", feature);
            return Ok(None);
        }

        info!("{}: {} characters", feature, text.chars().count());
        let output = self.complete(vec![Message::new("user", prompt)], max_tokens).await?;
        if output.is_none() {
            warn!("{}: model returned no text", feature);
        }
        Ok(output)
    }
}

#[async_trait]
impl TextAssistant for OpenAiClient {
    async fn summarize(&self, text: &str) -> Result<Option<String>, ProviderError> {
        self.complete_prompt("Summarize", text, build_summary_prompt(text), 1024)
            .await
    }

    async fn generate_bulletins(&self, text: &str) -> Result<Option<String>, ProviderError> {
        self.complete_prompt("Bulletins", text, build_bulletins_prompt(text), 2048)
            .await
    }

    async fn generate_questions(
        &self,
        text: &str,
        difficulty: Difficulty,
        format: QuestionFormat,
    ) -> Result<Option<String>, ProviderError> {
        self.complete_prompt(
            "Questions",
            text,
            build_questions_prompt(text, difficulty, format),
            2048,
        )
        .await
    }

    async fn chat(&self, history: &[ChatTurn], target: Language) -> Result<String, ProviderError> {
        let mut messages = vec![
            Message::new("system", build_chat_system_prompt(target)),
            Message::new("user", "Who are you?"),
            Message::new(
                "assistant",
                "I am AskBot, built by Varnantar Team. My goal is to help with anything you may need as a student.",
            ),
        ];
        messages.extend(history.iter().map(|turn| {
            let role = match turn.role {
                ChatRole::Assistant => "assistant",
                ChatRole::User => "user",
            };
            Message::new(role, turn.message.clone())
        }));

        info!("Chat: {} turns, target {}", history.len(), target.code());
        let reply = self.complete(messages, 4096).await?;
        Ok(reply.unwrap_or_else(|| EMPTY_CHAT_REPLY.to_string()))
    }
}

#[async_trait]
impl SpeechService for OpenAiClient {
    async fn speech_to_text(
        &self,
        audio: Vec<u8>,
        mime_type: &str,
        language: &str,
    ) -> Result<String, SpeechError> {
        let file_name = format!(
            "{}.{}",
            Utc::now().timestamp_millis(),
            extension_for(mime_type)
        );
        info!("Transcribing {} bytes as {}", audio.len(), file_name);

        let file = Part::bytes(audio)
            .file_name(file_name)
            .mime_str(mime_type)
            .map_err(|e| ProviderError::http(PROVIDER, e))?;

        let mut form = Form::new()
            .text("model", self.settings.stt_model.clone())
            .text("response_format", "json")
            .part("file", file);
        if !language.trim().is_empty() {
            form = form.text("language", language.trim().to_string());
        }

        let response = self
            .post("audio/transcriptions")
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::http(PROVIDER, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));

            let code = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error.code);
            if code.as_deref() == Some("unsupported_language") {
                warn!("Transcription language {:?} not supported", language);
                return Err(SpeechError::UnsupportedLanguage);
            }

            return Err(ProviderError::Api {
                provider: PROVIDER,
                status,
                body,
            }
            .into());
        }

        let transcription: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::http(PROVIDER, e))?;
        Ok(transcription.text)
    }

    async fn text_to_speech(&self, text: &str) -> Result<Vec<u8>, ProviderError> {
        let request = SpeechRequest {
            model: &self.settings.tts_model,
            input: text,
            voice: &self.settings.tts_voice,
            response_format: "mp3",
        };

        info!("Synthesizing {} characters", text.chars().count());
        let response = self.send(self.post("audio/speech").json(&request)).await?;
        let audio = response
            .bytes()
            .await
            .map_err(|e| ProviderError::http(PROVIDER, e))?;
        Ok(audio.to_vec())
    }
}
