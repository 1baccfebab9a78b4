//! OpenAI-compatible chat completion backend

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use docbot_config::LlmSettings;
use docbot_core::{LanguageModel, Message};

use crate::LlmError;

/// LLM configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model name/ID
    pub model: String,
    /// API base URL
    pub endpoint: String,
    /// API key (optional)
    pub api_key: Option<String>,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
    /// Retry attempts for transient failures
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry)
    pub initial_backoff: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::from(&LlmSettings::default())
    }
}

impl From<&LlmSettings> for LlmConfig {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            model: settings.model.clone(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout: Duration::from_secs(settings.timeout_secs),
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
        }
    }
}

/// OpenAI chat completions backend
pub struct OpenAiBackend {
    client: Client,
    config: LlmConfig,
}

impl OpenAiBackend {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint, path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Execute a single request (used by the retry loop)
    async fn execute_request(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        let response = self
            .authorized(self.client.post(self.api_url("/chat/completions")))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            // 5xx and 429 are retryable, other 4xx are not
            if status.is_server_error() || status.as_u16() == 429 {
                return Err(LlmError::Network(format!("Server error {}: {}", status, error)));
            }
            return Err(LlmError::Api(format!("{}: {}", status, error)));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    /// Generate a completion, retrying transient failures with exponential backoff
    pub async fn generate(&self, messages: &[Message]) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: messages.iter().map(ChatMessage::from).collect(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let mut last_error = None;
        let mut backoff = self.config.initial_backoff;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    "LLM request failed, retrying in {:?} (attempt {}/{})",
                    backoff,
                    attempt,
                    self.config.max_retries
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            match self.execute_request(&request).await {
                Ok(response) => return response.into_text(),
                Err(e) if e.is_retryable() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Network("Max retries exceeded".to_string())))
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }
}

#[async_trait]
impl LanguageModel for OpenAiBackend {
    async fn complete(&self, messages: &[Message]) -> docbot_core::Result<String> {
        self.generate(messages).await.map_err(Into::into)
    }

    async fn is_available(&self) -> bool {
        self.authorized(self.client.get(self.api_url("/models")))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a Message> for ChatMessage<'a> {
    fn from(msg: &'a Message) -> Self {
        Self {
            role: msg.role.as_str(),
            content: &msg.content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<MessageContent>,
}

/// Providers return either a plain string or a list of typed parts
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl MessageContent {
    fn into_text(self) -> String {
        match self {
            MessageContent::Text(text) => text,
            MessageContent::Parts(parts) => parts
                .into_iter()
                .filter(|p| p.kind.as_deref().map_or(true, |k| k == "text" || k == "output_text"))
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

impl ChatResponse {
    fn into_text(self) -> Result<String, LlmError> {
        let text = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(MessageContent::into_text)
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::InvalidResponse("Empty completion".to_string()));
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_settings() {
        let settings = LlmSettings {
            endpoint: "http://localhost:1234/v1/".to_string(),
            ..Default::default()
        };
        let config = LlmConfig::from(&settings);
        assert_eq!(config.endpoint, "http://localhost:1234/v1");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.initial_backoff, Duration::from_millis(500));
    }

    #[test]
    fn test_message_conversion() {
        let msg = Message::user("Hola");
        let wire: ChatMessage = (&msg).into();
        assert_eq!(wire.role, "user");
        assert_eq!(wire.content, "Hola");
    }

    #[test]
    fn test_string_content() {
        let resp: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Respuesta  "}}]}"#,
        )
        .unwrap();
        assert_eq!(resp.into_text().unwrap(), "Respuesta");
    }

    #[test]
    fn test_parts_content() {
        let resp: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":[
                {"type":"text","text":"Paso 1. "},
                {"type":"image_url","text":"ignorado"},
                {"type":"text","text":"Paso 2."}
            ]}}]}"#,
        )
        .unwrap();
        assert_eq!(resp.into_text().unwrap(), "Paso 1. Paso 2.");
    }

    #[test]
    fn test_empty_content_is_error() {
        let resp: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(matches!(resp.into_text(), Err(LlmError::InvalidResponse(_))));

        let resp: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(resp.into_text().is_err());
    }
}
