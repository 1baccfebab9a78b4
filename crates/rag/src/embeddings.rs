//! OpenAI-compatible embeddings
//!
//! Uses the `/embeddings` endpoint. Long input is truncated before the call so
//! the provider never rejects it for length.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use docbot_config::EmbeddingSettings;
use docbot_core::Embedder;

use crate::RagError;

/// Rough characters-per-token ratio used for truncation
const CHARS_PER_TOKEN: usize = 4;

/// Embedding client configuration
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// API base URL
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Input is capped at roughly this many tokens
    pub max_input_tokens: usize,
    pub timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::from(&EmbeddingSettings::default())
    }
}

impl From<&EmbeddingSettings> for EmbeddingConfig {
    fn from(settings: &EmbeddingSettings) -> Self {
        Self {
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            max_input_tokens: settings.max_input_tokens,
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI-compatible embedder
pub struct OpenAiEmbedder {
    client: Client,
    config: EmbeddingConfig,
}

impl OpenAiEmbedder {
    /// Create a new embedder
    pub fn new(config: EmbeddingConfig) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Embed a single text
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>, RagError> {
        if text.trim().is_empty() {
            return Err(RagError::Embedding("Empty input".to_string()));
        }

        let input = truncate_for_embedding(text, self.config.max_input_tokens);
        let request = EmbedRequest {
            model: &self.config.model,
            input,
        };

        let url = format!("{}/embeddings", self.config.endpoint);

        let response = self
            .request(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Embedding(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "Embedding failed: {} - {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| RagError::Embedding(format!("Failed to parse embedding response: {}", e)))?;

        embed_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| RagError::Embedding("No embedding returned".to_string()))
    }

    /// Query the models endpoint
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/models", self.config.endpoint);
        match self.request(self.client.get(&url)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Embedding health check failed");
                false
            }
        }
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> docbot_core::Result<Vec<f32>> {
        self.embed_text(text).await.map_err(Into::into)
    }

    async fn is_available(&self) -> bool {
        self.health_check().await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Cap text at roughly `max_tokens` tokens, cutting on a char boundary
pub fn truncate_for_embedding(text: &str, max_tokens: usize) -> &str {
    let max_chars = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Cosine similarity; 0.0 for empty, mismatched or zero-norm vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_truncate_for_embedding() {
        assert_eq!(truncate_for_embedding("hola", 8000), "hola");
        assert_eq!(truncate_for_embedding("abcdefghij", 2), "abcdefgh");
        // Multi-byte chars are never split
        assert_eq!(truncate_for_embedding("ñññññ", 1), "ññññ");
    }

    #[test]
    fn test_config_from_settings() {
        let settings = EmbeddingSettings {
            endpoint: "http://localhost:9999/v1/".to_string(),
            ..Default::default()
        };
        let config = EmbeddingConfig::from(&settings);
        assert_eq!(config.endpoint, "http://localhost:9999/v1");
        assert_eq!(config.max_input_tokens, 8000);
    }

    #[tokio::test]
    async fn test_empty_input_rejected_without_network() {
        let embedder = OpenAiEmbedder::new(EmbeddingConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(embedder.embed_text("  ").await, Err(RagError::Embedding(_))));
    }
}
