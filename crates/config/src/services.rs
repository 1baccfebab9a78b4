//! External collaborator configuration (language model, embeddings, vector store)

use serde::{Deserialize, Serialize};

use crate::constants::{collection, endpoints, generation, models};

fn default_openai_endpoint() -> String {
    endpoints::OPENAI_DEFAULT.to_string()
}

fn default_openai_api_key() -> Option<String> {
    std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty())
}

/// Chat completion backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// OpenAI-compatible base URL
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,

    /// Bearer token (falls back to OPENAI_API_KEY)
    #[serde(default = "default_openai_api_key", skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Retries on network errors and timeouts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

fn default_chat_model() -> String {
    models::CHAT_DEFAULT.to_string()
}
fn default_max_tokens() -> u32 {
    generation::MAX_OUTPUT_TOKENS
}
fn default_temperature() -> f32 {
    generation::TEMPERATURE
}
fn default_llm_timeout() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    2
}
fn default_initial_backoff_ms() -> u64 {
    500
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: default_openai_endpoint(),
            api_key: default_openai_api_key(),
            model: default_chat_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

/// Embedding provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_openai_api_key", skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Input is truncated to roughly this many tokens
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_model() -> String {
    models::EMBEDDING_DEFAULT.to_string()
}
fn default_max_input_tokens() -> usize {
    generation::EMBEDDING_MAX_INPUT_TOKENS
}
fn default_embedding_timeout() -> u64 {
    30
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            endpoint: default_openai_endpoint(),
            api_key: default_openai_api_key(),
            model: default_embedding_model(),
            max_input_tokens: default_max_input_tokens(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

/// Weaviate vector store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreSettings {
    #[serde(default = "default_weaviate_endpoint")]
    pub endpoint: String,

    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default = "default_content_property")]
    pub content_property: String,

    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,

    /// Readiness attempts at startup
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,

    #[serde(default = "default_connect_retry_delay")]
    pub connect_retry_delay_secs: u64,
}

fn default_weaviate_endpoint() -> String {
    endpoints::WEAVIATE_DEFAULT.to_string()
}
fn default_collection() -> String {
    collection::NAME.to_string()
}
fn default_content_property() -> String {
    collection::CONTENT_PROPERTY.to_string()
}
fn default_store_timeout() -> u64 {
    15
}
fn default_connect_retries() -> u32 {
    5
}
fn default_connect_retry_delay() -> u64 {
    5
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            endpoint: default_weaviate_endpoint(),
            api_key: None,
            collection: default_collection(),
            content_property: default_content_property(),
            timeout_secs: default_store_timeout(),
            connect_retries: default_connect_retries(),
            connect_retry_delay_secs: default_connect_retry_delay(),
        }
    }
}
