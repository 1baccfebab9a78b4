//! Language model integration
//!
//! Features:
//! - OpenAI-compatible chat backend with retry and exponential backoff
//! - Grounded and strict prompt construction
//! - Generic-refusal detection and disclaimer cleanup
//! - Response generator with a single strict retry

pub mod backend;
pub mod generator;
pub mod prompt;
pub mod validation;

pub use backend::{LlmConfig, OpenAiBackend};
pub use generator::{GenerationOutcome, GenerationRequest, ResponseGenerator};
pub use prompt::{ContextMetadata, PromptBuilder, DEFAULT_PRODUCT, REFUSAL_SENTENCE};
pub use validation::{is_generic_refusal, strip_unnecessary_disclaimer};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Transient failures worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Network(_) | LlmError::Timeout)
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else if err.is_connect() || err.is_request() {
            LlmError::Network(err.to_string())
        } else {
            LlmError::Api(err.to_string())
        }
    }
}

impl From<LlmError> for docbot_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout => docbot_core::Error::Timeout("language model".to_string()),
            other => docbot_core::Error::Llm(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(LlmError::Network("reset".into()).is_retryable());
        assert!(LlmError::Timeout.is_retryable());
        assert!(!LlmError::Api("400".into()).is_retryable());
        assert!(!LlmError::InvalidResponse("empty".into()).is_retryable());
    }

    #[test]
    fn test_core_conversion() {
        let err: docbot_core::Error = LlmError::Timeout.into();
        assert!(matches!(err, docbot_core::Error::Timeout(_)));
        let err: docbot_core::Error = LlmError::Api("401".into()).into();
        assert!(matches!(err, docbot_core::Error::Llm(_)));
    }
}
