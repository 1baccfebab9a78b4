//! Error types shared by every crate in the workspace

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error
///
/// Each crate keeps its own error enum and converts into this one at the
/// collaborator-trait boundary.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("RAG error: {0}")]
    Rag(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the failure came from an external collaborator rather than from
    /// local logic
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            Error::Embedding(_) | Error::VectorStore(_) | Error::Llm(_) | Error::Timeout(_)
        )
    }
}
