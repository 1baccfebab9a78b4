//! Retrieval for the documentation assistant
//!
//! Features:
//! - Generic and semantic query normalization
//! - Domain synonym expansion
//! - Domain-agnostic keyword extraction for follow-up anchors
//! - OpenAI-compatible embeddings
//! - Weaviate hybrid and nearest-neighbour search over GraphQL
//! - Retrieval gateway with result ranking and query rewrites
//! - Similarity-based answer gate

pub mod answer_gate;
pub mod embeddings;
pub mod keywords;
pub mod normalizer;
pub mod query_expansion;
pub mod retriever;
pub mod weaviate;

pub use answer_gate::{effective_threshold, AnswerGate, GateVerdict};
pub use embeddings::{cosine_similarity, truncate_for_embedding, EmbeddingConfig, OpenAiEmbedder};
pub use keywords::{
    extract_focus_words, extract_keywords_generic, extract_main_keywords, is_stopword,
    looks_like_infinitive,
};
pub use normalizer::{fold_accents, normalize_generic, QueryNormalizer};
pub use query_expansion::{ExpandedQuery, QueryExpander};
pub use retriever::{DiagnosticSearch, RetrievalGateway};
pub use weaviate::{WeaviateConfig, WeaviateStore};

use thiserror::Error;

/// RAG errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl From<RagError> for docbot_core::Error {
    fn from(err: RagError) -> Self {
        match err {
            RagError::Embedding(msg) => docbot_core::Error::Embedding(msg),
            RagError::VectorStore(msg) | RagError::Connection(msg) => {
                docbot_core::Error::VectorStore(msg)
            }
            other => docbot_core::Error::Rag(other.to_string()),
        }
    }
}
