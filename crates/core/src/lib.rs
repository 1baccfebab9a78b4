//! Core traits and types for the documentation chatbot
//!
//! This crate provides foundational types used across all other crates:
//! - Collaborator traits (embedding provider, vector store, language model)
//! - Conversation turns and chat messages
//! - Resolved retrieval queries and retrieval results
//! - Error types

pub mod error;
pub mod conversation;
pub mod llm_types;
pub mod query;
pub mod retrieval;
pub mod traits;

pub use error::{Error, Result};
pub use conversation::{Turn, TurnRole};
pub use llm_types::{Message, Role};
pub use query::{ResolvedQuery, ANCHOR_DELIMITER};
pub use retrieval::{DocumentChunk, HybridQuery, RetrievalResult, SearchMethod};

pub use traits::{Embedder, LanguageModel, VectorStore};
