//! Vector store trait

use async_trait::async_trait;

use crate::{DocumentChunk, Error, HybridQuery, Result};

/// Read-only access to a single collection of document fragments
#[async_trait]
pub trait VectorStore: Send + Sync + 'static {
    /// Nearest-neighbour search; chunks carry `distance`
    async fn near_vector(&self, vector: &[f32], limit: usize) -> Result<Vec<DocumentChunk>>;

    /// Whether [`VectorStore::hybrid_search`] is implemented
    fn supports_hybrid(&self) -> bool {
        false
    }

    /// Blended vector + keyword search; chunks carry `score`
    async fn hybrid_search(&self, query: &HybridQuery) -> Result<Vec<DocumentChunk>> {
        let _ = query;
        Err(Error::Unsupported("hybrid search".to_string()))
    }

    /// Readiness check
    async fn is_ready(&self) -> bool;

    /// Collection name for logging
    fn collection(&self) -> &str;
}
