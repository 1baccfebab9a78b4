//! Embedding provider trait

use async_trait::async_trait;

use crate::Result;

/// Text embedding interface
#[async_trait]
pub trait Embedder: Send + Sync + 'static {
    /// Embed a single text
    ///
    /// Implementations cap very long input before calling the provider.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Check if the provider is reachable
    async fn is_available(&self) -> bool;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}
