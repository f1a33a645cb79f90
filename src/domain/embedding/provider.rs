//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::DomainError;

/// Turns text into a fixed-dimension vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Embed a single piece of text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError>;

    /// Model identifier, also used as the provenance tag of cache entries
    fn model_id(&self) -> &str;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}
