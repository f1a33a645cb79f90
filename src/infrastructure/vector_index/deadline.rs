//! Per-call deadline around a vector index
//!
//! Network-backed indexes can stall on connect (black-holed address, stuck
//! TLS handshake). Every call through this wrapper fails with the index
//! error class of its operation once the deadline passes.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use crate::domain::{CacheEntry, DomainError, IndexMatch, IndexStatus, RangeQuery, VectorIndex};

#[derive(Debug)]
pub struct DeadlineVectorIndex<I> {
    inner: I,
    deadline: Duration,
}

impl<I: VectorIndex> DeadlineVectorIndex<I> {
    pub fn new(inner: I, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    fn expired(&self, operation: &str) -> String {
        format!(
            "{} timed out after {} ms",
            operation,
            self.deadline.as_millis()
        )
    }
}

#[async_trait]
impl<I: VectorIndex> VectorIndex for DeadlineVectorIndex<I> {
    async fn range_search(
        &self,
        embedding: &[f32],
        query: &RangeQuery,
    ) -> Result<Vec<IndexMatch>, DomainError> {
        timeout(self.deadline, self.inner.range_search(embedding, query))
            .await
            .map_err(|_| DomainError::index_read(self.expired("range search")))?
    }

    async fn upsert(&self, entry: &CacheEntry) -> Result<(), DomainError> {
        timeout(self.deadline, self.inner.upsert(entry))
            .await
            .map_err(|_| DomainError::index_write(self.expired("upsert")))?
    }

    async fn ensure_index(&self) -> Result<IndexStatus, DomainError> {
        timeout(self.deadline, self.inner.ensure_index())
            .await
            .map_err(|_| DomainError::index_write(self.expired("ensure index")))?
    }

    async fn health_check(&self) -> Result<(), DomainError> {
        timeout(self.deadline, self.inner.health_check())
            .await
            .map_err(|_| DomainError::index_read(self.expired("health check")))?
    }
}
