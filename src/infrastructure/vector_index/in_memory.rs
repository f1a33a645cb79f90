//! In-memory vector index

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::embedding::cosine_distance;
use crate::domain::{CacheEntry, DomainError, IndexMatch, IndexStatus, RangeQuery, VectorIndex};

/// In-memory vector index using linear search
///
/// Suitable for development and tests. Entries are lost on restart.
#[derive(Debug)]
pub struct InMemoryVectorIndex {
    entries: RwLock<HashMap<String, CacheEntry>>,
    dimension: usize,
    created: AtomicBool,
}

impl InMemoryVectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            dimension,
            created: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_dimension(&self, len: usize) -> Result<(), String> {
        if len != self.dimension {
            return Err(format!(
                "Vector has {} dimensions, index expects {}",
                len, self.dimension
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn range_search(
        &self,
        embedding: &[f32],
        query: &RangeQuery,
    ) -> Result<Vec<IndexMatch>, DomainError> {
        self.check_dimension(embedding.len())
            .map_err(DomainError::index_read)?;

        let entries = self.entries.read().map_err(|e| {
            DomainError::index_read(format!("Failed to acquire read lock: {}", e))
        })?;

        let mut results: Vec<IndexMatch> = entries
            .values()
            .filter(|entry| !entry.is_expired())
            .map(|entry| IndexMatch {
                key: entry.key().to_string(),
                answer: Some(entry.answer().to_string()),
                tag: Some(entry.tag().to_string()),
                distance: cosine_distance(embedding, entry.embedding()),
            })
            .filter(|m| m.distance <= query.radius)
            .collect();

        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(query.limit);

        Ok(results)
    }

    async fn upsert(&self, entry: &CacheEntry) -> Result<(), DomainError> {
        self.check_dimension(entry.dimensions())
            .map_err(DomainError::index_write)?;

        let mut entries = self.entries.write().map_err(|e| {
            DomainError::index_write(format!("Failed to acquire write lock: {}", e))
        })?;

        entries.retain(|_, e| !e.is_expired());
        entries.insert(entry.key().to_string(), entry.clone());

        Ok(())
    }

    async fn ensure_index(&self) -> Result<IndexStatus, DomainError> {
        if self.created.swap(true, Ordering::SeqCst) {
            Ok(IndexStatus::AlreadyExists)
        } else {
            Ok(IndexStatus::Created)
        }
    }

    async fn health_check(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
