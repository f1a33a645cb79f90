//! Vector index trait and lookup types

use std::fmt::Debug;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::CacheEntry;
use crate::domain::DomainError;

/// Range query over the index: neighbours within `radius` cosine distance,
/// ordered by ascending distance, at most `limit` of them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeQuery {
    pub radius: f32,
    pub limit: usize,
}

impl RangeQuery {
    pub fn new(radius: f32, limit: usize) -> Self {
        Self { radius, limit }
    }
}

/// A document returned by a range query
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMatch {
    /// Document key
    pub key: String,
    /// Stored answer, if the document has one
    pub answer: Option<String>,
    /// Stored provenance tag
    pub tag: Option<String>,
    /// Cosine distance to the query vector
    pub distance: f32,
}

/// Outcome of checking the index for an equivalent question
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(CacheHit),
    Miss,
}

/// A cached answer close enough to the question
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub key: String,
    pub answer: String,
    pub tag: Option<String>,
    pub distance: f32,
}

impl CacheLookup {
    /// Interpret range query results. Only the nearest match counts, and it
    /// must carry an answer.
    pub fn from_matches(matches: Vec<IndexMatch>) -> Self {
        match matches.into_iter().next() {
            Some(IndexMatch {
                key,
                answer: Some(answer),
                tag,
                distance,
            }) => CacheLookup::Hit(CacheHit {
                key,
                answer,
                tag,
                distance,
            }),
            _ => CacheLookup::Miss,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }
}

/// Whether `ensure_index` had to create the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Created,
    AlreadyExists,
}

/// Vector index holding cache entries
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VectorIndex: Send + Sync + Debug {
    /// Find stored entries within the query radius of `embedding`
    async fn range_search(
        &self,
        embedding: &[f32],
        query: &RangeQuery,
    ) -> Result<Vec<IndexMatch>, DomainError>;

    /// Insert or replace the entry at its key
    async fn upsert(&self, entry: &CacheEntry) -> Result<(), DomainError>;

    /// Create the index if it does not exist yet
    async fn ensure_index(&self) -> Result<IndexStatus, DomainError>;

    /// Check connectivity
    async fn health_check(&self) -> Result<(), DomainError>;
}
