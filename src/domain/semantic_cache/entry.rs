//! Cache entry stored in the vector index

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An answered question, keyed by a digest of the question and found by its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Index key of this entry
    key: String,
    /// Embedding of the question that produced the answer
    embedding: Vec<f32>,
    /// The generated answer
    answer: String,
    /// Provenance tag naming the embedding model
    tag: String,
    /// The question text, kept for inspection only
    question: Option<String>,
    /// When this entry was created
    created_at: DateTime<Utc>,
    /// Optional expiry applied by the index
    ttl: Option<Duration>,
}

impl CacheEntry {
    /// Create a new cache entry
    pub fn new(
        key: impl Into<String>,
        embedding: Vec<f32>,
        answer: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            embedding,
            answer: answer.into(),
            tag: tag.into(),
            question: None,
            created_at: Utc::now(),
            ttl: None,
        }
    }

    /// Set the question text
    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    /// Set the expiry
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn question(&self) -> Option<&str> {
        self.question.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Check if the entry has outlived its TTL
    pub fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => {
                let age = Utc::now().signed_duration_since(self.created_at);
                age.to_std().map(|age| age >= ttl).unwrap_or(false)
            }
            None => false,
        }
    }
}
