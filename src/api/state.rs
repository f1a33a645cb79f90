//! Application state for shared services

use std::sync::Arc;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::domain::{DomainError, VectorIndex};
use crate::infrastructure::services::{AnswerOutcome, SemanticAnswerService};

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub answer_service: Arc<dyn AnswerServiceTrait>,
    pub vector_index: Arc<dyn VectorIndex>,
}

impl AppState {
    pub fn new(answer_service: Arc<dyn AnswerServiceTrait>, vector_index: Arc<dyn VectorIndex>) -> Self {
        Self {
            answer_service,
            vector_index,
        }
    }
}

/// Trait for answer service operations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AnswerServiceTrait: Send + Sync {
    async fn answer(&self, question: &str) -> Result<AnswerOutcome, DomainError>;

    /// Wait for background cache writes, returning how many were awaited
    async fn finish_cache_writes(&self) -> usize;
}

#[async_trait]
impl AnswerServiceTrait for SemanticAnswerService {
    async fn answer(&self, question: &str) -> Result<AnswerOutcome, DomainError> {
        SemanticAnswerService::answer(self, question).await
    }

    async fn finish_cache_writes(&self) -> usize {
        SemanticAnswerService::finish_cache_writes(self).await
    }
}
