//! Answer generator trait definition

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use crate::domain::DomainError;

/// Answer produced by a generative backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    /// Answer text
    pub text: String,
    /// Sources the backend retrieved to ground the answer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<String>,
}

impl GeneratedAnswer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citations: Vec::new(),
        }
    }

    pub fn with_citations(mut self, citations: Vec<String>) -> Self {
        self.citations = citations;
        self
    }
}

/// Generates an answer to a question, possibly retrieving context on its own
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AnswerGenerator: Send + Sync + Debug {
    async fn generate(&self, question: &str) -> Result<GeneratedAnswer, DomainError>;
}
