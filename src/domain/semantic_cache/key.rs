//! Cache key derivation

use sha2::{Digest, Sha256};

/// Derives stable cache entry keys from question text.
///
/// Keys are `<prefix><sha256 hex>` of the trimmed question, so the same
/// question maps to the same entry in every process. Lookups never use the
/// key; they go through vector search.
#[derive(Debug, Clone)]
pub struct QuestionKeyGenerator {
    prefix: String,
}

impl QuestionKeyGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn generate(&self, question: &str) -> String {
        let digest = Sha256::digest(question.trim().as_bytes());
        format!("{}{}", self.prefix, hex::encode(digest))
    }
}
