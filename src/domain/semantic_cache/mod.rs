//! Semantic cache domain models and traits
//!
//! Answers are cached under a digest of the question and found again by
//! vector range search, so semantically similar questions share an answer.

mod config;
mod entry;
mod index;
mod key;

pub use config::{SemanticCacheConfig, MAX_COSINE_DISTANCE};
pub use entry::CacheEntry;
pub use index::{CacheHit, CacheLookup, IndexMatch, IndexStatus, RangeQuery, VectorIndex};
pub use key::QuestionKeyGenerator;

#[cfg(test)]
pub use index::mock::StalledVectorIndex;
#[cfg(test)]
pub use index::MockVectorIndex;
