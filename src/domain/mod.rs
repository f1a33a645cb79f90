//! Domain layer - Core business logic and entities

pub mod answer;
pub mod embedding;
pub mod error;
pub mod semantic_cache;

pub use answer::{AnswerGenerator, GeneratedAnswer};
pub use embedding::EmbeddingProvider;
pub use error::DomainError;
pub use semantic_cache::{
    CacheEntry, CacheHit, CacheLookup, IndexMatch, IndexStatus, QuestionKeyGenerator, RangeQuery,
    SemanticCacheConfig, VectorIndex,
};
