//! Embedding provider domain models and traits

mod provider;
mod vector;

pub use provider::EmbeddingProvider;
pub use vector::{cosine_distance, cosine_similarity, encode_f32_le};

#[cfg(test)]
pub use provider::mock::StaticEmbeddingProvider;
