use std::sync::Arc;
use std::time::Duration;

use super::{DeadlineVectorIndex, InMemoryVectorIndex, RedisIndexConfig, RedisVectorIndex};
use crate::config::{VectorIndexBackend, VectorIndexConfig};
use crate::domain::VectorIndex;

/// Build the vector index selected by configuration.
///
/// Calls to the Redis backend, connecting included, are bounded by `deadline`.
pub fn create_vector_index(
    config: &VectorIndexConfig,
    key_prefix: &str,
    deadline: Duration,
) -> Arc<dyn VectorIndex> {
    match config.backend {
        VectorIndexBackend::Redis => {
            let index = RedisVectorIndex::new(RedisIndexConfig {
                url: config.url.clone(),
                cluster: config.cluster,
                index_name: config.index_name.clone(),
                key_prefix: key_prefix.to_string(),
                dimension: config.dimension,
                sort_by_distance: config.sort_by_distance,
            });
            Arc::new(DeadlineVectorIndex::new(index, deadline))
        }
        VectorIndexBackend::Memory => Arc::new(InMemoryVectorIndex::new(config.dimension)),
    }
}
