//! Vector index implementations

mod deadline;
mod factory;
mod in_memory;
mod redis;
mod reply;

pub use deadline::DeadlineVectorIndex;
pub use factory::create_vector_index;
pub use in_memory::InMemoryVectorIndex;
pub use redis::{RedisIndexConfig, RedisVectorIndex};
