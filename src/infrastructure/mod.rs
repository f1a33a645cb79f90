//! Infrastructure layer - External service implementations

pub mod bedrock;
pub mod embedding;
pub mod generation;
pub mod logging;
pub mod observability;
pub mod services;
pub mod vector_index;
