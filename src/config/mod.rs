//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, AwsConfig, EmbeddingConfig, GenerationConfig, GenerationMode, LogFormat,
    LoggingConfig, SearchType, ServerConfig, TimeoutConfig, VectorIndexBackend, VectorIndexConfig,
};
