use std::time::Duration;

use config::builder::{ConfigBuilder, DefaultState};
use serde::Deserialize;

use crate::domain::{DomainError, SemanticCacheConfig};
use crate::infrastructure::observability::ObservabilityConfig;

/// Environment variable naming the cache cluster endpoint in the Lambda deployment
const CACHE_ENDPOINT_ENV: &str = "PERISTENT_SEMANTIC_CACHE_ENDPOINT";
/// Environment variable naming the Bedrock knowledge base in the Lambda deployment
const KNOWLEDGE_BASE_ENV: &str = "KNOWLEDGE_BASE_ID";

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub cache: SemanticCacheConfig,
    #[serde(default)]
    pub vector_index: VectorIndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub aws: AwsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Where cache entries live
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VectorIndexBackend {
    /// Redis-protocol search index (MemoryDB, Redis Stack)
    #[default]
    Redis,
    /// In-process index, lost on restart
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VectorIndexConfig {
    pub backend: VectorIndexBackend,
    /// Connection URL, `rediss://` for TLS
    pub url: String,
    /// Connect with the cluster client
    pub cluster: bool,
    /// Search index name
    pub index_name: String,
    /// Vector dimension of the index, must match the embedding model
    pub dimension: usize,
    /// Create the index on `serve` start-up when missing
    pub create_on_startup: bool,
    /// Request server-side ordering of search results (Redis Stack only)
    pub sort_by_distance: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Bedrock embedding model id
    pub model_id: String,
}

/// How answers are generated on a cache miss
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Bedrock knowledge base retrieve-and-generate
    #[default]
    KnowledgeBase,
    /// Direct model invocation without retrieval
    Model,
}

/// Knowledge base search type override
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    #[default]
    Hybrid,
    Semantic,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub mode: GenerationMode,
    /// Bedrock model id (or ARN) producing the answer
    pub model_id: String,
    /// Required in `knowledge_base` mode
    pub knowledge_base_id: Option<String>,
    /// Passages retrieved per question
    pub number_of_results: u32,
    pub search_type: SearchType,
    /// `model` mode only
    pub max_tokens: u32,
    /// `model` mode only
    pub system_prompt: Option<String>,
}

/// Per-call deadlines for the external collaborators
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub embedding_ms: u64,
    pub index_ms: u64,
    pub generation_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AwsConfig {
    /// Region override, otherwise the default provider chain decides
    pub region: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            backend: VectorIndexBackend::default(),
            url: "redis://127.0.0.1:6379".to_string(),
            cluster: false,
            index_name: "bedrock".to_string(),
            dimension: 1536,
            create_on_startup: true,
            sort_by_distance: true,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: "amazon.titan-embed-text-v1".to_string(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            mode: GenerationMode::default(),
            model_id: "anthropic.claude-3-sonnet-20240229-v1:0".to_string(),
            knowledge_base_id: None,
            number_of_results: 5,
            search_type: SearchType::default(),
            max_tokens: 1024,
            system_prompt: None,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            embedding_ms: 10_000,
            index_ms: 2_000,
            generation_ms: 60_000,
        }
    }
}

impl TimeoutConfig {
    pub fn embedding(&self) -> Duration {
        Duration::from_millis(self.embedding_ms)
    }

    pub fn index(&self) -> Duration {
        Duration::from_millis(self.index_ms)
    }

    pub fn generation(&self) -> Duration {
        Duration::from_millis(self.generation_ms)
    }
}

/// Point the vector index at a MemoryDB cluster endpoint: TLS, cluster mode,
/// and no `SORTBY` since MemoryDB's FT.SEARCH does not support it
fn with_cache_endpoint(
    builder: ConfigBuilder<DefaultState>,
    host: Option<&str>,
) -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    builder
        .set_override_option(
            "vector_index.url",
            host.map(|host| format!("rediss://{}:6379", host)),
        )?
        .set_override_option("vector_index.cluster", host.map(|_| true))?
        .set_override_option("vector_index.sort_by_distance", host.map(|_| false))
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let cache_endpoint = std::env::var(CACHE_ENDPOINT_ENV)
            .ok()
            .filter(|v| !v.is_empty());

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option(
                "generation.knowledge_base_id",
                std::env::var(KNOWLEDGE_BASE_ENV).ok().filter(|v| !v.is_empty()),
            )?;

        with_cache_endpoint(builder, cache_endpoint.as_deref())?
            .build()?
            .try_deserialize()
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), DomainError> {
        self.cache.validate()?;

        if self.vector_index.dimension == 0 {
            return Err(DomainError::configuration(
                "vector_index.dimension must be greater than zero",
            ));
        }

        if self.generation.mode == GenerationMode::KnowledgeBase
            && self
                .generation
                .knowledge_base_id
                .as_deref()
                .is_none_or(str::is_empty)
        {
            return Err(DomainError::configuration(format!(
                "generation.knowledge_base_id (or {}) is required in knowledge_base mode",
                KNOWLEDGE_BASE_ENV
            )));
        }

        if self.generation.number_of_results == 0 {
            return Err(DomainError::configuration(
                "generation.number_of_results must be at least 1",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knowledge_base_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.generation.knowledge_base_id = Some("KB12345678".to_string());
        config
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.vector_index.backend, VectorIndexBackend::Redis);
        assert_eq!(config.vector_index.index_name, "bedrock");
        assert_eq!(config.vector_index.dimension, 1536);
        assert_eq!(config.embedding.model_id, "amazon.titan-embed-text-v1");
        assert_eq!(config.generation.mode, GenerationMode::KnowledgeBase);
        assert_eq!(config.generation.number_of_results, 5);
        assert_eq!(config.generation.search_type, SearchType::Hybrid);
        assert_eq!(config.timeouts.index(), Duration::from_secs(2));
        assert!(config.vector_index.sort_by_distance);
    }

    #[test]
    fn test_cache_endpoint_selects_memorydb_cluster() {
        let config: AppConfig = with_cache_endpoint(
            config::Config::builder(),
            Some("clustercfg.cache.abc123.memorydb.us-east-1.amazonaws.com"),
        )
        .unwrap()
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap();

        assert_eq!(
            config.vector_index.url,
            "rediss://clustercfg.cache.abc123.memorydb.us-east-1.amazonaws.com:6379"
        );
        assert!(config.vector_index.cluster);
        assert!(!config.vector_index.sort_by_distance);
    }

    #[test]
    fn test_no_cache_endpoint_keeps_defaults() {
        let config: AppConfig = with_cache_endpoint(config::Config::builder(), None)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.vector_index.url, "redis://127.0.0.1:6379");
        assert!(!config.vector_index.cluster);
        assert!(config.vector_index.sort_by_distance);
    }

    #[test]
    fn test_validate_requires_knowledge_base_id() {
        let config = AppConfig::default();

        assert!(matches!(
            config.validate(),
            Err(DomainError::Configuration { .. })
        ));
        assert!(knowledge_base_config().validate().is_ok());
    }

    #[test]
    fn test_model_mode_needs_no_knowledge_base() {
        let mut config = AppConfig::default();
        config.generation.mode = GenerationMode::Model;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_dimension() {
        let mut config = knowledge_base_config();
        config.vector_index.dimension = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_checks_cache_radius() {
        let mut config = knowledge_base_config();
        config.cache.similarity_radius = 3.0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_sections() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "cache": { "similarity_radius": 0.3 },
            "vector_index": { "backend": "memory", "dimension": 8 },
            "generation": { "mode": "model", "search_type": "semantic" },
            "logging": { "level": "debug", "format": "json" }
        }))
        .unwrap();

        assert!((config.cache.similarity_radius - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.vector_index.backend, VectorIndexBackend::Memory);
        assert_eq!(config.vector_index.dimension, 8);
        assert_eq!(config.vector_index.index_name, "bedrock");
        assert_eq!(config.generation.mode, GenerationMode::Model);
        assert_eq!(config.generation.search_type, SearchType::Semantic);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.server.port, 8080);
    }
}
