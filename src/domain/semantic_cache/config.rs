//! Semantic cache configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Largest meaningful cosine distance
pub const MAX_COSINE_DISTANCE: f32 = 2.0;

/// Configuration for semantic caching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticCacheConfig {
    /// Whether semantic caching is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum cosine distance for a cache hit (0.0 to 2.0).
    /// Smaller values require more similar questions.
    #[serde(default = "default_similarity_radius")]
    pub similarity_radius: f32,

    /// Maximum number of neighbours requested from the index
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Key prefix of cache entries, also the prefix the index is defined over
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Optional expiry applied to new entries, in seconds
    #[serde(default)]
    pub entry_ttl_secs: Option<u64>,
}

fn default_enabled() -> bool {
    true
}

fn default_similarity_radius() -> f32 {
    0.4
}

fn default_max_results() -> usize {
    1
}

fn default_key_prefix() -> String {
    "doc:".to_string()
}

impl Default for SemanticCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            similarity_radius: default_similarity_radius(),
            max_results: default_max_results(),
            key_prefix: default_key_prefix(),
            entry_ttl_secs: None,
        }
    }
}

impl SemanticCacheConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the entry TTL as Duration
    pub fn entry_ttl(&self) -> Option<Duration> {
        self.entry_ttl_secs.map(Duration::from_secs)
    }

    /// Set whether caching is enabled
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the similarity radius
    pub fn with_similarity_radius(mut self, radius: f32) -> Self {
        self.similarity_radius = radius;
        self
    }

    /// Set the maximum number of neighbours
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Set the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the entry TTL
    pub fn with_entry_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl_secs = Some(ttl.as_secs());
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if !(0.0..=MAX_COSINE_DISTANCE).contains(&self.similarity_radius) {
            return Err(DomainError::configuration(format!(
                "cache.similarity_radius must be within [0.0, {}], got {}",
                MAX_COSINE_DISTANCE, self.similarity_radius
            )));
        }

        if self.max_results == 0 {
            return Err(DomainError::configuration(
                "cache.max_results must be at least 1",
            ));
        }

        if self.key_prefix.is_empty() {
            return Err(DomainError::configuration("cache.key_prefix must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SemanticCacheConfig::default();

        assert!(config.enabled);
        assert!((config.similarity_radius - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.max_results, 1);
        assert_eq!(config.key_prefix, "doc:");
        assert_eq!(config.entry_ttl(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = SemanticCacheConfig::new()
            .with_enabled(false)
            .with_similarity_radius(0.25)
            .with_max_results(3)
            .with_key_prefix("qa:")
            .with_entry_ttl(Duration::from_secs(86400));

        assert!(!config.enabled);
        assert!((config.similarity_radius - 0.25).abs() < f32::EPSILON);
        assert_eq!(config.max_results, 3);
        assert_eq!(config.key_prefix, "qa:");
        assert_eq!(config.entry_ttl(), Some(Duration::from_secs(86400)));
    }

    #[test]
    fn test_radius_out_of_range_rejected() {
        let config = SemanticCacheConfig::new().with_similarity_radius(2.5);
        assert!(matches!(
            config.validate(),
            Err(DomainError::Configuration { .. })
        ));

        let config = SemanticCacheConfig::new().with_similarity_radius(-0.1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_results_rejected() {
        let config = SemanticCacheConfig::new().with_max_results(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SemanticCacheConfig =
            serde_json::from_str(r#"{"similarity_radius": 0.2}"#).unwrap();

        assert!(config.enabled);
        assert!((config.similarity_radius - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.key_prefix, "doc:");
    }
}
