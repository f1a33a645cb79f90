use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Malformed request: {message}")]
    MalformedRequest { message: String },

    #[error("Embedding failure: {provider} - {message}")]
    Embedding { provider: String, message: String },

    #[error("Vector index read failure: {message}")]
    IndexRead { message: String },

    #[error("Vector index write failure: {message}")]
    IndexWrite { message: String },

    #[error("Generation failure: {provider} - {message}")]
    Generation { provider: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn malformed_request(message: impl Into<String>) -> Self {
        Self::MalformedRequest {
            message: message.into(),
        }
    }

    pub fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Embedding {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn index_read(message: impl Into<String>) -> Self {
        Self::IndexRead {
            message: message.into(),
        }
    }

    pub fn index_write(message: impl Into<String>) -> Self {
        Self::IndexWrite {
            message: message.into(),
        }
    }

    pub fn generation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Generation {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
