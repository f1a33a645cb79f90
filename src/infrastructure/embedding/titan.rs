//! Amazon Titan text embeddings through Bedrock

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{DomainError, EmbeddingProvider};
use crate::infrastructure::bedrock::BedrockClientTrait;

const PROVIDER: &str = "bedrock";

#[derive(Debug, Serialize)]
struct TitanEmbeddingRequest<'a> {
    #[serde(rename = "inputText")]
    input_text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TitanEmbeddingResponse {
    embedding: Option<Vec<f32>>,
    #[serde(rename = "inputTextTokenCount")]
    input_text_token_count: Option<u32>,
}

/// Titan embedding provider (`amazon.titan-embed-text-v1` and compatible)
#[derive(Debug)]
pub struct TitanEmbeddingProvider<C: BedrockClientTrait> {
    client: C,
    model_id: String,
}

impl<C: BedrockClientTrait> TitanEmbeddingProvider<C> {
    pub fn new(client: C, model_id: impl Into<String>) -> Self {
        Self {
            client,
            model_id: model_id.into(),
        }
    }

    fn parse_response(&self, bytes: &[u8]) -> Result<Vec<f32>, DomainError> {
        let response: TitanEmbeddingResponse = serde_json::from_slice(bytes).map_err(|e| {
            DomainError::embedding(PROVIDER, format!("Failed to parse response: {}", e))
        })?;

        let vector = response
            .embedding
            .filter(|v| !v.is_empty())
            .ok_or_else(|| DomainError::embedding(PROVIDER, "Response contained no embedding"))?;

        debug!(
            model = %self.model_id,
            dimensions = vector.len(),
            input_tokens = ?response.input_text_token_count,
            "Generated embedding"
        );

        Ok(vector)
    }
}

#[async_trait]
impl<C: BedrockClientTrait> EmbeddingProvider for TitanEmbeddingProvider<C> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let body = serde_json::to_vec(&TitanEmbeddingRequest { input_text: text }).map_err(|e| {
            DomainError::embedding(PROVIDER, format!("Failed to serialize request: {}", e))
        })?;

        let bytes = self
            .client
            .invoke_model(&self.model_id, body)
            .await
            .map_err(|e| DomainError::embedding(PROVIDER, e))?;

        self.parse_response(&bytes)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bedrock::MockBedrockClient;

    const MODEL: &str = "amazon.titan-embed-text-v1";

    #[tokio::test]
    async fn test_titan_embedding() {
        let client = MockBedrockClient::new().with_response(
            MODEL,
            serde_json::json!({
                "embedding": [0.25, -0.5, 1.0],
                "inputTextTokenCount": 7
            }),
        );
        let provider = TitanEmbeddingProvider::new(client, MODEL);

        let vector = provider.embed("What is the return policy?").await.unwrap();

        assert_eq!(vector, vec![0.25, -0.5, 1.0]);
        assert_eq!(provider.model_id(), MODEL);
    }

    #[tokio::test]
    async fn test_titan_request_body() {
        let client = MockBedrockClient::new()
            .with_response(MODEL, serde_json::json!({ "embedding": [1.0] }));
        let provider = TitanEmbeddingProvider::new(client, MODEL);

        provider.embed("hello").await.unwrap();

        let requests = provider.client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, MODEL);
        assert_eq!(requests[0].1, serde_json::json!({ "inputText": "hello" }));
    }

    #[tokio::test]
    async fn test_titan_missing_embedding() {
        let client = MockBedrockClient::new()
            .with_response(MODEL, serde_json::json!({ "inputTextTokenCount": 3 }));
        let provider = TitanEmbeddingProvider::new(client, MODEL);

        let result = provider.embed("hello").await;

        assert!(matches!(result, Err(DomainError::Embedding { .. })));
    }

    #[tokio::test]
    async fn test_titan_empty_embedding() {
        let client =
            MockBedrockClient::new().with_response(MODEL, serde_json::json!({ "embedding": [] }));
        let provider = TitanEmbeddingProvider::new(client, MODEL);

        assert!(provider.embed("hello").await.is_err());
    }

    #[tokio::test]
    async fn test_titan_provider_error() {
        let client = MockBedrockClient::new().with_error(MODEL, "ThrottlingException");
        let provider = TitanEmbeddingProvider::new(client, MODEL);

        let err = provider.embed("hello").await.unwrap_err();

        assert!(err.to_string().contains("ThrottlingException"));
        assert!(matches!(err, DomainError::Embedding { .. }));
    }
}
