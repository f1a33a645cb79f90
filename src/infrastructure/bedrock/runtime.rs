//! Bedrock Runtime `InvokeModel` client

use async_trait::async_trait;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;

/// Bedrock Runtime client trait for dependency injection.
///
/// Errors come back as plain messages; callers wrap them in the failure
/// class of the operation they were performing.
#[async_trait]
pub trait BedrockClientTrait: Send + Sync + std::fmt::Debug {
    async fn invoke_model(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, String>;
}

/// Real AWS Bedrock Runtime client
#[derive(Debug, Clone)]
pub struct BedrockClient {
    client: aws_sdk_bedrockruntime::Client,
}

impl BedrockClient {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_bedrockruntime::Client::new(config),
        }
    }
}

#[async_trait]
impl BedrockClientTrait for BedrockClient {
    async fn invoke_model(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, String> {
        let blob = aws_sdk_bedrockruntime::primitives::Blob::new(body);

        let response = self
            .client
            .invoke_model()
            .model_id(model_id)
            .body(blob)
            .content_type("application/json")
            .accept("application/json")
            .send()
            .await
            .map_err(|e| format!("InvokeModel failed: {}", DisplayErrorContext(&e)))?;

        Ok(response.body.into_inner())
    }
}
