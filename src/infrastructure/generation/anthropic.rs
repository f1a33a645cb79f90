//! Direct Anthropic messages model on Bedrock, used when no knowledge base is configured

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{AnswerGenerator, DomainError, GeneratedAnswer};
use crate::infrastructure::bedrock::BedrockClientTrait;

const PROVIDER: &str = "bedrock";
const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    anthropic_version: &'static str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<UserMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

/// Answers with a single user turn against a Claude model
#[derive(Debug)]
pub struct BedrockModelGenerator<C: BedrockClientTrait> {
    client: C,
    model_id: String,
    max_tokens: u32,
    system_prompt: Option<String>,
}

impl<C: BedrockClientTrait> BedrockModelGenerator<C> {
    pub fn new(client: C, model_id: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            client,
            model_id: model_id.into(),
            max_tokens,
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    fn build_request(&self, question: &str) -> Result<Vec<u8>, DomainError> {
        let request = MessagesRequest {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: self.max_tokens,
            system: self.system_prompt.as_deref(),
            messages: vec![UserMessage {
                role: "user",
                content: question,
            }],
        };

        serde_json::to_vec(&request).map_err(|e| {
            DomainError::generation(PROVIDER, format!("Failed to serialize request: {}", e))
        })
    }

    fn parse_response(&self, bytes: &[u8]) -> Result<GeneratedAnswer, DomainError> {
        let response: MessagesResponse = serde_json::from_slice(bytes).map_err(|e| {
            DomainError::generation(PROVIDER, format!("Failed to parse response: {}", e))
        })?;

        let text = response
            .content
            .into_iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(DomainError::generation(
                PROVIDER,
                "Response contained no text content",
            ));
        }

        debug!(
            model = %self.model_id,
            stop_reason = ?response.stop_reason,
            "Generated answer from model"
        );

        Ok(GeneratedAnswer::new(text))
    }
}

#[async_trait]
impl<C: BedrockClientTrait> AnswerGenerator for BedrockModelGenerator<C> {
    async fn generate(&self, question: &str) -> Result<GeneratedAnswer, DomainError> {
        let body = self.build_request(question)?;

        let bytes = self
            .client
            .invoke_model(&self.model_id, body)
            .await
            .map_err(|e| DomainError::generation(PROVIDER, e))?;

        self.parse_response(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bedrock::MockBedrockClient;
    use serde_json::json;

    const MODEL: &str = "anthropic.claude-3-sonnet-20240229-v1:0";

    #[tokio::test]
    async fn test_generate_joins_text_blocks() {
        let client = MockBedrockClient::new().with_response(
            MODEL,
            json!({
                "content": [
                    {"type": "text", "text": "Paris is the "},
                    {"type": "text", "text": "capital of France."}
                ],
                "stop_reason": "end_turn"
            }),
        );
        let generator = BedrockModelGenerator::new(client, MODEL, 512);

        let answer = generator.generate("What is the capital of France?").await.unwrap();

        assert_eq!(answer.text, "Paris is the capital of France.");
        assert!(answer.citations.is_empty());
    }

    #[tokio::test]
    async fn test_request_body_shape() {
        let client = MockBedrockClient::new().with_response(
            MODEL,
            json!({"content": [{"type": "text", "text": "ok"}]}),
        );
        let generator = BedrockModelGenerator::new(client, MODEL, 256)
            .with_system_prompt(Some("Answer briefly.".to_string()));

        generator.generate("Hello?").await.unwrap();

        let requests = generator.client.requests();
        assert_eq!(requests.len(), 1);
        let (model, body) = &requests[0];
        assert_eq!(model, MODEL);
        assert_eq!(body["anthropic_version"], "bedrock-2023-05-31");
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["system"], "Answer briefly.");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Hello?");
    }

    #[tokio::test]
    async fn test_system_prompt_omitted_when_unset() {
        let client = MockBedrockClient::new().with_response(
            MODEL,
            json!({"content": [{"type": "text", "text": "ok"}]}),
        );
        let generator = BedrockModelGenerator::new(client, MODEL, 256);

        generator.generate("Hello?").await.unwrap();

        let (_, body) = &generator.client.requests()[0];
        assert!(body.get("system").is_none());
    }

    #[tokio::test]
    async fn test_empty_content_is_generation_failure() {
        let client = MockBedrockClient::new().with_response(MODEL, json!({"content": []}));
        let generator = BedrockModelGenerator::new(client, MODEL, 256);

        let result = generator.generate("Hello?").await;

        assert!(matches!(result, Err(DomainError::Generation { .. })));
    }

    #[tokio::test]
    async fn test_client_error_is_generation_failure() {
        let client = MockBedrockClient::new().with_error(MODEL, "ThrottlingException");
        let generator = BedrockModelGenerator::new(client, MODEL, 256);

        let err = generator.generate("Hello?").await.unwrap_err();

        assert!(matches!(err, DomainError::Generation { .. }));
        assert!(err.to_string().contains("ThrottlingException"));
    }
}
