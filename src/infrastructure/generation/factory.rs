use std::sync::Arc;

use super::{
    BedrockAgentClient, BedrockModelGenerator, KnowledgeBaseGenerator, KnowledgeBaseSettings,
};
use crate::config::{GenerationConfig, GenerationMode};
use crate::domain::{AnswerGenerator, DomainError};
use crate::infrastructure::bedrock::BedrockClient;

/// Factory for the answer generator selected by configuration
#[derive(Debug)]
pub struct AnswerGeneratorFactory;

impl AnswerGeneratorFactory {
    pub fn create(
        config: &GenerationConfig,
        sdk_config: &aws_config::SdkConfig,
    ) -> Result<Arc<dyn AnswerGenerator>, DomainError> {
        match config.mode {
            GenerationMode::KnowledgeBase => {
                let settings = Self::knowledge_base_settings(config)?;
                let client = BedrockAgentClient::new(sdk_config);
                Ok(Arc::new(KnowledgeBaseGenerator::new(client, settings)))
            }

            GenerationMode::Model => {
                let generator = BedrockModelGenerator::new(
                    BedrockClient::new(sdk_config),
                    &config.model_id,
                    config.max_tokens,
                )
                .with_system_prompt(config.system_prompt.clone());
                Ok(Arc::new(generator))
            }
        }
    }

    fn knowledge_base_settings(
        config: &GenerationConfig,
    ) -> Result<KnowledgeBaseSettings, DomainError> {
        let knowledge_base_id = config
            .knowledge_base_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                DomainError::configuration(
                    "generation.knowledge_base_id is required in knowledge_base mode",
                )
            })?;

        Ok(KnowledgeBaseSettings {
            knowledge_base_id: knowledge_base_id.to_string(),
            model_id: config.model_id.clone(),
            number_of_results: config.number_of_results,
            search_type: config.search_type,
        })
    }
}
