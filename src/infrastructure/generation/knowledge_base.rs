//! Bedrock knowledge base retrieve-and-generate answering

use std::fmt::Debug;

use async_trait::async_trait;
use aws_sdk_bedrockagentruntime::error::DisplayErrorContext;
use aws_sdk_bedrockagentruntime::types::{
    KnowledgeBaseRetrievalConfiguration, KnowledgeBaseRetrieveAndGenerateConfiguration,
    KnowledgeBaseVectorSearchConfiguration, RetrieveAndGenerateConfiguration,
    RetrieveAndGenerateInput, RetrieveAndGenerateOutput, RetrieveAndGenerateType,
    SearchType as SdkSearchType,
};
use tracing::debug;

use crate::config::SearchType;
use crate::domain::{AnswerGenerator, DomainError, GeneratedAnswer};

const PROVIDER: &str = "bedrock_knowledge_base";

/// Knowledge base settings used for every question
#[derive(Debug, Clone)]
pub struct KnowledgeBaseSettings {
    pub knowledge_base_id: String,
    /// Model id or ARN generating the final answer
    pub model_id: String,
    pub number_of_results: u32,
    pub search_type: SearchType,
}

/// One retrieve-and-generate call
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveAndGenerateParams {
    pub question: String,
    pub knowledge_base_id: String,
    pub model_id: String,
    pub number_of_results: u32,
    pub search_type: SearchType,
}

/// What the service returned
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeBaseAnswer {
    pub text: Option<String>,
    /// S3 URIs of the passages cited in the answer
    pub citations: Vec<String>,
}

/// Bedrock Agent Runtime client trait for dependency injection
#[async_trait]
pub trait KnowledgeBaseClientTrait: Send + Sync + Debug {
    async fn retrieve_and_generate(
        &self,
        params: &RetrieveAndGenerateParams,
    ) -> Result<KnowledgeBaseAnswer, String>;
}

/// Real Bedrock Agent Runtime client
#[derive(Debug, Clone)]
pub struct BedrockAgentClient {
    client: aws_sdk_bedrockagentruntime::Client,
}

impl BedrockAgentClient {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_bedrockagentruntime::Client::new(config),
        }
    }

    fn build_configuration(
        params: &RetrieveAndGenerateParams,
    ) -> Result<RetrieveAndGenerateConfiguration, String> {
        let search_type = match params.search_type {
            SearchType::Hybrid => SdkSearchType::Hybrid,
            SearchType::Semantic => SdkSearchType::Semantic,
        };

        let vector_config = KnowledgeBaseVectorSearchConfiguration::builder()
            .number_of_results(params.number_of_results as i32)
            .override_search_type(search_type)
            .build();

        let retrieval_config = KnowledgeBaseRetrievalConfiguration::builder()
            .vector_search_configuration(vector_config)
            .build();

        let knowledge_base_config = KnowledgeBaseRetrieveAndGenerateConfiguration::builder()
            .knowledge_base_id(&params.knowledge_base_id)
            .model_arn(&params.model_id)
            .retrieval_configuration(retrieval_config)
            .build()
            .map_err(|e| format!("Invalid knowledge base configuration: {}", e))?;

        RetrieveAndGenerateConfiguration::builder()
            .r#type(RetrieveAndGenerateType::KnowledgeBase)
            .knowledge_base_configuration(knowledge_base_config)
            .build()
            .map_err(|e| format!("Invalid retrieve-and-generate configuration: {}", e))
    }
}

#[async_trait]
impl KnowledgeBaseClientTrait for BedrockAgentClient {
    async fn retrieve_and_generate(
        &self,
        params: &RetrieveAndGenerateParams,
    ) -> Result<KnowledgeBaseAnswer, String> {
        let input = RetrieveAndGenerateInput::builder()
            .text(&params.question)
            .build()
            .map_err(|e| format!("Invalid input: {}", e))?;

        let response = self
            .client
            .retrieve_and_generate()
            .input(input)
            .retrieve_and_generate_configuration(Self::build_configuration(params)?)
            .send()
            .await
            .map_err(|e| format!("RetrieveAndGenerate failed: {}", DisplayErrorContext(&e)))?;

        // `output` and `text` are optional in some SDK releases and required in others
        let output: Option<&RetrieveAndGenerateOutput> = response.output().into();
        let text = output.and_then(|o| {
            let text: Option<&str> = o.text().into();
            text.map(str::to_string)
        });

        let citations = response
            .citations()
            .iter()
            .flat_map(|c| c.retrieved_references())
            .filter_map(|r| r.location())
            .filter_map(|l| l.s3_location())
            .filter_map(|s3| s3.uri())
            .map(str::to_string)
            .collect();

        Ok(KnowledgeBaseAnswer { text, citations })
    }
}

/// Answers through a Bedrock knowledge base: retrieval plus generation in one call
#[derive(Debug)]
pub struct KnowledgeBaseGenerator<C: KnowledgeBaseClientTrait> {
    client: C,
    settings: KnowledgeBaseSettings,
}

impl<C: KnowledgeBaseClientTrait> KnowledgeBaseGenerator<C> {
    pub fn new(client: C, settings: KnowledgeBaseSettings) -> Self {
        Self { client, settings }
    }

    fn params_for(&self, question: &str) -> RetrieveAndGenerateParams {
        RetrieveAndGenerateParams {
            question: question.to_string(),
            knowledge_base_id: self.settings.knowledge_base_id.clone(),
            model_id: self.settings.model_id.clone(),
            number_of_results: self.settings.number_of_results,
            search_type: self.settings.search_type,
        }
    }
}

#[async_trait]
impl<C: KnowledgeBaseClientTrait> AnswerGenerator for KnowledgeBaseGenerator<C> {
    async fn generate(&self, question: &str) -> Result<GeneratedAnswer, DomainError> {
        let result = self
            .client
            .retrieve_and_generate(&self.params_for(question))
            .await
            .map_err(|e| DomainError::generation(PROVIDER, e))?;

        let text = result
            .text
            .ok_or_else(|| DomainError::generation(PROVIDER, "Response contained no output text"))?;

        debug!(
            knowledge_base_id = %self.settings.knowledge_base_id,
            citations = result.citations.len(),
            "Generated answer from knowledge base"
        );

        Ok(GeneratedAnswer::new(text).with_citations(result.citations))
    }
}
