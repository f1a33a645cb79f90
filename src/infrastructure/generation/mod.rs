//! Answer generation on cache misses

mod anthropic;
mod factory;
mod knowledge_base;

pub use anthropic::BedrockModelGenerator;
pub use factory::AnswerGeneratorFactory;
pub use knowledge_base::{
    BedrockAgentClient, KnowledgeBaseAnswer, KnowledgeBaseClientTrait, KnowledgeBaseGenerator,
    KnowledgeBaseSettings, RetrieveAndGenerateParams,
};
