//! Semantic Answer Gateway
//!
//! Answers natural-language questions through a durable semantic cache:
//! - Questions are embedded with Amazon Bedrock (Titan)
//! - Equivalent earlier questions are found by a vector range search
//! - Misses are answered by a Bedrock knowledge base (or a model) and cached

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use domain::VectorIndex;
use infrastructure::{
    bedrock::{load_sdk_config, BedrockClient},
    embedding::TitanEmbeddingProvider,
    generation::AnswerGeneratorFactory,
    services::SemanticAnswerService,
    vector_index::create_vector_index,
};
use tracing::info;

/// Wired service graph shared by the CLI commands
#[derive(Debug)]
pub struct AppComponents {
    pub answer_service: SemanticAnswerService,
    pub vector_index: Arc<dyn VectorIndex>,
}

/// Build the clients and the answer service from configuration
pub async fn create_components(config: &AppConfig) -> anyhow::Result<AppComponents> {
    let sdk_config = load_sdk_config(&config.aws).await;

    let embedder = Arc::new(TitanEmbeddingProvider::new(
        BedrockClient::new(&sdk_config),
        &config.embedding.model_id,
    ));
    let generator = AnswerGeneratorFactory::create(&config.generation, &sdk_config)?;
    let vector_index = create_vector_index(
        &config.vector_index,
        &config.cache.key_prefix,
        config.timeouts.index(),
    );

    let answer_service = SemanticAnswerService::new(
        embedder,
        vector_index.clone(),
        generator,
        config.cache.clone(),
    )
    .with_timeouts(config.timeouts.clone());

    info!(
        embedding_model = %config.embedding.model_id,
        generation_mode = ?config.generation.mode,
        index_backend = ?config.vector_index.backend,
        cache_enabled = config.cache.enabled,
        radius = config.cache.similarity_radius,
        "Answer service initialized"
    );

    Ok(AppComponents {
        answer_service,
        vector_index,
    })
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let components = create_components(config).await?;

    Ok(AppState::new(
        Arc::new(components.answer_service),
        components.vector_index,
    ))
}
