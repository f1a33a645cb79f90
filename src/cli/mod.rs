//! CLI module for the semantic answer gateway
//!
//! - `serve`: run the HTTP API
//! - `ask`: answer one question from the command line
//! - `ensure-index`: create the vector index if it is missing

pub mod ask;
pub mod index;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;

/// Question answering gateway with a durable semantic cache
#[derive(Parser)]
#[command(name = "semantic-answer-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Answer a single question and print the answer
    Ask(ask::AskArgs),

    /// Create the vector index if it does not exist
    EnsureIndex,
}

/// Load `.env`, then layered configuration, and reject invalid settings
pub(crate) fn load_config() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    config.validate()?;

    Ok(config)
}
