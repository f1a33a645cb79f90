//! Ensure-index command

use tracing::info;

use crate::domain::IndexStatus;
use crate::infrastructure::logging;
use crate::infrastructure::vector_index::create_vector_index;

pub async fn run() -> anyhow::Result<()> {
    let config = super::load_config()?;
    logging::init_logging(&(&config.logging).into());

    let index = create_vector_index(
        &config.vector_index,
        &config.cache.key_prefix,
        config.timeouts.index(),
    );

    let status = index.ensure_index().await?;
    info!(index = %config.vector_index.index_name, status = ?status, "Index checked");

    match status {
        IndexStatus::Created => println!("created index {}", config.vector_index.index_name),
        IndexStatus::AlreadyExists => {
            println!("index {} already exists", config.vector_index.index_name)
        }
    }

    Ok(())
}
