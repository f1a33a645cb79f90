//! Serve command - runs the HTTP API

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::api::{create_router, AnswerServiceTrait};
use crate::config::AppConfig;
use crate::domain::VectorIndex;
use crate::infrastructure::observability::{init_metrics, init_tracing, shutdown_tracing};

/// Run the API server until Ctrl+C or SIGTERM
pub async fn run() -> anyhow::Result<()> {
    let config = super::load_config()?;
    init_tracing(&(&config.logging).into(), &config.observability.tracing);

    let state = crate::create_app_state_with_config(&config).await?;

    if config.vector_index.create_on_startup {
        prepare_index(state.vector_index.as_ref()).await;
    }

    let answer_service = Arc::clone(&state.answer_service);
    let metrics = init_metrics(&config.observability.metrics);
    let app = create_router(state, metrics);

    let addr = build_socket_addr(&config)?;
    info!("Starting API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    finish_cache_writes(answer_service.as_ref(), config.timeouts.index()).await;
    shutdown_tracing();
    info!("API server shutdown complete");

    Ok(())
}

/// Reads degrade to misses while the index is missing, so start-up carries on
async fn prepare_index(index: &dyn VectorIndex) {
    match index.ensure_index().await {
        Ok(status) => info!(status = ?status, "Vector index ready"),
        Err(e) => warn!(error = %e, "Could not prepare vector index"),
    }
}

/// Give in-flight cache writes until `deadline` to land; the rest are dropped
async fn finish_cache_writes(answer_service: &dyn AnswerServiceTrait, deadline: Duration) {
    match timeout(deadline, answer_service.finish_cache_writes()).await {
        Ok(0) => {}
        Ok(count) => info!(count, "Finished pending cache writes"),
        Err(_) => warn!(
            deadline_ms = deadline.as_millis() as u64,
            "Abandoned pending cache writes at shutdown"
        ),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    )))
}
