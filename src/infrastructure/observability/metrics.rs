//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use super::config::MetricsConfig;

const ANSWER_DURATION: &str = "answer_duration_seconds";

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
    path: String,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    let builder = match PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full(ANSWER_DURATION.to_string()),
        &config.answer_duration_buckets,
    ) {
        Ok(builder) => builder,
        Err(e) => {
            tracing::error!("Invalid answer duration buckets: {}", e);
            return None;
        }
    };

    match builder.install_recorder() {
        Ok(handle) => {
            gauge!("semantic_answer_gateway_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
                path: config.path.clone(),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics) -> Router {
    let path = metrics.path.clone();

    Router::new()
        .route(&path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// How a question was resolved against the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookupOutcome {
    Hit,
    Miss,
    Bypass,
}

impl CacheLookupOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Bypass => "bypass",
        }
    }
}

pub fn record_cache_lookup(outcome: CacheLookupOutcome) {
    match outcome {
        CacheLookupOutcome::Hit => counter!("semantic_cache_hits_total").increment(1),
        CacheLookupOutcome::Miss => counter!("semantic_cache_misses_total").increment(1),
        CacheLookupOutcome::Bypass => counter!("semantic_cache_bypass_total").increment(1),
    }
}

pub fn record_cache_read_failure() {
    counter!("semantic_cache_read_failures_total").increment(1);
}

pub fn record_cache_write(success: bool) {
    if success {
        counter!("semantic_cache_writes_total").increment(1);
    } else {
        counter!("semantic_cache_write_failures_total").increment(1);
    }
}

/// Record an answered (or failed) question
pub fn record_answer(outcome: Option<CacheLookupOutcome>, duration: Duration) {
    let cache = outcome.map_or("error", |o| o.as_str());

    histogram!(ANSWER_DURATION, "cache" => cache).record(duration.as_secs_f64());
}
