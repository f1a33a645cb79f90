//! Question answering endpoint

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use crate::api::state::AppState;
use crate::api::types::{AnswerRequest, AnswerResponse, ApiError, Json};
use crate::domain::DomainError;

/// Response header reporting whether the answer came from the semantic cache
pub const CACHE_STATUS_HEADER: &str = "x-semantic-cache";

/// POST /v1/answer
pub async fn answer_question(
    State(state): State<AppState>,
    Json(request): Json<AnswerRequest>,
) -> Result<Response, ApiError> {
    debug!("Received new question");

    let outcome = state
        .answer_service
        .answer(&request.question)
        .await
        .map_err(|e| {
            match e {
                DomainError::MalformedRequest { .. } => debug!(error = %e, "Rejected question"),
                _ => error!(error = %e, "Failed to answer question"),
            }
            ApiError::from(e)
        })?;

    let headers = [(CACHE_STATUS_HEADER, outcome.cache_status.as_str())];
    let body = AnswerResponse {
        answer: outcome.answer,
    };

    Ok((headers, Json(body)).into_response())
}
