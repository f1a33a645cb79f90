//! HTTP request and response types

pub mod answer;
pub mod error;
pub mod json;

pub use answer::{AnswerRequest, AnswerResponse};
pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use json::Json;
