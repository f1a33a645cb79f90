//! Application services

mod semantic_answer_service;

pub use semantic_answer_service::{
    AnswerOutcome, CacheStatus, PendingCacheWrite, SemanticAnswerService,
};
