//! Generative answering domain models and traits

mod generator;

pub use generator::{AnswerGenerator, GeneratedAnswer};

#[cfg(test)]
pub use generator::MockAnswerGenerator;
