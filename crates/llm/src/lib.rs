//! Generative-language integration for the credit chat relay
//!
//! Features:
//! - Backend trait over conversation turns
//! - Google Gemini `generateContent` backend
//! - Business-data prompt construction

pub mod backend;
pub mod gemini;
pub mod prompt;

pub use backend::{FinishReason, GenerationResult, LlmBackend};
pub use gemini::{GeminiBackend, GeminiConfig};
pub use prompt::build_business_prompt;

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}
