//! LLM backend abstraction

use async_trait::async_trait;

use creditai_core::Turn;

use crate::LlmError;

/// Why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    /// Blocked by the provider's safety filters
    Safety,
    Other,
}

/// LLM generation result
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Generated text
    pub text: String,
    /// Output tokens, when the provider reports them
    pub tokens: Option<usize>,
    /// Total generation time (ms)
    pub total_time_ms: u64,
    pub finish_reason: FinishReason,
}

/// A text-generation service
///
/// `turns` is the full conversation in order; the last turn is the new user
/// prompt. Each call is attempted exactly once.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate the next model turn
    async fn generate(&self, turns: &[Turn]) -> Result<GenerationResult, LlmError>;

    /// Whether the backend is configured to accept calls
    async fn is_available(&self) -> bool;

    /// Get model name
    fn model_name(&self) -> &str;
}
