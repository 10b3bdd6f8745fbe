//! The four pipeline agents: planning, research, drafting and editing.
//!
//! DESIGN
//! ======
//! Each agent call returns its output together with the [`AgentStep`] that
//! records it. A failed call still produces a step: [`AgentFailure`] carries
//! the step with its error filled in, so the orchestrator can append it to
//! the report before giving up.

pub mod drafting;
pub mod editing;
pub mod planning;
pub mod research;

use std::time::Instant;

use crate::error::ErrorCode;
use crate::models::AgentStep;
use crate::search::SearchError;
use crate::services::completion::CompletionError;

/// Rough characters per token.
pub const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("invalid plan: {0}")]
    InvalidPlan(String),
}

impl AgentError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Completion(e) => e.is_timeout(),
            Self::Search(e) => e.is_timeout(),
            Self::InvalidPlan(_) => false,
        }
    }
}

impl ErrorCode for AgentError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Completion(e) => e.error_code(),
            Self::Search(e) => e.error_code(),
            Self::InvalidPlan(_) => "E_INVALID_PLAN",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Completion(e) => e.retryable(),
            Self::Search(e) => e.retryable(),
            Self::InvalidPlan(_) => true,
        }
    }
}

/// A failed agent call and the step that records it.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct AgentFailure {
    pub step: AgentStep,
    #[source]
    pub error: AgentError,
}

impl AgentFailure {
    pub(crate) fn new(step: AgentStep, started: Instant, error: impl Into<AgentError>) -> Self {
        let error = error.into();
        tracing::error!(agent = %step.agent_name, step_type = %step.step_type, error = %error, "agent step failed");
        Self { step: step.failed(started, &error), error }
    }
}

pub type AgentResult<T> = Result<(T, AgentStep), AgentFailure>;

/// Token ceiling for roughly `words` words of output: 1.3 tokens per word
/// plus 20% headroom.
#[must_use]
pub fn max_tokens_for_words(words: u32) -> u32 {
    u32::try_from(u64::from(words) * 156 / 100).unwrap_or(u32::MAX)
}

#[must_use]
pub fn estimate_tokens(text: &str) -> u64 {
    (text.len() / CHARS_PER_TOKEN) as u64
}
