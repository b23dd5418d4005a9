use thiserror::Error;

use super::llm::LlmError;

/// Failure reported by a search or scrape backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("{backend} transient failure: {message}")]
    Transient { backend: String, message: String },
    #[error("{backend} permanent failure: {message}")]
    Permanent { backend: String, message: String },
    #[error("page blocked: {0}")]
    Blocked(String),
}

impl BackendError {
    pub fn transient(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn permanent(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Permanent {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Transient { .. } => "backend_transient",
            Self::Permanent { .. } => "backend_permanent",
            Self::Blocked(_) => "scrape_blocked",
        }
    }
}

/// Task-local failure. Recorded on the task result, never aborts the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("no usable results: {0}")]
    NoResults(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("cancelled")]
    Cancelled,

    #[error("no node registered for {0}")]
    Unsupported(String),
}

impl NodeError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingInput(_) => "missing_input",
            Self::NoResults(_) => "no_results",
            Self::Backend(e) => e.code(),
            Self::Llm(e) => e.code(),
            Self::MalformedOutput(_) => "malformed_output",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
            Self::Unsupported(_) => "unsupported",
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            Self::Backend(e) => e.is_transient(),
            Self::Llm(e) => e.is_transient(),
            Self::Timeout(_) => true,
            _ => false,
        }
    }
}
