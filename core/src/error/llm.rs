use thiserror::Error;

/// Error returned by a single provider call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Worth retrying or falling back (timeouts, rate limits, 5xx).
    #[error("transient: {0}")]
    Transient(String),
    /// The request itself is unacceptable to this provider (bad key, bad model, 4xx).
    #[error("permanent: {0}")]
    Permanent(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Error surfaced by the router after its fallback policy has run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("transient llm failure from {provider}: {message}")]
    Transient { provider: String, message: String },
    #[error("permanent llm failure from {provider}: {message}")]
    Permanent { provider: String, message: String },
}

impl LlmError {
    pub fn provider(&self) -> &str {
        match self {
            Self::Transient { provider, .. } | Self::Permanent { provider, .. } => provider,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Transient { .. } => "llm_transient",
            Self::Permanent { .. } => "llm_permanent",
        }
    }
}
