use thiserror::Error;

use super::planning::PlanningError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("run failed: {0}")]
    Run(#[from] RunError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Run-level failures. Task failures never surface here; they are recorded on
/// the task and reported by the finalizer.
#[derive(Error, Debug, Clone)]
pub enum RunError {
    #[error("planning failed: {0}")]
    Planning(#[from] PlanningError),
    #[error("{0}")]
    Cancelled(#[from] CancellationError),
    #[error("internal executor error: {0}")]
    Internal(String),
}

impl RunError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Planning(e) => e.code(),
            Self::Cancelled(_) => "cancelled",
            Self::Internal(_) => "internal_error",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("run {run_id} cancelled ({} in-flight task(s) abandoned)", .abandoned.len())]
pub struct CancellationError {
    pub run_id: String,
    /// Tasks that were still running when the grace period ran out.
    pub abandoned: Vec<String>,
}
