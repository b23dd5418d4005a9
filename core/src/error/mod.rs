#[allow(clippy::module_inception)]
pub mod error;
pub mod llm;
pub mod node;
pub mod planning;

pub use error::{CancellationError, CliError, RunError};
pub use llm::{LlmError, ProviderError};
pub use node::{BackendError, NodeError};
pub use planning::PlanningError;
