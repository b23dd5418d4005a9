//! Dependency-graph execution for research plans.
//!
//! ```text
//! Plan (validated, staged)
//!   ↓
//! ExecutionState::new()      every task pending
//!   ↓
//! TaskExecutor::execute()    frontier dispatch, bounded by max_parallel
//!   ↓                        StreamEvent per start / finish
//! ExecutionState (finalizing) → finalize::finalize()
//! ```

mod cancel;
mod engine;
mod events;
mod state;
pub mod traits;
mod transitions;
pub mod types;

pub use cancel::{CancelOnDrop, CancelToken};
pub use engine::TaskExecutor;
pub use events::{EventSink, EventSnapshot, EventStep, PlannedTask, StreamEvent};
pub use state::{ExecutionState, StateError};
pub use traits::OutputRenderer;
pub use transitions::{RunPhase, StateTransition, TransitionError};
pub use types::{ExecutorOptions, PriorResults, TaskFailure, TaskOutcome, TaskResult};
