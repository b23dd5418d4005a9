//! Model routing: a static table maps each [`TaskType`] to ordered
//! provider/model candidates, and [`LlmRouter`] walks them with fallback.

mod retry;
mod router;
mod traits;
mod types;

pub use retry::RetryStrategy;
pub use router::{LlmRouter, LlmRouterBuilder, RoutingTable};
pub use traits::LlmProvider;
pub use types::{
    AttemptOutcome, LlmRequest, ModelResponse, RouteAttempt, RouteTarget, TaskType,
};
