//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `scout_core::api` instead of reaching into internal modules.

pub use crate::backend::{
    BackendSet, ProductData, ScrapeBackend, ScrapeOutcome, SearchBackend, SearchHit,
};
pub use crate::config::{
    get_scout_data_dir, load_default, load_from_path, AppConfig, ExecutorConfig, HttpServerConfig,
    LlmConfig, LoggingConfig, PlannerConfig, PlannerStrategy, ProviderConfig, ProviderKind,
    RetryConfig, ScrapeConfig, SearchConfig,
};
pub use crate::error::{
    BackendError, CancellationError, CliError, LlmError, NodeError, PlanningError, ProviderError,
    RunError,
};
pub use crate::executor::{
    CancelOnDrop, CancelToken, EventSink, EventSnapshot, EventStep, ExecutorOptions,
    OutputRenderer, PriorResults, RunPhase, StreamEvent, TaskExecutor, TaskFailure, TaskOutcome,
    TaskResult,
};
pub use crate::finalize::{finalize, Report, ReportSection, ReportTopic, RunSummary, SectionEntry};
pub use crate::llm::{
    LlmProvider, LlmRequest, LlmRouter, ModelResponse, RetryStrategy, RouteTarget, RoutingTable,
    TaskType,
};
pub use crate::nodes::{NodeSet, TaskNode, TaskPayload};
pub use crate::plan::{Plan, PlanSource, Task, TaskInput, TaskKind, TaskStatus};
pub use crate::planner::Planner;
pub use crate::workflow::{Workflow, WorkflowUpdate};
