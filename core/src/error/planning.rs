use thiserror::Error;

/// Reasons a query cannot be turned into an executable plan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanningError {
    #[error("query is empty")]
    EmptyQuery,

    #[error("plan contains no tasks")]
    EmptyPlan,

    #[error("plan has {count} tasks, the limit is {limit}")]
    TooManyTasks { count: usize, limit: usize },

    #[error("Duplicate task ID: {0}")]
    DuplicateTaskId(String),

    #[error("Dependency not found: task '{task_id}' depends on '{missing_dep}'")]
    DependencyNotFound { task_id: String, missing_dep: String },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("task '{task_id}' reads from '{reference}' which is not one of its dependencies")]
    UnreachableReference { task_id: String, reference: String },

    #[error("invalid task '{task_id}': {reason}")]
    InvalidTask { task_id: String, reason: String },

    #[error("malformed plan output: {0}")]
    MalformedOutput(String),
}

impl PlanningError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyQuery => "empty_query",
            Self::EmptyPlan => "empty_plan",
            Self::TooManyTasks { .. } => "too_many_tasks",
            Self::DuplicateTaskId(_) => "duplicate_task_id",
            Self::DependencyNotFound { .. } => "dependency_not_found",
            Self::CircularDependency(_) => "circular_dependency",
            Self::UnreachableReference { .. } => "unreachable_reference",
            Self::InvalidTask { .. } => "invalid_task",
            Self::MalformedOutput(_) => "malformed_plan",
        }
    }
}
