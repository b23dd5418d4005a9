use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backend::{ProductData, SearchHit};
use crate::config::ExecutorConfig;
use crate::error::NodeError;
use crate::nodes::TaskPayload;
use crate::plan::{TaskKind, TaskStatus};

/// Execution options for the task executor.
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Maximum tasks in flight at once.
    pub max_parallel: usize,

    /// Deadline for one node invocation.
    pub node_timeout: Duration,

    /// How long in-flight nodes may run on after cancellation.
    pub cancel_grace: Duration,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self::from(&ExecutorConfig::default())
    }
}

impl From<&ExecutorConfig> for ExecutorOptions {
    fn from(cfg: &ExecutorConfig) -> Self {
        Self {
            max_parallel: cfg.max_parallel.max(1),
            node_timeout: Duration::from_millis(cfg.node_timeout_ms),
            cancel_grace: Duration::from_millis(cfg.cancel_grace_ms),
        }
    }
}

/// Structured, serializable record of a node failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFailure {
    pub code: String,
    pub message: String,
    pub transient: bool,
}

impl From<&NodeError> for TaskFailure {
    fn from(err: &NodeError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            transient: err.is_transient(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Succeeded {
        payload: TaskPayload,
    },
    Failed {
        failure: TaskFailure,
    },
    /// Never dispatched. `blocked_by` names the dependency that did not
    /// succeed; it is `None` when the run was cancelled first.
    Skipped {
        blocked_by: Option<String>,
    },
}

/// Outcome of one task. Written once by the executor, then shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskResult {
    pub task_id: String,
    pub kind: TaskKind,
    #[serde(flatten)]
    pub outcome: TaskOutcome,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
}

impl TaskResult {
    pub fn skipped(task_id: &str, kind: TaskKind, blocked_by: Option<String>) -> Self {
        Self {
            task_id: task_id.to_string(),
            kind,
            outcome: TaskOutcome::Skipped { blocked_by },
            started_at: None,
            finished_at: Utc::now(),
        }
    }

    pub fn status(&self) -> TaskStatus {
        match self.outcome {
            TaskOutcome::Succeeded { .. } => TaskStatus::Succeeded,
            TaskOutcome::Failed { .. } => TaskStatus::Failed,
            TaskOutcome::Skipped { .. } => TaskStatus::Skipped,
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Succeeded { .. })
    }

    pub fn payload(&self) -> Option<&TaskPayload> {
        match &self.outcome {
            TaskOutcome::Succeeded { payload } => Some(payload),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        match &self.outcome {
            TaskOutcome::Failed { failure } => Some(failure),
            _ => None,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at
            .map(|s| (self.finished_at - s).num_milliseconds().max(0) as u64)
            .unwrap_or(0)
    }
}

/// Immutable snapshot of the results available when a task was dispatched.
#[derive(Debug, Clone, Default)]
pub struct PriorResults {
    results: Arc<HashMap<String, Arc<TaskResult>>>,
}

impl PriorResults {
    pub fn new(results: HashMap<String, Arc<TaskResult>>) -> Self {
        Self {
            results: Arc::new(results),
        }
    }

    pub fn from_results(results: impl IntoIterator<Item = TaskResult>) -> Self {
        Self::new(
            results
                .into_iter()
                .map(|r| (r.task_id.clone(), Arc::new(r)))
                .collect(),
        )
    }

    pub fn get(&self, task_id: &str) -> Option<&TaskResult> {
        self.results.get(task_id).map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Payload of a succeeded task, or a `MissingInput` error naming it.
    pub fn payload(&self, task_id: &str) -> Result<&TaskPayload, NodeError> {
        self.get(task_id)
            .and_then(TaskResult::payload)
            .ok_or_else(|| NodeError::MissingInput(format!("no successful result for '{task_id}'")))
    }

    pub fn product(&self, task_id: &str) -> Result<&ProductData, NodeError> {
        match self.payload(task_id)? {
            TaskPayload::Product(product) => Ok(product),
            other => Err(NodeError::MissingInput(format!(
                "'{task_id}' produced {} rather than product data",
                payload_name(other)
            ))),
        }
    }

    pub fn search_hits(&self, task_id: &str) -> Result<&[SearchHit], NodeError> {
        match self.payload(task_id)? {
            TaskPayload::SearchHits { hits, .. } => Ok(hits),
            other => Err(NodeError::MissingInput(format!(
                "'{task_id}' produced {} rather than search hits",
                payload_name(other)
            ))),
        }
    }
}

fn payload_name(payload: &TaskPayload) -> &'static str {
    match payload {
        TaskPayload::DetectedUrl { .. } => "a detected url",
        TaskPayload::SearchHits { .. } => "search hits",
        TaskPayload::Product(_) => "product data",
        TaskPayload::Summary(_) => "a summary",
        TaskPayload::Sentiment(_) => "a sentiment",
        TaskPayload::Comparison(_) => "a comparison",
        TaskPayload::Custom { .. } => "a custom payload",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn succeeded(id: &str, kind: TaskKind, payload: TaskPayload) -> TaskResult {
        let now = Utc::now();
        TaskResult {
            task_id: id.into(),
            kind,
            outcome: TaskOutcome::Succeeded { payload },
            started_at: Some(now),
            finished_at: now,
        }
    }

    #[test]
    fn test_prior_results_typed_lookups() {
        let prior = PriorResults::from_results(vec![
            succeeded(
                "scrape",
                TaskKind::Scrape,
                TaskPayload::Product(ProductData::new("https://example.com/p")),
            ),
            TaskResult::skipped("search", TaskKind::Search, Some("detect_url".into())),
        ]);

        assert_eq!(prior.product("scrape").unwrap().url, "https://example.com/p");
        assert!(matches!(
            prior.search_hits("scrape"),
            Err(NodeError::MissingInput(_))
        ));
        assert!(matches!(
            prior.payload("search"),
            Err(NodeError::MissingInput(_))
        ));
        assert!(prior.get("missing").is_none());
    }

    #[test]
    fn test_result_serializes_flat_status() {
        let result = TaskResult::skipped("compare", TaskKind::Compare, Some("scrape".into()));
        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(v["status"], "skipped");
        assert_eq!(v["blocked_by"], "scrape");
        assert_eq!(v["kind"], "compare");
        assert_eq!(result.status(), TaskStatus::Skipped);
        assert_eq!(result.elapsed_ms(), 0);
    }

    #[test]
    fn test_failure_from_node_error() {
        let failure = TaskFailure::from(&NodeError::Timeout(250));
        assert_eq!(failure.code, "timeout");
        assert!(failure.transient);
    }
}
