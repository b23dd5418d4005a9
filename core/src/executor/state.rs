use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::error::RunError;
use crate::plan::{Plan, TaskStatus};

use super::transitions::{RunPhase, StateTransition, TransitionError};
use super::types::{PriorResults, TaskResult};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("result for task '{0}' already recorded")]
    DuplicateResult(String),
    #[error("unknown task '{0}'")]
    UnknownTask(String),
}

impl From<StateError> for RunError {
    fn from(err: StateError) -> Self {
        RunError::Internal(err.to_string())
    }
}

/// Live state of one workflow run. Owned and mutated by the scheduling loop
/// only; nodes see [`PriorResults`] snapshots.
#[derive(Debug)]
pub struct ExecutionState {
    plan: Arc<Plan>,
    phase: RunPhase,
    statuses: HashMap<String, TaskStatus>,
    results: HashMap<String, Arc<TaskResult>>,
    /// Task ids in the order their results were recorded.
    completion_order: Vec<String>,
}

impl ExecutionState {
    pub fn new(plan: Arc<Plan>) -> Self {
        let statuses = plan
            .tasks()
            .iter()
            .map(|t| (t.id().to_string(), TaskStatus::Pending))
            .collect();
        Self {
            plan,
            phase: RunPhase::Initialized,
            statuses,
            results: HashMap::new(),
            completion_order: Vec::new(),
        }
    }

    pub fn plan(&self) -> &Arc<Plan> {
        &self.plan
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn advance(&mut self, to: RunPhase) -> Result<(), StateError> {
        StateTransition::validate(self.phase, to)?;
        self.phase = to;
        Ok(())
    }

    pub fn status(&self, task_id: &str) -> Option<TaskStatus> {
        self.statuses.get(task_id).copied()
    }

    /// Pending tasks whose dependencies have all succeeded, in declaration order.
    pub fn frontier(&self) -> Vec<String> {
        self.plan
            .tasks()
            .iter()
            .filter(|t| self.status(t.id()) == Some(TaskStatus::Pending))
            .filter(|t| {
                t.depends_on()
                    .iter()
                    .all(|d| self.status(d) == Some(TaskStatus::Succeeded))
            })
            .map(|t| t.id().to_string())
            .collect()
    }

    pub fn mark_running(&mut self, task_id: &str) -> Result<(), StateError> {
        match self.statuses.get_mut(task_id) {
            Some(status) => {
                *status = TaskStatus::Running;
                Ok(())
            }
            None => Err(StateError::UnknownTask(task_id.to_string())),
        }
    }

    /// Record a terminal result. Each task's result is written exactly once.
    pub fn record(&mut self, result: TaskResult) -> Result<Arc<TaskResult>, StateError> {
        let task_id = result.task_id.clone();
        if self.results.contains_key(&task_id) {
            return Err(StateError::DuplicateResult(task_id));
        }
        let Some(status) = self.statuses.get_mut(&task_id) else {
            return Err(StateError::UnknownTask(task_id));
        };

        *status = result.status();
        let result = Arc::new(result);
        self.results.insert(task_id.clone(), result.clone());
        self.completion_order.push(task_id);
        Ok(result)
    }

    /// Mark every pending task that has a failed or skipped dependency as
    /// skipped, repeating until nothing changes. Returns the new results in
    /// the order they were recorded.
    pub fn propagate_skips(&mut self) -> Result<Vec<Arc<TaskResult>>, StateError> {
        let mut skipped = Vec::new();
        loop {
            let blocked: Vec<(String, _, String)> = self
                .plan
                .tasks()
                .iter()
                .filter(|t| self.status(t.id()) == Some(TaskStatus::Pending))
                .filter_map(|t| {
                    t.depends_on()
                        .iter()
                        .find(|d| {
                            matches!(
                                self.status(d),
                                Some(TaskStatus::Failed | TaskStatus::Skipped)
                            )
                        })
                        .map(|d| (t.id().to_string(), t.kind(), d.clone()))
                })
                .collect();

            if blocked.is_empty() {
                return Ok(skipped);
            }

            for (task_id, kind, dep) in blocked {
                skipped.push(self.record(TaskResult::skipped(&task_id, kind, Some(dep)))?);
            }
        }
    }

    /// Skip everything still pending, without a blocking dependency.
    pub fn skip_pending(&mut self) -> Result<Vec<Arc<TaskResult>>, StateError> {
        let pending: Vec<_> = self
            .plan
            .tasks()
            .iter()
            .filter(|t| self.status(t.id()) == Some(TaskStatus::Pending))
            .map(|t| (t.id().to_string(), t.kind()))
            .collect();

        pending
            .into_iter()
            .map(|(id, kind)| self.record(TaskResult::skipped(&id, kind, None)))
            .collect()
    }

    fn count(&self, status: TaskStatus) -> usize {
        self.statuses.values().filter(|s| **s == status).count()
    }

    pub fn pending_count(&self) -> usize {
        self.count(TaskStatus::Pending)
    }

    pub fn running_count(&self) -> usize {
        self.count(TaskStatus::Running)
    }

    pub fn completed_count(&self) -> usize {
        self.results.len()
    }

    /// No task is pending or running.
    pub fn is_settled(&self) -> bool {
        self.statuses.values().all(|s| s.is_terminal())
    }

    pub fn snapshot(&self) -> PriorResults {
        PriorResults::new(self.results.clone())
    }

    pub fn result(&self, task_id: &str) -> Option<&Arc<TaskResult>> {
        self.results.get(task_id)
    }

    /// Results in completion order.
    pub fn results(&self) -> Vec<Arc<TaskResult>> {
        self.completion_order
            .iter()
            .filter_map(|id| self.results.get(id).cloned())
            .collect()
    }
}
