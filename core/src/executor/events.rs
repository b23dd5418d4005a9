use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::mpsc;

use crate::finalize::RunSummary;
use crate::nodes::TaskPayload;
use crate::plan::{Plan, PlanSource, TaskKind, TaskStatus};

use super::types::{TaskFailure, TaskOutcome, TaskResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStep {
    Planner,
    TaskStarted,
    /// Emitted once per task. Skipped tasks never run, so they get this event
    /// without a preceding `TaskStarted`.
    TaskFinished,
    Finalize,
}

impl EventStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::TaskStarted => "task_started",
            Self::TaskFinished => "task_finished",
            Self::Finalize => "finalize",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedTask {
    pub id: String,
    pub kind: TaskKind,
    pub depends_on: Vec<String>,
}

/// The part of the execution state relevant to one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventSnapshot {
    Planner {
        intent: String,
        source: PlanSource,
        tasks: Vec<PlannedTask>,
        stages: Vec<Vec<String>>,
    },
    TaskStarted {
        kind: TaskKind,
        running: usize,
        pending: usize,
    },
    TaskFinished {
        kind: TaskKind,
        status: TaskStatus,
        elapsed_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<TaskPayload>,
        #[serde(skip_serializing_if = "Option::is_none")]
        failure: Option<TaskFailure>,
        #[serde(skip_serializing_if = "Option::is_none")]
        blocked_by: Option<String>,
        completed: usize,
        total: usize,
    },
    Finalize {
        summary: RunSummary,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamEvent {
    /// Emission order within the run, starting at 0.
    pub seq: u64,
    pub run_id: String,
    pub step: EventStep,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub snapshot: EventSnapshot,
}

impl StreamEvent {
    pub fn planner(run_id: &str, plan: &Plan) -> Self {
        let tasks = plan
            .tasks()
            .iter()
            .map(|t| PlannedTask {
                id: t.id().to_string(),
                kind: t.kind(),
                depends_on: t.depends_on().to_vec(),
            })
            .collect();
        Self::new(
            run_id,
            EventStep::Planner,
            None,
            EventSnapshot::Planner {
                intent: plan.intent().to_string(),
                source: plan.source(),
                tasks,
                stages: plan.stages().to_vec(),
            },
        )
    }

    pub fn task_started(
        run_id: &str,
        task_id: &str,
        kind: TaskKind,
        running: usize,
        pending: usize,
    ) -> Self {
        Self::new(
            run_id,
            EventStep::TaskStarted,
            Some(task_id.to_string()),
            EventSnapshot::TaskStarted {
                kind,
                running,
                pending,
            },
        )
    }

    pub fn task_finished(run_id: &str, result: &TaskResult, completed: usize, total: usize) -> Self {
        let (payload, failure, blocked_by) = match &result.outcome {
            TaskOutcome::Succeeded { payload } => (Some(payload.clone()), None, None),
            TaskOutcome::Failed { failure } => (None, Some(failure.clone()), None),
            TaskOutcome::Skipped { blocked_by } => (None, None, blocked_by.clone()),
        };
        Self::new(
            run_id,
            EventStep::TaskFinished,
            Some(result.task_id.clone()),
            EventSnapshot::TaskFinished {
                kind: result.kind,
                status: result.status(),
                elapsed_ms: result.elapsed_ms(),
                payload,
                failure,
                blocked_by,
                completed,
                total,
            },
        )
    }

    pub fn finalize(run_id: &str, summary: RunSummary) -> Self {
        Self::new(
            run_id,
            EventStep::Finalize,
            None,
            EventSnapshot::Finalize { summary },
        )
    }

    fn new(run_id: &str, step: EventStep, task_id: Option<String>, snapshot: EventSnapshot) -> Self {
        Self {
            seq: 0,
            run_id: run_id.to_string(),
            step,
            task_id,
            snapshot,
        }
    }
}

/// Non-blocking event outlet. Sending never waits; if the consumer has gone
/// away events are dropped and the run carries on.
#[derive(Debug, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<StreamEvent>>,
    seq: AtomicU64,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<StreamEvent>) -> Self {
        Self {
            tx: Some(tx),
            seq: AtomicU64::new(0),
        }
    }

    /// A sink that only logs.
    pub fn noop() -> Self {
        Self::default()
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, mut event: StreamEvent) {
        event.seq = self.seq.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            target: "scout.events",
            run_id = %event.run_id,
            seq = event.seq,
            step = event.step.as_str(),
            task_id = event.task_id.as_deref().unwrap_or("-"),
            "event emitted"
        );
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Task, TaskInput};

    #[test]
    fn test_sink_numbers_events_in_order() {
        let (sink, mut rx) = EventSink::channel();
        let plan = Plan::new(
            "product_research",
            "airpods",
            PlanSource::Fixed,
            vec![Task::new(
                "search",
                vec![],
                TaskInput::Search {
                    query: "airpods".into(),
                    limit: None,
                },
            )],
            16,
        )
        .unwrap();

        sink.emit(StreamEvent::planner("run-1", &plan));
        sink.emit(StreamEvent::task_started("run-1", "search", TaskKind::Search, 1, 0));

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!((first.seq, first.step), (0, EventStep::Planner));
        assert_eq!((second.seq, second.step), (1, EventStep::TaskStarted));

        let v = serde_json::to_value(&second).unwrap();
        assert_eq!(v["step"], "task_started");
        assert_eq!(v["task_id"], "search");
        assert_eq!(v["snapshot"]["kind"], "search");
    }

    #[test]
    fn test_dropped_receiver_does_not_panic() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.emit(StreamEvent::finalize("run-1", RunSummary::default()));
    }
}
