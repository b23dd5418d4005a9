//! Run entry points: plan, execute, finalize.

use std::sync::Arc;

use futures::stream::{self, Stream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::PlannerStrategy;
use crate::error::{CancellationError, RunError};
use crate::executor::{
    CancelOnDrop, CancelToken, EventSink, RunPhase, StreamEvent, TaskExecutor,
};
use crate::finalize::{finalize, Report};
use crate::plan::Plan;
use crate::planner::Planner;

/// One item of a streaming run: events as they happen, then exactly one
/// terminal `Completed` or `Aborted`.
#[derive(Debug)]
pub enum WorkflowUpdate {
    Event(StreamEvent),
    Completed(Report),
    Aborted(RunError),
}

pub struct Workflow {
    planner: Planner,
    executor: TaskExecutor,
}

impl Workflow {
    pub fn new(planner: Planner, executor: TaskExecutor) -> Self {
        Self { planner, executor }
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn executor(&self) -> &TaskExecutor {
        &self.executor
    }

    pub async fn plan(
        &self,
        query: &str,
        strategy: Option<PlannerStrategy>,
    ) -> Result<Plan, RunError> {
        Ok(self.planner.plan_with(query, strategy).await?)
    }

    /// Run to completion with the configured strategy and no event consumer.
    pub async fn run(&self, query: &str) -> Result<Report, RunError> {
        self.run_with(query, None, &EventSink::noop(), &CancelToken::new())
            .await
    }

    /// Full run. Only planning errors and cancellation are `Err`; node
    /// failures end up in the report.
    pub async fn run_with(
        &self,
        query: &str,
        strategy: Option<PlannerStrategy>,
        events: &EventSink,
        cancel: &CancelToken,
    ) -> Result<Report, RunError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(target: "scout.workflow", run_id = %run_id, query = %query, "run started");

        let planned = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!(target: "scout.workflow", run_id = %run_id, "cancelled while planning");
                return Err(RunError::Cancelled(CancellationError {
                    run_id,
                    abandoned: Vec::new(),
                }));
            }
            planned = self.planner.plan_with(query, strategy) => planned,
        };

        let plan = match planned {
            Ok(plan) => Arc::new(plan),
            Err(err) => {
                tracing::warn!(
                    target: "scout.workflow",
                    run_id = %run_id,
                    code = err.code(),
                    error = %err,
                    "planning failed"
                );
                return Err(err.into());
            }
        };
        events.emit(StreamEvent::planner(&run_id, &plan));

        let mut state = self
            .executor
            .execute(&run_id, plan.clone(), events, cancel)
            .await?;

        let report = finalize(&run_id, &plan, &state.results());
        events.emit(StreamEvent::finalize(&run_id, report.summary));
        state.advance(RunPhase::Completed)?;

        tracing::info!(
            target: "scout.workflow",
            run_id = %run_id,
            succeeded = report.summary.succeeded,
            failed = report.summary.failed,
            skipped = report.summary.skipped,
            "run completed"
        );
        Ok(report)
    }

    /// Lazy, finite stream of a single run. Nothing starts until the first
    /// poll; dropping the stream mid-run cancels it.
    pub fn run_stream(
        self: Arc<Self>,
        query: String,
        strategy: Option<PlannerStrategy>,
        cancel: CancelToken,
    ) -> impl Stream<Item = WorkflowUpdate> + Send + 'static {
        stream::unfold(
            StreamState::Init {
                workflow: self,
                query,
                strategy,
                cancel,
            },
            next_update,
        )
    }
}

enum StreamState {
    Init {
        workflow: Arc<Workflow>,
        query: String,
        strategy: Option<PlannerStrategy>,
        cancel: CancelToken,
    },
    Running {
        rx: mpsc::UnboundedReceiver<StreamEvent>,
        handle: JoinHandle<Result<Report, RunError>>,
        _guard: CancelOnDrop,
    },
    Done,
}

async fn next_update(state: StreamState) -> Option<(WorkflowUpdate, StreamState)> {
    let (mut rx, handle, guard) = match state {
        StreamState::Init {
            workflow,
            query,
            strategy,
            cancel,
        } => {
            let (sink, rx) = EventSink::channel();
            let guard = CancelOnDrop(cancel.clone());
            let handle = tokio::spawn(async move {
                workflow.run_with(&query, strategy, &sink, &cancel).await
            });
            (rx, handle, guard)
        }
        StreamState::Running {
            rx,
            handle,
            _guard,
        } => (rx, handle, _guard),
        StreamState::Done => return None,
    };

    // The sink lives inside the spawned run, so the channel closes exactly
    // when the run is over.
    if let Some(event) = rx.recv().await {
        return Some((
            WorkflowUpdate::Event(event),
            StreamState::Running {
                rx,
                handle,
                _guard: guard,
            },
        ));
    }

    let update = match handle.await {
        Ok(Ok(report)) => WorkflowUpdate::Completed(report),
        Ok(Err(err)) => WorkflowUpdate::Aborted(err),
        Err(err) => WorkflowUpdate::Aborted(RunError::Internal(format!("run task failed: {err}"))),
    };
    Some((update, StreamState::Done))
}
