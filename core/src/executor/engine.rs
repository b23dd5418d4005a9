use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio::task::{AbortHandle, JoinError};
use tracing::Instrument;

use crate::error::{CancellationError, NodeError, RunError};
use crate::nodes::NodeSet;
use crate::plan::{Plan, Task, TaskInput, TaskKind};

use super::cancel::CancelToken;
use super::events::{EventSink, StreamEvent};
use super::state::ExecutionState;
use super::transitions::RunPhase;
use super::types::{ExecutorOptions, PriorResults, TaskFailure, TaskOutcome, TaskResult};

type Joined = (String, TaskKind, Result<TaskResult, JoinError>);

/// In-flight bookkeeping for one run.
struct InFlight {
    futures: FuturesUnordered<BoxFuture<'static, Joined>>,
    handles: HashMap<String, (AbortHandle, DateTime<Utc>)>,
}

impl InFlight {
    fn new() -> Self {
        Self {
            futures: FuturesUnordered::new(),
            handles: HashMap::new(),
        }
    }

    fn len(&self) -> usize {
        self.futures.len()
    }

    fn is_empty(&self) -> bool {
        self.futures.is_empty()
    }
}

/// Dependency-respecting task executor.
///
/// One scheduling loop owns the [`ExecutionState`]. It dispatches the frontier
/// (pending tasks whose dependencies all succeeded) onto spawned tasks, at most
/// `max_parallel` at a time, and reacts to each completion by recording the
/// result, propagating skips and recomputing the frontier. Node failures are
/// data: the loop always reaches `finalizing` unless the run is cancelled.
pub struct TaskExecutor {
    nodes: Arc<NodeSet>,
    opts: ExecutorOptions,
}

impl TaskExecutor {
    pub fn new(nodes: Arc<NodeSet>, opts: ExecutorOptions) -> Self {
        Self { nodes, opts }
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.opts
    }

    /// Execute `plan` to completion. Returns the settled state in phase
    /// `finalizing`, or a cancellation error.
    pub async fn execute(
        &self,
        run_id: &str,
        plan: Arc<Plan>,
        events: &EventSink,
        cancel: &CancelToken,
    ) -> Result<ExecutionState, RunError> {
        let started = Instant::now();
        let total = plan.len();
        let mut state = ExecutionState::new(plan.clone());
        let mut in_flight = InFlight::new();

        state.advance(RunPhase::Executing)?;
        tracing::info!(
            target: "scout.executor",
            run_id = %run_id,
            tasks = total,
            max_parallel = self.opts.max_parallel,
            "execution started"
        );

        loop {
            for skipped in state.propagate_skips()? {
                tracing::info!(
                    target: "scout.executor",
                    run_id = %run_id,
                    task_id = %skipped.task_id,
                    "task skipped"
                );
                events.emit(StreamEvent::task_finished(
                    run_id,
                    &skipped,
                    state.completed_count(),
                    total,
                ));
            }

            if cancel.is_cancelled() {
                return Err(self.cancel_run(run_id, state, in_flight, events).await);
            }

            let free = self.opts.max_parallel.saturating_sub(in_flight.len());
            for task_id in state.frontier().into_iter().take(free) {
                let Some(task) = plan.task(&task_id) else {
                    continue;
                };
                self.dispatch(run_id, task, &mut state, &mut in_flight, events)?;
            }

            if in_flight.is_empty() {
                if state.is_settled() {
                    break;
                }
                // A validated plan always has a runnable or blocked task, so
                // this only triggers on an internal bookkeeping error.
                tracing::error!(
                    target: "scout.executor",
                    run_id = %run_id,
                    pending = state.pending_count(),
                    "no runnable tasks left, skipping the remainder"
                );
                for skipped in state.skip_pending()? {
                    events.emit(StreamEvent::task_finished(
                        run_id,
                        &skipped,
                        state.completed_count(),
                        total,
                    ));
                }
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => continue,
                Some(joined) = in_flight.futures.next() => {
                    self.complete(run_id, joined, &mut state, &mut in_flight, events)?;
                }
            }
        }

        state.advance(RunPhase::Finalizing)?;
        tracing::info!(
            target: "scout.executor",
            run_id = %run_id,
            completed = state.completed_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "execution finished"
        );
        Ok(state)
    }

    fn dispatch(
        &self,
        run_id: &str,
        task: &Task,
        state: &mut ExecutionState,
        in_flight: &mut InFlight,
        events: &EventSink,
    ) -> Result<(), RunError> {
        state.mark_running(task.id())?;
        events.emit(StreamEvent::task_started(
            run_id,
            task.id(),
            task.kind(),
            state.running_count(),
            state.pending_count(),
        ));

        let task_id = task.id().to_string();
        let kind = task.kind();
        let span = tracing::info_span!(
            target: "scout.executor",
            "task",
            run_id = %run_id,
            task_id = %task_id,
            kind = %kind
        );
        let handle = tokio::spawn(
            run_node(
                self.nodes.clone(),
                task_id.clone(),
                kind,
                task.input().clone(),
                state.snapshot(),
                self.opts.node_timeout,
            )
            .instrument(span),
        );

        in_flight
            .handles
            .insert(task_id.clone(), (handle.abort_handle(), Utc::now()));
        in_flight
            .futures
            .push(async move { (task_id, kind, handle.await) }.boxed());
        Ok(())
    }

    fn complete(
        &self,
        run_id: &str,
        (task_id, kind, joined): Joined,
        state: &mut ExecutionState,
        in_flight: &mut InFlight,
        events: &EventSink,
    ) -> Result<(), RunError> {
        let started_at = in_flight.handles.remove(&task_id).map(|(_, at)| at);
        let result = joined.unwrap_or_else(|err| {
            tracing::error!(
                target: "scout.executor",
                run_id = %run_id,
                task_id = %task_id,
                error = %err,
                "node task aborted unexpectedly"
            );
            failed_result(
                &task_id,
                kind,
                started_at,
                TaskFailure {
                    code: "node_panicked".to_string(),
                    message: err.to_string(),
                    transient: false,
                },
            )
        });

        let result = state.record(result)?;
        events.emit(StreamEvent::task_finished(
            run_id,
            &result,
            state.completed_count(),
            state.plan().len(),
        ));
        Ok(())
    }

    /// Stop dispatching, give in-flight nodes the grace period, then abandon
    /// whatever is still running and skip everything still pending.
    async fn cancel_run(
        &self,
        run_id: &str,
        mut state: ExecutionState,
        mut in_flight: InFlight,
        events: &EventSink,
    ) -> RunError {
        tracing::warn!(
            target: "scout.executor",
            run_id = %run_id,
            in_flight = in_flight.len(),
            grace_ms = self.opts.cancel_grace.as_millis() as u64,
            "cancellation requested"
        );

        let grace = tokio::time::sleep(self.opts.cancel_grace);
        tokio::pin!(grace);
        while !in_flight.is_empty() {
            tokio::select! {
                _ = &mut grace => break,
                Some(joined) = in_flight.futures.next() => {
                    if let Err(err) = self.complete(run_id, joined, &mut state, &mut in_flight, events) {
                        return err;
                    }
                }
            }
        }

        let total = state.plan().len();
        let abandoned: Vec<String> = state
            .plan()
            .tasks()
            .iter()
            .map(|t| t.id().to_string())
            .filter(|id| in_flight.handles.contains_key(id))
            .collect();

        for task_id in &abandoned {
            let Some((handle, started_at)) = in_flight.handles.remove(task_id) else {
                continue;
            };
            handle.abort();
            let kind = state
                .plan()
                .task(task_id)
                .map(Task::kind)
                .unwrap_or(TaskKind::Custom);
            let result = failed_result(
                task_id,
                kind,
                Some(started_at),
                TaskFailure::from(&NodeError::Cancelled),
            );
            match state.record(result) {
                Ok(result) => events.emit(StreamEvent::task_finished(
                    run_id,
                    &result,
                    state.completed_count(),
                    total,
                )),
                Err(err) => return err.into(),
            }
        }

        // Dependents of abandoned tasks name their blocker; the rest never had one.
        let skipped = state.propagate_skips().and_then(|mut blocked| {
            blocked.extend(state.skip_pending()?);
            Ok(blocked)
        });
        match skipped {
            Ok(skipped) => {
                for result in skipped {
                    events.emit(StreamEvent::task_finished(
                        run_id,
                        &result,
                        state.completed_count(),
                        total,
                    ));
                }
            }
            Err(err) => return err.into(),
        }

        if let Err(err) = state.advance(RunPhase::Cancelled) {
            return err.into();
        }

        RunError::Cancelled(CancellationError {
            run_id: run_id.to_string(),
            abandoned,
        })
    }
}

async fn run_node(
    nodes: Arc<NodeSet>,
    task_id: String,
    kind: TaskKind,
    input: TaskInput,
    prior: PriorResults,
    timeout: Duration,
) -> TaskResult {
    let started_at = Utc::now();
    let clock = Instant::now();

    let outcome = match tokio::time::timeout(timeout, nodes.execute(&input, &prior)).await {
        Ok(Ok(payload)) => TaskOutcome::Succeeded { payload },
        Ok(Err(err)) => {
            tracing::warn!(code = err.code(), error = %err, "node failed");
            TaskOutcome::Failed {
                failure: TaskFailure::from(&err),
            }
        }
        Err(_) => {
            let err = NodeError::Timeout(timeout.as_millis() as u64);
            tracing::warn!(code = err.code(), error = %err, "node timed out");
            TaskOutcome::Failed {
                failure: TaskFailure::from(&err),
            }
        }
    };

    tracing::debug!(
        elapsed_ms = clock.elapsed().as_millis() as u64,
        succeeded = matches!(outcome, TaskOutcome::Succeeded { .. }),
        "node finished"
    );

    TaskResult {
        task_id,
        kind,
        outcome,
        started_at: Some(started_at),
        finished_at: Utc::now(),
    }
}

fn failed_result(
    task_id: &str,
    kind: TaskKind,
    started_at: Option<DateTime<Utc>>,
    failure: TaskFailure,
) -> TaskResult {
    TaskResult {
        task_id: task_id.to_string(),
        kind,
        outcome: TaskOutcome::Failed { failure },
        started_at,
        finished_at: Utc::now(),
    }
}
