use scout_core::api::{EventSnapshot, OutputRenderer, Report, StreamEvent, TaskStatus};

/// Human-readable progress lines and a Markdown report.
pub struct TextRenderer {
    ascii_only: bool,
}

impl TextRenderer {
    pub fn new(ascii_only: bool) -> Self {
        Self { ascii_only }
    }

    fn status_label(&self, status: TaskStatus) -> &'static str {
        match (status, self.ascii_only) {
            (TaskStatus::Succeeded, true) => "OK",
            (TaskStatus::Succeeded, false) => "✔ SUCCEEDED",
            (TaskStatus::Failed, true) => "FAIL",
            (TaskStatus::Failed, false) => "✘ FAILED",
            (TaskStatus::Skipped, true) => "SKIP",
            (TaskStatus::Skipped, false) => "↷ SKIPPED",
            (TaskStatus::Pending | TaskStatus::Running, _) => "RUNNING",
        }
    }
}

impl OutputRenderer for TextRenderer {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn format(&self) -> &str {
        "text"
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn format_event(&self, event: &StreamEvent) -> Option<String> {
        let task_id = event.task_id.as_deref().unwrap_or("-");
        let line = match &event.snapshot {
            EventSnapshot::Planner {
                intent,
                source,
                tasks,
                stages,
            } => {
                let mut out = format!(
                    "PLAN {} ({:?}, intent {}, tasks: {})",
                    event.run_id,
                    source,
                    intent,
                    tasks.len()
                );
                for (idx, stage) in stages.iter().enumerate() {
                    out.push_str(&format!("\n  stage {}: {}", idx, stage.join(", ")));
                }
                out
            }
            EventSnapshot::TaskStarted {
                kind,
                running,
                pending,
            } => format!(
                "TASK START {} ({}, running {}, pending {})",
                task_id, kind, running, pending
            ),
            EventSnapshot::TaskFinished {
                kind,
                status,
                elapsed_ms,
                failure,
                blocked_by,
                completed,
                total,
                ..
            } => {
                let mut line = format!(
                    "TASK END {} ({}, {}, {}ms) [{}/{}]",
                    task_id,
                    kind,
                    self.status_label(*status),
                    elapsed_ms,
                    completed,
                    total
                );
                if let Some(failure) = failure {
                    line.push_str(&format!(": {} {}", failure.code, failure.message));
                }
                if let Some(dep) = blocked_by {
                    line.push_str(&format!(": blocked by {dep}"));
                }
                line
            }
            EventSnapshot::Finalize { summary } => format!(
                "RUN END {} (succeeded {}, failed {}, skipped {})",
                event.run_id, summary.succeeded, summary.failed, summary.skipped
            ),
        };
        Some(line)
    }

    fn format_report(&self, report: &Report) -> String {
        report.to_markdown()
    }
}
