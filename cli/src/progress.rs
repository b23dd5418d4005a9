use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use scout_core::api::{EventSnapshot, StreamEvent, TaskStatus};

/// Terminal progress for a research run, driven by stream events.
///
/// Bars are drawn on stderr so the report on stdout stays clean.
pub struct ProgressMonitor {
    multi: MultiProgress,
    overall: ProgressBar,
    task_bars: HashMap<String, ProgressBar>,
    enabled: bool,
}

impl ProgressMonitor {
    /// The task count is unknown until the planner event arrives.
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self {
                multi: MultiProgress::new(),
                overall: ProgressBar::hidden(),
                task_bars: HashMap::new(),
                enabled: false,
            };
        }

        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(0));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tasks ({percent}%) {msg}")
        {
            overall.set_style(style.progress_chars("█▓▒░  "));
        }
        overall.set_message("Planning...");

        Self {
            multi,
            overall,
            task_bars: HashMap::new(),
            enabled: true,
        }
    }

    pub fn handle(&mut self, event: &StreamEvent) {
        if !self.enabled {
            return;
        }

        let task_id = event.task_id.as_deref().unwrap_or_default();
        match &event.snapshot {
            EventSnapshot::Planner { intent, tasks, .. } => {
                self.overall.set_length(tasks.len() as u64);
                self.overall.set_message(intent.clone());
            }
            EventSnapshot::TaskStarted { kind, .. } => self.add_task(task_id, &kind.to_string()),
            EventSnapshot::TaskFinished {
                status, elapsed_ms, ..
            } => self.complete_task(task_id, *status, *elapsed_ms),
            EventSnapshot::Finalize { summary } => {
                self.finish(summary.failed == 0 && summary.skipped == 0)
            }
        }
    }

    fn add_task(&mut self, task_id: &str, kind: &str) {
        let bar = self.multi.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.green} {msg}") {
            bar.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        bar.set_message(format!("⏳ {task_id} ({kind})"));
        bar.enable_steady_tick(Duration::from_millis(100));

        self.task_bars.insert(task_id.to_string(), bar);
    }

    fn complete_task(&mut self, task_id: &str, status: TaskStatus, elapsed_ms: u64) {
        let icon = match status {
            TaskStatus::Succeeded => "✅",
            TaskStatus::Failed => "❌",
            _ => "⏭",
        };
        let message = format!("{icon} {task_id} ({elapsed_ms}ms)");
        match self.task_bars.remove(task_id) {
            Some(bar) => bar.finish_with_message(message),
            // Skipped tasks never started, so they get a line of their own.
            None => self.multi.add(ProgressBar::new_spinner()).finish_with_message(message),
        }

        self.overall.inc(1);
    }

    fn finish(&self, clean: bool) {
        let msg = if clean {
            "✅ All tasks succeeded"
        } else {
            "⚠ Finished with failures"
        };
        self.overall.finish_with_message(msg.to_string());
    }

    /// Remove every bar, e.g. before printing an error.
    pub fn clear(&mut self) {
        for (_, bar) in self.task_bars.drain() {
            bar.finish_and_clear();
        }
        self.overall.finish_and_clear();
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        for (_, bar) in self.task_bars.drain() {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::api::{RunSummary, TaskKind, TaskResult};

    #[test]
    fn test_disabled_monitor_ignores_events() {
        let mut monitor = ProgressMonitor::new(false);
        monitor.handle(&StreamEvent::task_started("run", "search", TaskKind::Search, 1, 0));
        monitor.handle(&StreamEvent::finalize("run", RunSummary::default()));
        assert!(monitor.task_bars.is_empty());
    }

    #[test]
    fn test_enabled_monitor_tracks_tasks() {
        let mut monitor = ProgressMonitor::new(true);
        monitor.handle(&StreamEvent::task_started("run", "search", TaskKind::Search, 1, 2));
        assert!(monitor.task_bars.contains_key("search"));

        let skipped = TaskResult::skipped("summarize", TaskKind::Summarize, Some("scrape".into()));
        monitor.handle(&StreamEvent::task_finished("run", &skipped, 1, 3));
        assert_eq!(monitor.overall.position(), 1);

        monitor.clear();
        assert!(monitor.task_bars.is_empty());
    }
}
