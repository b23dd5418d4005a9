use chrono::Local;
use serde_json::{json, Value};

use scout_core::api::{OutputRenderer, Report, StreamEvent};

/// One JSON object per line. With `pretty_print` only the final report is
/// written, as an indented document.
pub struct JsonlRenderer {
    pretty_print: bool,
}

impl JsonlRenderer {
    pub fn new(pretty_print: bool) -> Self {
        Self { pretty_print }
    }

    pub fn event_to_json(&self, event: &StreamEvent) -> Value {
        json!({
            "v": 1,
            "event_type": event.step.as_str(),
            "ts": Local::now().to_rfc3339(),
            "seq": event.seq,
            "run_id": event.run_id,
            "task_id": event.task_id,
            "snapshot": event.snapshot,
        })
    }

    pub fn report_to_json(&self, report: &Report) -> Value {
        json!({
            "v": 1,
            "event_type": "report",
            "ts": Local::now().to_rfc3339(),
            "run_id": report.run_id,
            "report": report,
        })
    }

    fn encode(&self, value: &Value) -> String {
        let encoded = if self.pretty_print {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        encoded.unwrap_or_else(|_| "{}".into())
    }
}

impl OutputRenderer for JsonlRenderer {
    fn name(&self) -> &str {
        "jsonl-renderer"
    }

    fn format(&self) -> &str {
        if self.pretty_print {
            "json"
        } else {
            "jsonl"
        }
    }

    fn supports_streaming(&self) -> bool {
        !self.pretty_print
    }

    fn format_event(&self, event: &StreamEvent) -> Option<String> {
        if self.pretty_print {
            return None;
        }
        Some(self.encode(&self.event_to_json(event)))
    }

    fn format_report(&self, report: &Report) -> String {
        if self.pretty_print {
            // Plain report document, no envelope.
            return serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".into());
        }
        self.encode(&self.report_to_json(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::api::{PlanSource, RunSummary, TaskKind};

    fn report() -> Report {
        Report {
            run_id: "run".to_string(),
            query: "airpods".to_string(),
            intent: "product_research".to_string(),
            plan_source: PlanSource::Fixed,
            sections: Vec::new(),
            summary: RunSummary {
                total: 6,
                succeeded: 6,
                failed: 0,
                skipped: 0,
            },
            task_results: Vec::new(),
        }
    }

    #[test]
    fn test_event_envelope() {
        let renderer = JsonlRenderer::new(false);
        let event = StreamEvent::task_started("run", "search", TaskKind::Search, 1, 5);

        let value = renderer.event_to_json(&event);
        assert_eq!(value["v"], 1);
        assert_eq!(value["event_type"], "task_started");
        assert_eq!(value["task_id"], "search");
        assert_eq!(value["snapshot"]["pending"], 5);

        let line = renderer.format_event(&event).unwrap();
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_report_line() {
        let renderer = JsonlRenderer::new(false);
        let value: Value = serde_json::from_str(&renderer.format_report(&report())).unwrap();
        assert_eq!(value["event_type"], "report");
        assert_eq!(value["report"]["summary"]["succeeded"], 6);
    }

    #[test]
    fn test_pretty_mode_only_prints_report() {
        let renderer = JsonlRenderer::new(true);
        assert_eq!(renderer.format(), "json");
        assert!(!renderer.supports_streaming());
        let event = StreamEvent::finalize("run", RunSummary::default());
        assert!(renderer.format_event(&event).is_none());

        let value: Value = serde_json::from_str(&renderer.format_report(&report())).unwrap();
        assert_eq!(value["query"], "airpods");
    }
}
