use std::fmt::Write as _;

use serde::Serialize;

use crate::executor::TaskResult;
use crate::plan::PlanSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportTopic {
    Summary,
    Sentiment,
    Comparison,
    Recommendation,
    Sources,
}

impl ReportTopic {
    /// Section order in every report.
    pub const ORDER: [ReportTopic; 5] = [
        Self::Summary,
        Self::Sentiment,
        Self::Comparison,
        Self::Recommendation,
        Self::Sources,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Summary => "Summary",
            Self::Sentiment => "Sentiment",
            Self::Comparison => "Comparison",
            Self::Recommendation => "Recommendation",
            Self::Sources => "Sources",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionEntry {
    /// Task the entry was built from.
    pub task_id: String,
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSection {
    pub topic: ReportTopic,
    /// At least one entry came from a succeeded task.
    pub available: bool,
    pub entries: Vec<SectionEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ReportSection {
    pub(crate) fn new(topic: ReportTopic) -> Self {
        Self {
            topic,
            available: false,
            entries: Vec::new(),
            note: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Final artifact of a run. Built once by [`finalize`](super::finalize).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub run_id: String,
    pub query: String,
    pub intent: String,
    pub plan_source: PlanSource,
    pub sections: Vec<ReportSection>,
    pub summary: RunSummary,
    /// Raw results in plan declaration order.
    pub task_results: Vec<TaskResult>,
}

impl Report {
    pub fn section(&self, topic: ReportTopic) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.topic == topic)
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Research report: {}", self.query);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Intent: {}. Tasks: {} succeeded, {} failed, {} skipped of {}.",
            self.intent,
            self.summary.succeeded,
            self.summary.failed,
            self.summary.skipped,
            self.summary.total
        );

        for section in &self.sections {
            let _ = writeln!(out);
            let _ = writeln!(out, "## {}", section.topic.title());
            if let Some(note) = &section.note {
                let _ = writeln!(out);
                let _ = writeln!(out, "> {note}");
            }

            if section.topic == ReportTopic::Sources {
                if !section.entries.is_empty() {
                    let _ = writeln!(out);
                }
                for entry in &section.entries {
                    let _ = writeln!(out, "- [{}]({})", entry.heading, entry.body);
                }
                continue;
            }

            for entry in &section.entries {
                let _ = writeln!(out);
                let _ = writeln!(out, "### {}", entry.heading);
                let _ = writeln!(out);
                let _ = writeln!(out, "{}", entry.body);
            }
        }
        out
    }
}
