use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    DetectUrl,
    Search,
    Scrape,
    Summarize,
    Sentiment,
    Compare,
    Custom,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DetectUrl => "detect_url",
            Self::Search => "search",
            Self::Scrape => "scrape",
            Self::Summarize => "summarize",
            Self::Sentiment => "sentiment",
            Self::Compare => "compare",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific input. References to other tasks are task ids whose results
/// the node reads from the prior-results snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "input", rename_all = "snake_case")]
pub enum TaskInput {
    DetectUrl {
        query: String,
    },
    Search {
        query: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },
    Scrape {
        /// Explicit page to fetch.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        /// A `detect_url` or `search` task to take the URL from.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        /// Which search hit to use when `source` is a search task.
        #[serde(default)]
        url_index: usize,
    },
    Summarize {
        source: String,
    },
    Sentiment {
        source: String,
    },
    Compare {
        sources: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alternatives_from: Option<String>,
    },
    Custom {
        name: String,
        #[serde(default)]
        params: serde_json::Value,
    },
}

impl TaskInput {
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::DetectUrl { .. } => TaskKind::DetectUrl,
            Self::Search { .. } => TaskKind::Search,
            Self::Scrape { .. } => TaskKind::Scrape,
            Self::Summarize { .. } => TaskKind::Summarize,
            Self::Sentiment { .. } => TaskKind::Sentiment,
            Self::Compare { .. } => TaskKind::Compare,
            Self::Custom { .. } => TaskKind::Custom,
        }
    }

    /// Task ids this input reads results from.
    pub fn references(&self) -> Vec<&str> {
        match self {
            Self::Scrape {
                source: Some(s), ..
            } => vec![s.as_str()],
            Self::Summarize { source } | Self::Sentiment { source } => vec![source.as_str()],
            Self::Compare {
                sources,
                alternatives_from,
            } => sources
                .iter()
                .map(String::as_str)
                .chain(alternatives_from.as_deref())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Shape checks that do not need the rest of the plan.
    pub(crate) fn check(&self) -> Result<(), String> {
        match self {
            Self::DetectUrl { query } | Self::Search { query, .. } if query.trim().is_empty() => {
                Err("query must not be empty".to_string())
            }
            Self::Search { limit: Some(0), .. } => Err("limit must be positive".to_string()),
            Self::Scrape {
                url: None,
                source: None,
                ..
            } => Err("scrape needs either `url` or `source`".to_string()),
            Self::Compare { sources, .. } if sources.is_empty() => {
                Err("compare needs at least one source".to_string())
            }
            Self::Custom { name, .. } if name.trim().is_empty() => {
                Err("custom task needs a name".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Lifecycle of a task inside one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    id: String,
    depends_on: Vec<String>,
    #[serde(flatten)]
    input: TaskInput,
}

impl Task {
    pub fn new(id: impl Into<String>, depends_on: Vec<String>, input: TaskInput) -> Self {
        Self {
            id: id.into(),
            depends_on,
            input,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.input.kind()
    }

    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    pub fn input(&self) -> &TaskInput {
        &self.input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_from_kind_and_payload() {
        let input: TaskInput = serde_json::from_value(serde_json::json!({
            "kind": "scrape",
            "input": { "source": "search", "url_index": 2 }
        }))
        .unwrap();

        assert_eq!(
            input,
            TaskInput::Scrape {
                url: None,
                source: Some("search".into()),
                url_index: 2
            }
        );
        assert_eq!(input.references(), vec!["search"]);
    }

    #[test]
    fn test_task_serializes_kind_at_top_level() {
        let task = Task::new(
            "summarize",
            vec!["scrape".into()],
            TaskInput::Summarize {
                source: "scrape".into(),
            },
        );
        let v = serde_json::to_value(&task).unwrap();
        assert_eq!(v["id"], "summarize");
        assert_eq!(v["kind"], "summarize");
        assert_eq!(v["input"]["source"], "scrape");
        assert_eq!(v["depends_on"][0], "scrape");
    }

    #[test]
    fn test_compare_references_include_alternatives() {
        let input = TaskInput::Compare {
            sources: vec!["scrape_1".into(), "scrape_2".into()],
            alternatives_from: Some("search".into()),
        };
        assert_eq!(input.references(), vec!["scrape_1", "scrape_2", "search"]);
    }

    #[test]
    fn test_check_rejects_unusable_inputs() {
        assert!(TaskInput::Scrape {
            url: None,
            source: None,
            url_index: 0
        }
        .check()
        .is_err());
        assert!(TaskInput::Compare {
            sources: vec![],
            alternatives_from: None
        }
        .check()
        .is_err());
        assert!(TaskInput::Search {
            query: "airpods".into(),
            limit: Some(5)
        }
        .check()
        .is_ok());
    }
}
