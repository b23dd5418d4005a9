//! Plan representation and validation.
//!
//! A [`Plan`] is only constructible through [`Plan::new`], which enforces the
//! graph invariants (non-empty, bounded size, unique ids, no dangling
//! dependencies, no cycles, and every input reference pointing at a transitive
//! dependency). Once built it is immutable and shared by reference for the
//! lifetime of a run.

mod graph;
mod task;

use serde::Serialize;

use crate::error::PlanningError;

pub use graph::{TaskGraph, TaskLike};
pub use task::{Task, TaskInput, TaskKind, TaskStatus};

pub const INTENT_PRODUCT_RESEARCH: &str = "product_research";
pub const INTENT_PRODUCT_ANALYSIS: &str = "product_analysis";
pub const INTENT_PRODUCT_COMPARISON: &str = "product_comparison";

/// Where a plan came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    Fixed,
    Dynamic,
    /// Dynamic planning was attempted and rejected; the fixed pipeline ran instead.
    FixedFallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    intent: String,
    original_query: String,
    source: PlanSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning: Option<String>,
    tasks: Vec<Task>,
    stages: Vec<Vec<String>>,
}

impl Plan {
    pub fn new(
        intent: impl Into<String>,
        original_query: impl Into<String>,
        source: PlanSource,
        tasks: Vec<Task>,
        max_tasks: usize,
    ) -> Result<Self, PlanningError> {
        let original_query = original_query.into();
        if original_query.trim().is_empty() {
            return Err(PlanningError::EmptyQuery);
        }
        if tasks.is_empty() {
            return Err(PlanningError::EmptyPlan);
        }
        if tasks.len() > max_tasks {
            return Err(PlanningError::TooManyTasks {
                count: tasks.len(),
                limit: max_tasks,
            });
        }

        let graph = TaskGraph::from_tasks(&tasks)?;
        graph.validate()?;

        for task in &tasks {
            task.input()
                .check()
                .map_err(|reason| PlanningError::InvalidTask {
                    task_id: task.id().to_string(),
                    reason,
                })?;

            let ancestors = graph.ancestors(task.id());
            for reference in task.input().references() {
                if !ancestors.contains(reference) {
                    return Err(PlanningError::UnreachableReference {
                        task_id: task.id().to_string(),
                        reference: reference.to_string(),
                    });
                }
            }
        }

        let stages = graph.topological_sort()?;

        Ok(Self {
            intent: intent.into(),
            original_query,
            source,
            reasoning: None,
            tasks,
            stages,
        })
    }

    pub fn with_reasoning(mut self, reasoning: Option<String>) -> Self {
        self.reasoning = reasoning.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn intent(&self) -> &str {
        &self.intent
    }

    pub fn original_query(&self) -> &str {
        &self.original_query
    }

    pub fn source(&self) -> PlanSource {
        self.source
    }

    pub fn reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref()
    }

    /// Tasks in declaration order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    /// Topological stages; tasks within a stage are independent of each other.
    pub fn stages(&self) -> &[Vec<String>] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search(id: &str) -> Task {
        Task::new(
            id,
            vec![],
            TaskInput::Search {
                query: "airpods".into(),
                limit: None,
            },
        )
    }

    fn scrape(id: &str, deps: &[&str], source: &str) -> Task {
        Task::new(
            id,
            deps.iter().map(|d| d.to_string()).collect(),
            TaskInput::Scrape {
                url: None,
                source: Some(source.into()),
                url_index: 0,
            },
        )
    }

    #[test]
    fn test_valid_plan_has_stages() {
        let plan = Plan::new(
            INTENT_PRODUCT_RESEARCH,
            "airpods",
            PlanSource::Dynamic,
            vec![search("s"), scrape("p", &["s"], "s")],
            16,
        )
        .unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.stages().len(), 2);
        assert_eq!(plan.task("p").unwrap().kind(), TaskKind::Scrape);
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert_eq!(
            Plan::new("x", "  ", PlanSource::Fixed, vec![search("s")], 16).unwrap_err(),
            PlanningError::EmptyQuery
        );
        assert_eq!(
            Plan::new("x", "q", PlanSource::Fixed, vec![], 16).unwrap_err(),
            PlanningError::EmptyPlan
        );
    }

    #[test]
    fn test_task_limit_enforced() {
        let tasks = (0..3).map(|i| search(&format!("s{i}"))).collect();
        assert_eq!(
            Plan::new("x", "q", PlanSource::Dynamic, tasks, 2).unwrap_err(),
            PlanningError::TooManyTasks { count: 3, limit: 2 }
        );
    }

    #[test]
    fn test_reference_must_be_a_dependency() {
        // `p` reads from `s` without depending on it.
        let err = Plan::new(
            "x",
            "q",
            PlanSource::Dynamic,
            vec![search("s"), scrape("p", &[], "s")],
            16,
        )
        .unwrap_err();
        assert_eq!(
            err,
            PlanningError::UnreachableReference {
                task_id: "p".into(),
                reference: "s".into()
            }
        );
    }

    #[test]
    fn test_transitive_reference_allowed() {
        let summarize = Task::new(
            "sum",
            vec!["p".into()],
            TaskInput::Compare {
                sources: vec!["p".into()],
                alternatives_from: Some("s".into()),
            },
        );
        assert!(Plan::new(
            "x",
            "q",
            PlanSource::Dynamic,
            vec![search("s"), scrape("p", &["s"], "s"), summarize],
            16,
        )
        .is_ok());
    }

    #[test]
    fn test_cycle_rejected() {
        let err = Plan::new(
            "x",
            "q",
            PlanSource::Dynamic,
            vec![scrape("a", &["b"], "b"), scrape("b", &["a"], "a")],
            16,
        )
        .unwrap_err();
        assert!(matches!(err, PlanningError::CircularDependency(_)));
    }
}
