//! LLM-generated plans.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::PlanningError;
use crate::nodes::extract_json;
use crate::plan::{Plan, PlanSource, Task, TaskInput};

use super::fixed::classify_intent;

#[derive(Deserialize)]
struct RawPlan {
    #[serde(default)]
    intent: String,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    tasks: Vec<RawTask>,
}

#[derive(Deserialize)]
struct RawTask {
    id: String,
    kind: String,
    #[serde(default)]
    depends_on: Vec<String>,
    #[serde(default)]
    input: Value,
}

impl RawTask {
    fn into_task(self) -> Result<Task, PlanningError> {
        let input = match self.input {
            Value::Null => json!({}),
            other => other,
        };
        let input: TaskInput = serde_json::from_value(json!({ "kind": self.kind, "input": input }))
            .map_err(|e| PlanningError::InvalidTask {
                task_id: self.id.clone(),
                reason: e.to_string(),
            })?;
        Ok(Task::new(self.id, self.depends_on, input))
    }
}

/// Parse and validate a model-produced plan.
pub fn parse_plan(query: &str, text: &str, max_tasks: usize) -> Result<Plan, PlanningError> {
    let json = extract_json(text)
        .ok_or_else(|| PlanningError::MalformedOutput("no JSON object in planner reply".into()))?;
    let raw: RawPlan =
        serde_json::from_str(json).map_err(|e| PlanningError::MalformedOutput(e.to_string()))?;

    let tasks = raw
        .tasks
        .into_iter()
        .map(RawTask::into_task)
        .collect::<Result<Vec<_>, _>>()?;

    let intent = match raw.intent.trim() {
        "" => classify_intent(query).to_string(),
        intent => intent.to_string(),
    };

    Ok(Plan::new(intent, query, PlanSource::Dynamic, tasks, max_tasks)?.with_reasoning(raw.reasoning))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::TaskKind;

    #[test]
    fn test_parse_parallel_plan() {
        let text = r#"```json
        {"intent": "product_comparison", "reasoning": "two products",
         "tasks": [
          {"id": "s1", "kind": "search", "input": {"query": "AirPods 4"}},
          {"id": "s2", "kind": "search", "input": {"query": "Galaxy Buds3"}},
          {"id": "p1", "kind": "scrape", "depends_on": ["s1"], "input": {"source": "s1"}},
          {"id": "p2", "kind": "scrape", "depends_on": ["s2"], "input": {"source": "s2"}},
          {"id": "c", "kind": "compare", "depends_on": ["p1", "p2"], "input": {"sources": ["p1", "p2"]}}
         ]}
        ```"#;
        let plan = parse_plan("AirPods 4 vs Galaxy Buds3", text, 16).unwrap();
        assert_eq!(plan.len(), 5);
        assert_eq!(plan.source(), PlanSource::Dynamic);
        assert_eq!(plan.reasoning(), Some("two products"));
        assert_eq!(plan.stages()[0], vec!["s1".to_string(), "s2".to_string()]);
        assert_eq!(plan.task("c").unwrap().kind(), TaskKind::Compare);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let text = r#"{"tasks": [
            {"id": "a", "kind": "search", "depends_on": ["b"], "input": {"query": "x"}},
            {"id": "b", "kind": "search", "depends_on": ["a"], "input": {"query": "y"}}
        ]}"#;
        assert!(matches!(
            parse_plan("x", text, 16),
            Err(PlanningError::CircularDependency(_))
        ));
    }

    #[test]
    fn test_unknown_kind_and_missing_input() {
        let unknown = r#"{"tasks": [{"id": "a", "kind": "final_report"}]}"#;
        assert!(matches!(
            parse_plan("x", unknown, 16),
            Err(PlanningError::InvalidTask { .. })
        ));

        let missing = r#"{"tasks": [{"id": "a", "kind": "summarize"}]}"#;
        assert!(matches!(
            parse_plan("x", missing, 16),
            Err(PlanningError::InvalidTask { .. })
        ));

        assert!(matches!(
            parse_plan("x", "I cannot help with that", 16),
            Err(PlanningError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_missing_intent_is_classified() {
        let text = r#"{"tasks": [{"id": "d", "kind": "detect_url", "input": {"query": "https://x.example/p"}}]}"#;
        let plan = parse_plan("https://x.example/p", text, 16).unwrap();
        assert_eq!(plan.intent(), "product_analysis");
    }
}
