use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::backend::{ProductData, SearchHit};
use crate::error::NodeError;
use crate::executor::PriorResults;
use crate::llm::{LlmRequest, LlmRouter, TaskType};
use crate::plan::{TaskInput, TaskKind};

use super::parse::parse_json;
use super::{prompts, wrong_input, Alternative, ComparisonPayload, TaskNode, TaskPayload};

/// Search hits offered to the model as alternative candidates.
const MAX_CANDIDATES: usize = 5;

#[derive(Deserialize)]
struct AlternativeReply {
    name: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    price: Option<serde_json::Value>,
    #[serde(default)]
    attributes: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    verdict: Option<String>,
}

#[derive(Deserialize)]
struct ComparisonReply {
    #[serde(default)]
    alternatives: Vec<AlternativeReply>,
    #[serde(default)]
    recommendation: String,
}

fn scalar(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn parse_comparison(text: &str) -> Result<(Vec<Alternative>, String), NodeError> {
    let reply: ComparisonReply = parse_json(text)?;

    let alternatives: Vec<Alternative> = reply
        .alternatives
        .into_iter()
        .filter(|a| !a.name.trim().is_empty())
        .map(|a| Alternative {
            name: a.name.trim().to_string(),
            url: a.url.filter(|u| !u.trim().is_empty()),
            price: a.price.and_then(scalar),
            attributes: a
                .attributes
                .into_iter()
                .filter_map(|(k, v)| scalar(v).map(|v| (k, v)))
                .collect(),
            verdict: a.verdict,
        })
        .collect();

    if alternatives.is_empty() {
        return Err(NodeError::MalformedOutput("comparison lists no alternatives".into()));
    }
    Ok((alternatives, reply.recommendation.trim().to_string()))
}

/// Search hits that are not one of the compared products.
fn candidates(hits: &[SearchHit], products: &[&ProductData]) -> Vec<SearchHit> {
    let taken: HashSet<&str> = products.iter().map(|p| p.url.as_str()).collect();
    hits.iter()
        .filter(|h| !taken.contains(h.url.as_str()))
        .take(MAX_CANDIDATES)
        .cloned()
        .collect()
}

pub struct CompareNode {
    router: Arc<LlmRouter>,
}

impl CompareNode {
    pub fn new(router: Arc<LlmRouter>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl TaskNode for CompareNode {
    fn kind(&self) -> TaskKind {
        TaskKind::Compare
    }

    async fn execute(
        &self,
        input: &TaskInput,
        prior: &PriorResults,
    ) -> Result<TaskPayload, NodeError> {
        let TaskInput::Compare {
            sources,
            alternatives_from,
        } = input
        else {
            return Err(wrong_input(TaskKind::Compare, input));
        };

        let products: Vec<&ProductData> = sources
            .iter()
            .filter_map(|s| prior.product(s).ok())
            .collect();
        if products.is_empty() {
            return Err(NodeError::MissingInput(format!(
                "none of {} produced product data",
                sources.join(", ")
            )));
        }

        let candidates = match alternatives_from {
            Some(source) => candidates(prior.search_hits(source)?, &products),
            None => Vec::new(),
        };

        let request = LlmRequest::new(prompts::compare(&products, &candidates))
            .with_system(prompts::COMPARE_SYSTEM)
            .with_temperature(0.6)
            .json();
        let response = self.router.invoke(TaskType::Compare, &request).await?;

        let (alternatives, recommendation) = parse_comparison(&response.text)?;
        tracing::debug!(
            provider = %response.provider,
            products = products.len(),
            candidates = candidates.len(),
            alternatives = alternatives.len(),
            "comparison generated"
        );

        Ok(TaskPayload::Comparison(ComparisonPayload {
            products: products.iter().map(|p| p.display_name().to_string()).collect(),
            alternatives,
            recommendation,
        }))
    }
}
