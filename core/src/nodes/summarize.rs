use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::NodeError;
use crate::executor::PriorResults;
use crate::llm::{LlmRequest, LlmRouter, TaskType};
use crate::plan::{TaskInput, TaskKind};

use super::parse::{extract_json, parse_json};
use super::{prompts, wrong_input, SummaryPayload, TaskNode, TaskPayload};

#[derive(Deserialize)]
struct SummaryReply {
    summary: String,
    #[serde(default)]
    highlights: Vec<String>,
}

pub struct SummarizeNode {
    router: Arc<LlmRouter>,
}

impl SummarizeNode {
    pub fn new(router: Arc<LlmRouter>) -> Self {
        Self { router }
    }
}

/// Accepts the JSON shape, or plain prose when the model ignored the format.
/// Prose may contain braces; only a reply that opens as JSON must parse as one.
fn parse_summary(text: &str) -> Result<(String, Vec<String>), NodeError> {
    let parsed = extract_json(text).map(|_| parse_json::<SummaryReply>(text));
    let (summary, highlights) = match parsed {
        Some(Ok(reply)) => (reply.summary, reply.highlights),
        Some(Err(err)) if looks_like_json(text) => return Err(err),
        _ => (text.to_string(), Vec::new()),
    };

    let summary = summary.trim().to_string();
    if summary.is_empty() {
        return Err(NodeError::MalformedOutput("empty summary".into()));
    }
    Ok((summary, highlights))
}

fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with("```")
}

#[async_trait]
impl TaskNode for SummarizeNode {
    fn kind(&self) -> TaskKind {
        TaskKind::Summarize
    }

    async fn execute(
        &self,
        input: &TaskInput,
        prior: &PriorResults,
    ) -> Result<TaskPayload, NodeError> {
        let TaskInput::Summarize { source } = input else {
            return Err(wrong_input(TaskKind::Summarize, input));
        };
        let product = prior.product(source)?;

        let request = LlmRequest::new(prompts::summarize(product))
            .with_system(prompts::SUMMARIZE_SYSTEM)
            .with_temperature(0.7)
            .json();
        let response = self.router.invoke(TaskType::Summarize, &request).await?;
        tracing::debug!(
            provider = %response.provider,
            model = %response.model,
            chars = response.text.len(),
            "summary generated"
        );

        let (text, highlights) = parse_summary(&response.text)?;
        Ok(TaskPayload::Summary(SummaryPayload {
            product_url: product.url.clone(),
            product_title: product.title.clone(),
            text,
            highlights,
        }))
    }
}
