//! Task nodes: one stateless executor per task kind.
//!
//! Each node reads its typed input plus an immutable snapshot of earlier
//! results, talks to exactly one collaborator (search backend, scrape backend
//! or the LLM router) and returns a typed payload.

mod compare;
mod detect_url;
mod parse;
mod payload;
mod prompts;
mod scrape;
mod search;
mod sentiment;
mod summarize;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::BackendSet;
use crate::error::NodeError;
use crate::executor::PriorResults;
use crate::llm::LlmRouter;
use crate::plan::{TaskInput, TaskKind};

pub use compare::CompareNode;
pub use detect_url::{find_url, DetectUrlNode};
pub use parse::{extract_json, parse_json};
pub use payload::*;
pub use scrape::{is_blocked_title, ScrapeNode};
pub use search::{is_product_page, rank_hits, SearchNode};
pub use sentiment::SentimentNode;
pub use summarize::SummarizeNode;

#[async_trait]
pub trait TaskNode: Send + Sync {
    fn kind(&self) -> TaskKind;

    async fn execute(
        &self,
        input: &TaskInput,
        prior: &PriorResults,
    ) -> Result<TaskPayload, NodeError>;
}

/// Dispatch table from task kind to node. Custom tasks are looked up by name.
#[derive(Clone, Default)]
pub struct NodeSet {
    nodes: HashMap<TaskKind, Arc<dyn TaskNode>>,
    custom: HashMap<String, Arc<dyn TaskNode>>,
}

impl NodeSet {
    /// The built-in nodes wired to the given collaborators.
    pub fn new(backends: BackendSet, router: Arc<LlmRouter>, search_limit: usize) -> Self {
        Self::default()
            .with_node(Arc::new(DetectUrlNode))
            .with_node(Arc::new(SearchNode::new(backends.search, search_limit)))
            .with_node(Arc::new(ScrapeNode::new(backends.scrape)))
            .with_node(Arc::new(SummarizeNode::new(router.clone())))
            .with_node(Arc::new(SentimentNode::new(router.clone())))
            .with_node(Arc::new(CompareNode::new(router)))
    }

    /// Register (or replace) the node for its kind.
    pub fn with_node(mut self, node: Arc<dyn TaskNode>) -> Self {
        self.nodes.insert(node.kind(), node);
        self
    }

    pub fn with_custom(mut self, name: impl Into<String>, node: Arc<dyn TaskNode>) -> Self {
        self.custom.insert(name.into(), node);
        self
    }

    pub fn supports(&self, input: &TaskInput) -> bool {
        self.resolve(input).is_some()
    }

    pub async fn execute(
        &self,
        input: &TaskInput,
        prior: &PriorResults,
    ) -> Result<TaskPayload, NodeError> {
        match self.resolve(input) {
            Some(node) => node.execute(input, prior).await,
            None => Err(NodeError::Unsupported(match input {
                TaskInput::Custom { name, .. } => format!("custom task '{name}'"),
                other => other.kind().to_string(),
            })),
        }
    }

    fn resolve(&self, input: &TaskInput) -> Option<&Arc<dyn TaskNode>> {
        match input {
            TaskInput::Custom { name, .. } => self.custom.get(name),
            other => self.nodes.get(&other.kind()),
        }
    }
}

/// Error for a node handed another kind's input.
pub(crate) fn wrong_input(expected: TaskKind, input: &TaskInput) -> NodeError {
    NodeError::Unsupported(format!(
        "{expected} node cannot run {} input",
        input.kind()
    ))
}
