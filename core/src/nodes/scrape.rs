use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::ScrapeBackend;
use crate::error::{BackendError, NodeError};
use crate::executor::PriorResults;
use crate::plan::{TaskInput, TaskKind};

use super::{wrong_input, TaskNode, TaskPayload};

const BLOCK_MARKERS: &[&str] = &[
    "captcha",
    "access denied",
    "robot check",
    "are you a robot",
    "verify you are human",
];

/// Bot-wall pages come back as 200s with tell-tale titles.
pub fn is_blocked_title(title: &str) -> bool {
    let title = title.to_ascii_lowercase();
    BLOCK_MARKERS.iter().any(|m| title.contains(m))
}

pub struct ScrapeNode {
    backend: Arc<dyn ScrapeBackend>,
}

impl ScrapeNode {
    pub fn new(backend: Arc<dyn ScrapeBackend>) -> Self {
        Self { backend }
    }

    fn resolve_url(
        url: Option<&str>,
        source: Option<&str>,
        url_index: usize,
        prior: &PriorResults,
    ) -> Result<String, NodeError> {
        if let Some(url) = url {
            return Ok(url.to_string());
        }
        let Some(source) = source else {
            return Err(NodeError::MissingInput("scrape has no url or source".into()));
        };

        match prior.payload(source)? {
            TaskPayload::DetectedUrl { url: Some(url) } => Ok(url.clone()),
            TaskPayload::DetectedUrl { url: None } => Err(NodeError::MissingInput(format!(
                "'{source}' detected no url"
            ))),
            TaskPayload::SearchHits { hits, .. } => hits
                .get(url_index)
                .map(|h| h.url.clone())
                .ok_or_else(|| {
                    NodeError::MissingInput(format!(
                        "'{source}' has {} hit(s), no index {url_index}",
                        hits.len()
                    ))
                }),
            _ => Err(NodeError::MissingInput(format!(
                "'{source}' does not provide a url"
            ))),
        }
    }
}

#[async_trait]
impl TaskNode for ScrapeNode {
    fn kind(&self) -> TaskKind {
        TaskKind::Scrape
    }

    async fn execute(
        &self,
        input: &TaskInput,
        prior: &PriorResults,
    ) -> Result<TaskPayload, NodeError> {
        let TaskInput::Scrape {
            url,
            source,
            url_index,
        } = input
        else {
            return Err(wrong_input(TaskKind::Scrape, input));
        };

        let url = Self::resolve_url(url.as_deref(), source.as_deref(), *url_index, prior)?;
        tracing::debug!(backend = self.backend.name(), url = %url, "scraping");

        let product = self.backend.fetch(&url).await?;

        if product.title.as_deref().is_some_and(is_blocked_title) {
            return Err(BackendError::Blocked(url).into());
        }
        if product.is_empty() {
            return Err(NodeError::NoResults(format!("no product fields found at {url}")));
        }
        Ok(TaskPayload::Product(product))
    }
}
