use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::{SearchBackend, SearchHit};
use crate::error::NodeError;
use crate::executor::PriorResults;
use crate::plan::{TaskInput, TaskKind};

use super::{wrong_input, TaskNode, TaskPayload};

/// Path fragments that mark a retailer's product detail page.
const PRODUCT_PAGE_MARKERS: &[(&str, &str)] = &[
    ("amazon.", "/dp/"),
    ("bestbuy.com", "/site/"),
    ("walmart.com", "/ip/"),
    ("target.com", "/p/"),
    ("ebay.", "/itm/"),
];

pub fn is_product_page(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    PRODUCT_PAGE_MARKERS
        .iter()
        .any(|(host, path)| url.contains(host) && url.contains(path))
}

/// Clean up raw backend hits: drop non-finite scores and empty URLs, order by
/// descending score (product pages first on ties), de-duplicate, keep `limit`.
pub fn rank_hits(hits: Vec<SearchHit>, limit: usize) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = hits
        .into_iter()
        .filter(|h| h.score.is_finite() && !h.url.trim().is_empty())
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| is_product_page(&b.url).cmp(&is_product_page(&a.url)))
    });

    let mut seen = HashSet::new();
    hits.retain(|h| seen.insert(h.url.trim_end_matches('/').to_string()));
    hits.truncate(limit);
    hits
}

pub struct SearchNode {
    backend: Arc<dyn SearchBackend>,
    default_limit: usize,
}

impl SearchNode {
    pub fn new(backend: Arc<dyn SearchBackend>, default_limit: usize) -> Self {
        Self {
            backend,
            default_limit: default_limit.max(1),
        }
    }
}

#[async_trait]
impl TaskNode for SearchNode {
    fn kind(&self) -> TaskKind {
        TaskKind::Search
    }

    async fn execute(
        &self,
        input: &TaskInput,
        _prior: &PriorResults,
    ) -> Result<TaskPayload, NodeError> {
        let TaskInput::Search { query, limit } = input else {
            return Err(wrong_input(TaskKind::Search, input));
        };
        let limit = limit.unwrap_or(self.default_limit);

        let raw = self.backend.search(query, limit).await?;
        let raw_count = raw.len();
        let hits = rank_hits(raw, limit);
        tracing::debug!(
            backend = self.backend.name(),
            raw = raw_count,
            kept = hits.len(),
            "search finished"
        );

        if hits.is_empty() {
            return Err(NodeError::NoResults(format!("search for '{query}' found nothing")));
        }
        Ok(TaskPayload::SearchHits {
            query: query.clone(),
            hits,
        })
    }
}
