//! Search and scrape collaborators used by the task nodes.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl SearchHit {
    pub fn new(url: impl Into<String>, score: f64) -> Self {
        Self {
            url: url.into(),
            title: None,
            score,
            snippet: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Structured product fields extracted from one page. Every field but the URL
/// is optional; pages rarely expose all of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductData {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl ProductData {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Title if present, else the URL.
    pub fn display_name(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.url)
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.price.is_none()
            && self.rating.is_none()
            && self.features.is_empty()
            && self.description.is_none()
    }
}

/// Typed result of one fetch; backends report failures here rather than panicking.
pub type ScrapeOutcome = Result<ProductData, BackendError>;

#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Up to `limit` candidate URLs for `query`, with relevance scores.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, BackendError>;
}

#[async_trait]
pub trait ScrapeBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, url: &str) -> ScrapeOutcome;
}

/// The non-LLM collaborators a workflow runs against.
#[derive(Clone)]
pub struct BackendSet {
    pub search: Arc<dyn SearchBackend>,
    pub scrape: Arc<dyn ScrapeBackend>,
}

impl BackendSet {
    pub fn new(search: Arc<dyn SearchBackend>, scrape: Arc<dyn ScrapeBackend>) -> Self {
        Self { search, scrape }
    }
}
