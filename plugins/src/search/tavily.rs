use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use scout_core::api::{BackendError, SearchBackend, SearchConfig, SearchHit};

use crate::http_util::{build_client, send_json, HttpFailure};

const BACKEND: &str = "tavily";

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    content: Option<String>,
}

impl From<TavilyResult> for SearchHit {
    fn from(r: TavilyResult) -> Self {
        SearchHit {
            url: r.url,
            title: r.title.filter(|t| !t.trim().is_empty()),
            // Missing scores sort last instead of being dropped.
            score: r.score.unwrap_or(0.0),
            snippet: r.content.filter(|c| !c.trim().is_empty()),
        }
    }
}

/// Web search through the Tavily `/search` API, restricted to retail domains.
pub struct TavilySearch {
    api_key: Option<String>,
    base_url: String,
    search_depth: String,
    include_domains: Vec<String>,
    max_results: usize,
    http: reqwest::Client,
}

impl TavilySearch {
    pub fn new(cfg: &SearchConfig) -> anyhow::Result<Self> {
        Ok(Self {
            api_key: cfg.api_key.clone().filter(|k| !k.trim().is_empty()),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            search_depth: cfg.search_depth.clone(),
            include_domains: cfg.include_domains.clone(),
            max_results: cfg.max_results.max(1),
            http: build_client(Duration::from_millis(cfg.timeout_ms), None)?,
        })
    }
}

#[async_trait]
impl SearchBackend for TavilySearch {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, BackendError> {
        let Some(api_key) = &self.api_key else {
            return Err(BackendError::permanent(BACKEND, "TAVILY_API_KEY is not configured"));
        };

        let max_results = limit.clamp(1, self.max_results);
        let body = json!({
            "api_key": api_key,
            "query": query,
            "max_results": max_results,
            "search_depth": self.search_depth,
            "include_domains": self.include_domains,
        });

        let value = send_json(self.http.post(format!("{}/search", self.base_url)).json(&body))
            .await
            .map_err(|f| f.into_backend_error(BACKEND))?;

        let parsed: TavilyResponse = serde_json::from_value(value)
            .map_err(|err| HttpFailure::decode(err, "").into_backend_error(BACKEND))?;

        tracing::info!(
            target: "scout.search",
            query = %query,
            hits = parsed.results.len(),
            "search finished"
        );
        Ok(parsed.results.into_iter().map(SearchHit::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config(base: &str, key: Option<&str>) -> SearchConfig {
        SearchConfig {
            api_key: key.map(str::to_string),
            base_url: base.to_string(),
            ..SearchConfig::default()
        }
    }

    #[tokio::test]
    async fn test_search_maps_results() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .match_body(Matcher::PartialJson(json!({
                "query": "airpods pro",
                "max_results": 3,
                "api_key": "tvly-test",
            })))
            .with_status(200)
            .with_body(
                r#"{"results":[
                    {"url":"https://www.amazon.com/dp/B0D1","title":"AirPods Pro 2","score":0.91,"content":"Active noise cancellation"},
                    {"url":"https://www.bestbuy.com/site/123","title":"","content":""}
                ]}"#,
            )
            .create_async()
            .await;

        let search = TavilySearch::new(&config(&server.url(), Some("tvly-test"))).unwrap();
        let hits = search.search("airpods pro", 3).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title.as_deref(), Some("AirPods Pro 2"));
        assert_eq!(hits[0].snippet.as_deref(), Some("Active noise cancellation"));
        assert_eq!(hits[1].title, None);
        assert_eq!(hits[1].score, 0.0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_key_is_permanent() {
        let search = TavilySearch::new(&config("http://127.0.0.1:9", None)).unwrap();
        let err = search.search("airpods", 5).await.unwrap_err();
        assert_eq!(err.code(), "backend_permanent");
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/search")
            .with_status(502)
            .create_async()
            .await;

        let search = TavilySearch::new(&config(&server.url(), Some("k"))).unwrap();
        let err = search.search("airpods", 5).await.unwrap_err();
        assert!(err.is_transient());
    }
}
