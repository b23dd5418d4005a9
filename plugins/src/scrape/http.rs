use std::time::Duration;

use async_trait::async_trait;

use scout_core::api::{BackendError, ScrapeBackend, ScrapeConfig, ScrapeOutcome};

use crate::http_util::{build_client, preview_body, HttpFailure};

use super::extract::extract_product;

const BACKEND: &str = "http-scrape";

/// Fetches product pages over plain HTTP with a browser user agent.
pub struct HttpScrapeBackend {
    http: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpScrapeBackend {
    pub fn new(cfg: &ScrapeConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_client(Duration::from_millis(cfg.timeout_ms), Some(&cfg.user_agent))?,
            max_body_bytes: cfg.max_body_bytes.max(1024),
        })
    }

    /// Read the body up to `max_body_bytes`, dropping the rest.
    async fn read_body(&self, mut resp: reqwest::Response) -> Result<String, BackendError> {
        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|err| HttpFailure::from_reqwest(err).into_backend_error(BACKEND))?
        {
            let room = self.max_body_bytes - buf.len();
            if chunk.len() >= room {
                buf.extend_from_slice(&chunk[..room]);
                tracing::debug!(
                    target: "scout.scrape",
                    limit = self.max_body_bytes,
                    "page truncated"
                );
                break;
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[async_trait]
impl ScrapeBackend for HttpScrapeBackend {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn fetch(&self, url: &str) -> ScrapeOutcome {
        let resp = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|err| HttpFailure::from_reqwest(err).into_backend_error(BACKEND))?;

        let status = resp.status().as_u16();
        if status == 403 {
            return Err(BackendError::Blocked(url.to_string()));
        }

        let body = self.read_body(resp).await?;
        if !(200..300).contains(&status) {
            tracing::warn!(
                target: "scout.scrape",
                url = %url,
                status,
                body = %preview_body(&body),
                "page fetch failed"
            );
            return Err(HttpFailure::status(status, &body).into_backend_error(BACKEND));
        }

        let product = extract_product(url, &body);
        tracing::info!(
            target: "scout.scrape",
            url = %url,
            bytes = body.len(),
            title = product.title.as_deref().unwrap_or("-"),
            has_price = product.price.is_some(),
            features = product.features.len(),
            "page scraped"
        );
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> HttpScrapeBackend {
        HttpScrapeBackend::new(&ScrapeConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_extracts_product() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/dp/B0D1")
            .match_header("user-agent", mockito::Matcher::Regex("Mozilla".into()))
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(
                r#"<html><head><meta property="og:title" content="AirPods Pro 2"></head>
                <body><span class="a-offscreen">$189.99</span></body></html>"#,
            )
            .create_async()
            .await;

        let url = format!("{}/dp/B0D1", server.url());
        let product = backend().fetch(&url).await.unwrap();
        assert_eq!(product.url, url);
        assert_eq!(product.title.as_deref(), Some("AirPods Pro 2"));
        assert_eq!(product.price.as_deref(), Some("$189.99"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_forbidden_is_blocked() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/p/1")
            .with_status(403)
            .create_async()
            .await;

        let url = format!("{}/p/1", server.url());
        let err = backend().fetch(&url).await.unwrap_err();
        assert_eq!(err, BackendError::Blocked(url));
    }

    #[tokio::test]
    async fn test_status_classification() {
        let mut server = mockito::Server::new_async().await;
        let _gone = server.mock("GET", "/gone").with_status(404).create_async().await;
        let _busy = server.mock("GET", "/busy").with_status(503).create_async().await;

        let err = backend().fetch(&format!("{}/gone", server.url())).await.unwrap_err();
        assert_eq!(err.code(), "backend_permanent");
        let err = backend().fetch(&format!("{}/busy", server.url())).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_large_body_is_truncated() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/big")
            .with_status(200)
            .with_body(format!("<title>Big</title>{}", "x".repeat(8192)))
            .create_async()
            .await;

        let scrape = HttpScrapeBackend::new(&ScrapeConfig {
            max_body_bytes: 1024,
            ..ScrapeConfig::default()
        })
        .unwrap();
        let product = scrape.fetch(&format!("{}/big", server.url())).await.unwrap();
        assert_eq!(product.title.as_deref(), Some("Big"));
    }
}
