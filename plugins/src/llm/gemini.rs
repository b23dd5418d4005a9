use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use scout_core::api::{LlmProvider, LlmRequest, ProviderError, TaskType};

use crate::http_util::{build_client, send_json};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini via the `generateContent` REST endpoint.
pub struct GeminiProvider {
    name: String,
    api_key: Option<String>,
    base_url: String,
    http: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(
        name: impl Into<String>,
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            name: name.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            http: build_client(timeout, None)?,
        })
    }

    fn request_body(request: &LlmRequest) -> Value {
        let mut generation = json!({
            "temperature": request.temperature,
            "maxOutputTokens": request.max_tokens,
        });
        if request.json_output {
            generation["responseMimeType"] = json!("application/json");
        }

        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
            "generationConfig": generation,
        });
        if let Some(system) = &request.system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        body
    }
}

/// Concatenated text parts of the first candidate.
fn extract_text(value: &Value) -> Result<String, ProviderError> {
    let parts = value
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            let reason = value
                .pointer("/promptFeedback/blockReason")
                .and_then(Value::as_str)
                .unwrap_or("no candidates in response");
            ProviderError::Permanent(format!("gemini returned no content: {reason}"))
        })?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        return Err(ProviderError::Transient("gemini returned empty text".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(
        &self,
        model: &str,
        request: &LlmRequest,
        task_type: TaskType,
    ) -> Result<String, ProviderError> {
        let Some(api_key) = &self.api_key else {
            return Err(ProviderError::Permanent("gemini api key not configured".into()));
        };

        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        tracing::debug!(
            target: "scout.llm",
            provider = %self.name,
            model = %model,
            task_type = %task_type,
            "calling gemini"
        );

        let req = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&Self::request_body(request));

        let value = send_json(req)
            .await
            .map_err(|f| f.into_provider_error())?;
        extract_text(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(base: &str) -> GeminiProvider {
        GeminiProvider::new(
            "gemini",
            Some("test-key".into()),
            Some(base.to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_request_body_carries_system_and_json_mode() {
        let request = LlmRequest::new("hello").with_system("be brief").json();
        let body = GeminiProvider::request_body(&request);
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn test_missing_key_means_no_credentials() {
        let p = GeminiProvider::new("gemini", Some("  ".into()), None, Duration::from_secs(1)).unwrap();
        assert!(!p.has_credentials());
    }

    #[tokio::test]
    async fn test_complete_joins_text_parts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .with_status(200)
            .with_body(
                r#"{"candidates":[{"content":{"parts":[{"text":"{\"summary\":"},{"text":"\"ok\"}"}]}}]}"#,
            )
            .create_async()
            .await;

        let text = provider(&server.url())
            .complete("gemini-2.5-flash", &LlmRequest::new("hi"), TaskType::Summarize)
            .await
            .unwrap();
        assert_eq!(text, r#"{"summary":"ok"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_is_transient_and_bad_key_permanent() {
        let mut server = mockito::Server::new_async().await;
        let _limited = server
            .mock("POST", "/v1beta/models/busy:generateContent")
            .with_status(429)
            .with_body("quota")
            .create_async()
            .await;
        let _denied = server
            .mock("POST", "/v1beta/models/denied:generateContent")
            .with_status(403)
            .with_body("bad key")
            .create_async()
            .await;

        let p = provider(&server.url());
        let err = p
            .complete("busy", &LlmRequest::new("hi"), TaskType::Planning)
            .await
            .unwrap_err();
        assert!(err.is_transient());

        let err = p
            .complete("denied", &LlmRequest::new("hi"), TaskType::Planning)
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }
}
