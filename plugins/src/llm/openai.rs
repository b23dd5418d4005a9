use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use scout_core::api::{LlmProvider, LlmRequest, ProviderError, TaskType};

use crate::http_util::{build_client, send_json};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Any OpenAI-compatible `chat/completions` endpoint.
pub struct OpenAiProvider {
    name: String,
    api_key: Option<String>,
    base_url: String,
    http: reqwest::Client,
}

impl OpenAiProvider {
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
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            http: build_client(timeout, None)?,
        })
    }

    fn request_body(model: &str, request: &LlmRequest) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        let mut body = json!({
            "model": model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if request.json_output {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

fn extract_text(value: &Value) -> Result<String, ProviderError> {
    let text = value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::Permanent("response has no choices".to_string()))?;

    if text.trim().is_empty() {
        return Err(ProviderError::Transient("empty completion".to_string()));
    }
    Ok(text.to_string())
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
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
            return Err(ProviderError::Permanent("openai api key not configured".into()));
        };

        tracing::debug!(
            target: "scout.llm",
            provider = %self.name,
            model = %model,
            task_type = %task_type,
            "calling chat completions"
        );

        let req = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&Self::request_body(model, request));

        let value = send_json(req)
            .await
            .map_err(|f| f.into_provider_error())?;
        extract_text(&value)
    }
}
