//! Shared reqwest plumbing: failure classification and body previews.

use std::time::Duration;

use scout_core::api::{BackendError, ProviderError};

const BODY_PREVIEW_LIMIT: usize = 512;

/// Whether a failed HTTP exchange is worth retrying elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Transient,
    Permanent,
}

impl FailureClass {
    /// 408, 429 and 5xx are transient; every other non-success status is not.
    pub fn from_status(status: u16) -> Self {
        match status {
            408 | 429 => Self::Transient,
            500..=599 => Self::Transient,
            _ => Self::Permanent,
        }
    }

    /// Network-level failures (timeouts, refused connections, truncated
    /// bodies) are transient; malformed requests and builder errors are not.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16());
        }
        if err.is_timeout() || err.is_connect() || err.is_body() || err.is_request() {
            Self::Transient
        } else {
            Self::Permanent
        }
    }
}

/// A classified HTTP failure, convertible into the error type each caller needs.
#[derive(Debug, Clone)]
pub struct HttpFailure {
    pub class: FailureClass,
    pub message: String,
}

impl HttpFailure {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let class = FailureClass::from_reqwest(&err);
        let kind = if err.is_timeout() {
            "timeout"
        } else if err.is_connect() {
            "connect"
        } else if err.is_decode() {
            "decode"
        } else {
            "request"
        };
        Self {
            class,
            message: format!("{kind}: {err}"),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            class: FailureClass::from_status(status),
            message: format!("HTTP {status}: {}", preview_body(body)),
        }
    }

    pub fn decode(err: serde_json::Error, body: &str) -> Self {
        Self {
            class: FailureClass::Permanent,
            message: format!("failed to decode response body: {err} | body={}", preview_body(body)),
        }
    }

    pub fn into_provider_error(self) -> ProviderError {
        match self.class {
            FailureClass::Transient => ProviderError::Transient(self.message),
            FailureClass::Permanent => ProviderError::Permanent(self.message),
        }
    }

    pub fn into_backend_error(self, backend: &str) -> BackendError {
        match self.class {
            FailureClass::Transient => BackendError::transient(backend, self.message),
            FailureClass::Permanent => BackendError::permanent(backend, self.message),
        }
    }
}

/// Send a request and decode a JSON body, classifying every failure.
pub async fn send_json(req: reqwest::RequestBuilder) -> Result<serde_json::Value, HttpFailure> {
    let resp = req.send().await.map_err(HttpFailure::from_reqwest)?;
    let status = resp.status();
    let body = resp.text().await.map_err(HttpFailure::from_reqwest)?;

    if !status.is_success() {
        return Err(HttpFailure::status(status.as_u16(), &body));
    }

    serde_json::from_str(&body).map_err(|err| HttpFailure::decode(err, &body))
}

pub fn build_client(timeout: Duration, user_agent: Option<&str>) -> anyhow::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    Ok(builder.build()?)
}

pub fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    let mut out: String = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect();
    if trimmed.chars().count() > BODY_PREVIEW_LIMIT {
        out.push_str("...");
    }
    out
}
