//! HTTP API request and response models.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use scout_core::api::{PlannerStrategy, Report, RunError};

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
    /// "fixed" or "dynamic"; the configured strategy when absent.
    #[serde(default)]
    pub strategy: Option<String>,
}

impl ResearchRequest {
    /// Trimmed query and parsed strategy, or a 400.
    pub fn validate(&self) -> Result<(String, Option<PlannerStrategy>), HttpServerError> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(HttpServerError::InvalidRequest("query must not be empty".into()));
        }

        let strategy = match self.strategy.as_deref() {
            None => None,
            Some(s) => Some(PlannerStrategy::parse(s).ok_or_else(|| {
                HttpServerError::InvalidRequest(format!(
                    "unknown strategy '{s}', expected 'fixed' or 'dynamic'"
                ))
            })?),
        };
        Ok((query.to_string(), strategy))
    }
}

#[derive(Debug, Serialize)]
pub struct ResearchResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Report>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: f64,
    pub requests_total: u64,
    pub errors_total: u64,
}

#[derive(Debug)]
pub enum HttpServerError {
    InvalidRequest(String),
    Planning { code: String, message: String },
    Cancelled(String),
    Internal(String),
}

impl HttpServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Planning { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Cancelled(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Planning { code, .. } => code,
            Self::Cancelled(_) => "cancelled",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidRequest(msg) | Self::Cancelled(msg) | Self::Internal(msg) => msg,
            Self::Planning { message, .. } => message,
        }
    }
}

impl From<RunError> for HttpServerError {
    fn from(err: RunError) -> Self {
        match &err {
            RunError::Planning(e) => Self::Planning {
                code: e.code().to_string(),
                message: err.to_string(),
            },
            RunError::Cancelled(_) => Self::Cancelled(err.to_string()),
            RunError::Internal(_) => Self::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "error": self.message(),
            "error_code": self.code(),
        });

        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::api::{CancellationError, PlanningError};

    #[test]
    fn test_research_request_defaults() {
        let req: ResearchRequest = serde_json::from_str(r#"{"query":" airpods "}"#).unwrap();
        let (query, strategy) = req.validate().unwrap();
        assert_eq!(query, "airpods");
        assert_eq!(strategy, None);
    }

    #[test]
    fn test_research_request_rejects_bad_input() {
        let req: ResearchRequest = serde_json::from_str(r#"{"query":"   "}"#).unwrap();
        assert!(matches!(req.validate(), Err(HttpServerError::InvalidRequest(_))));

        let req: ResearchRequest =
            serde_json::from_str(r#"{"query":"airpods","strategy":"magic"}"#).unwrap();
        assert!(matches!(req.validate(), Err(HttpServerError::InvalidRequest(_))));
    }

    #[test]
    fn test_run_errors_map_to_status() {
        let planning = HttpServerError::from(RunError::Planning(PlanningError::EmptyQuery));
        assert_eq!(planning.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(planning.code(), "empty_query");

        let cancelled = HttpServerError::from(RunError::Cancelled(CancellationError {
            run_id: "r".into(),
            abandoned: vec![],
        }));
        assert_eq!(cancelled.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(cancelled.code(), "cancelled");
    }
}
