//! HTTP route handlers.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use futures::StreamExt;
use serde_json::json;

use scout_core::api::{CancelToken, OutputRenderer, Report, RunError, WorkflowUpdate};
use scout_plugins::renderers::JsonlRenderer;

use crate::http::{models::*, state::AppState};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/research/sync", post(research_sync_handler))
        .route("/api/research", post(research_stream_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

fn parse_request(
    payload: Result<Json<ResearchRequest>, JsonRejection>,
) -> Result<ResearchRequest, HttpServerError> {
    payload
        .map(|Json(req)| req)
        .map_err(|rejection| HttpServerError::InvalidRequest(rejection.body_text()))
}

/// POST /api/research/sync - run to completion and return the report.
///
/// The run goes through the streaming entry point so that a client
/// disconnect (which drops this future) cancels it.
async fn research_sync_handler(
    State(state): State<AppState>,
    payload: Result<Json<ResearchRequest>, JsonRejection>,
) -> Result<Json<ResearchResponse>, HttpServerError> {
    state.record_request("/api/research/sync");
    let (query, strategy) = parse_request(payload)?.validate()?;

    let mut updates = Box::pin(
        state
            .workflow
            .clone()
            .run_stream(query, strategy, CancelToken::new()),
    );

    let mut outcome: Option<Result<Report, RunError>> = None;
    while let Some(update) = updates.next().await {
        match update {
            WorkflowUpdate::Event(_) => {}
            WorkflowUpdate::Completed(report) => outcome = Some(Ok(report)),
            WorkflowUpdate::Aborted(err) => outcome = Some(Err(err)),
        }
    }

    match outcome {
        Some(Ok(report)) => Ok(Json(ResearchResponse {
            success: true,
            data: Some(report),
            error: None,
            error_code: None,
        })),
        Some(Err(err)) => {
            state.record_error();
            Err(err.into())
        }
        None => {
            state.record_error();
            Err(HttpServerError::Internal("run ended without a report".into()))
        }
    }
}

/// POST /api/research - NDJSON stream: one line per event, then the report
/// (or an error line).
async fn research_stream_handler(
    State(state): State<AppState>,
    payload: Result<Json<ResearchRequest>, JsonRejection>,
) -> Result<Response, HttpServerError> {
    state.record_request("/api/research");
    let (query, strategy) = parse_request(payload)?.validate()?;

    let mut updates = Box::pin(
        state
            .workflow
            .clone()
            .run_stream(query, strategy, CancelToken::new()),
    );
    let renderer = JsonlRenderer::new(false);

    let body = async_stream::stream! {
        while let Some(update) = updates.next().await {
            let line = match update {
                WorkflowUpdate::Event(event) => renderer.format_event(&event),
                WorkflowUpdate::Completed(report) => Some(renderer.format_report(&report)),
                WorkflowUpdate::Aborted(err) => {
                    state.record_error();
                    Some(error_line(&err))
                }
            };
            if let Some(mut line) = line {
                line.push('\n');
                yield Ok::<Bytes, Infallible>(Bytes::from(line));
            }
        }
    };

    Response::builder()
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(body))
        .map_err(|e| HttpServerError::Internal(e.to_string()))
}

fn error_line(err: &RunError) -> String {
    let err = HttpServerError::from(err.clone());
    json!({
        "v": 1,
        "event_type": "error",
        "ts": chrono::Local::now().to_rfc3339(),
        "status": err.status().as_u16(),
        "error": err.message(),
        "error_code": err.code(),
    })
    .to_string()
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    state.record_request("/health");
    let (uptime_seconds, requests_total, errors_total) = state
        .stats
        .read()
        .map(|s| (s.uptime_seconds(), s.requests_total, s.errors_total))
        .unwrap_or((0.0, 0, 0));

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        requests_total,
        errors_total,
    })
}
