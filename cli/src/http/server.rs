//! HTTP server lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

use scout_core::api::{AppConfig, CliError, HttpServerConfig};
use scout_plugins::factory;

use super::{
    middleware::{create_middleware_stack, request_logger},
    routes::create_router,
    AppState,
};
use crate::commands::cli::ServeArgs;

/// Handle `scout serve`: CLI flags win over the `http_server` config section.
pub async fn handle_serve(args: ServeArgs, cfg: AppConfig) -> Result<(), CliError> {
    let server_cfg = HttpServerConfig {
        host: args.host.unwrap_or_else(|| cfg.http_server.host.clone()),
        port: args.port.unwrap_or(cfg.http_server.port),
    };

    let workflow = Arc::new(factory::build_workflow(&cfg)?);
    let (shutdown_tx, _) = broadcast::channel(1);
    let state = AppState::new(workflow, shutdown_tx);

    start_server(server_cfg, state)
        .await
        .map_err(|e: Box<dyn std::error::Error + Send + Sync>| CliError::Command(e.to_string()))
}

pub fn build_app(state: AppState) -> axum::Router {
    create_router(state)
        .layer(middleware::from_fn(request_logger))
        .layer(create_middleware_stack())
}

pub async fn start_server(
    config: HttpServerConfig,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = build_app(state.clone());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(target: "scout.http", "HTTP server listening on http://{}", addr);

    let mut shutdown_rx = state.shutdown_tx.subscribe();

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!(target: "scout.http", "Received Ctrl+C signal");
                }
                _ = shutdown_rx.recv() => {
                    info!(target: "scout.http", "Received shutdown signal");
                }
                _ = wait_for_sigterm() => {
                    info!(target: "scout.http", "Received SIGTERM signal");
                }
            }

            info!(target: "scout.http", "Starting graceful shutdown...");
        })
        .await?;

    info!(target: "scout.http", "Server shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(target: "scout.http", error = %e, "failed to install SIGTERM handler");
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await
}
