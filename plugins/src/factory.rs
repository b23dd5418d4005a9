use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use scout_core::api::{
    AppConfig, BackendSet, ExecutorOptions, LlmConfig, LlmProvider, LlmRouter, NodeSet,
    OutputRenderer, Planner, ProviderKind, RetryConfig, RetryStrategy, RoutingTable,
    TaskExecutor, Workflow,
};

use crate::llm::{GeminiProvider, OpenAiProvider};
use crate::renderers::{JsonlRenderer, TextRenderer};
use crate::scrape::HttpScrapeBackend;
use crate::search::TavilySearch;
use crate::strategies::{ExponentialBackoffStrategy, LinearRetryStrategy};

pub fn build_providers(cfg: &LlmConfig) -> Result<Vec<Arc<dyn LlmProvider>>> {
    let timeout = Duration::from_millis(cfg.timeout_ms);
    cfg.providers
        .iter()
        .map(|p| -> Result<Arc<dyn LlmProvider>> {
            let provider: Arc<dyn LlmProvider> = match p.kind {
                ProviderKind::Gemini => Arc::new(GeminiProvider::new(
                    p.name.clone(),
                    p.api_key.clone(),
                    p.base_url.clone(),
                    timeout,
                )?),
                ProviderKind::Openai => Arc::new(OpenAiProvider::new(
                    p.name.clone(),
                    p.api_key.clone(),
                    p.base_url.clone(),
                    timeout,
                )?),
            };
            Ok(provider)
        })
        .collect()
}

pub fn build_retry(cfg: &RetryConfig) -> Option<Arc<dyn RetryStrategy>> {
    if cfg.max_attempts <= 1 {
        return None;
    }
    match cfg.strategy.as_str() {
        "linear" => Some(Arc::new(LinearRetryStrategy::new(cfg.clone()))),
        // Anything else gets the default backoff.
        _ => Some(Arc::new(ExponentialBackoffStrategy::new(cfg.clone()))),
    }
}

pub fn build_router(cfg: &LlmConfig) -> Result<Arc<LlmRouter>> {
    let mut builder = LlmRouter::builder(RoutingTable::from_config(cfg))
        .providers(build_providers(cfg)?)
        .timeout(Duration::from_millis(cfg.timeout_ms));
    if let Some(retry) = build_retry(&cfg.retry) {
        builder = builder.retry_strategy(retry);
    }
    Ok(Arc::new(builder.build()))
}

pub fn build_backends(cfg: &AppConfig) -> Result<BackendSet> {
    Ok(BackendSet::new(
        Arc::new(TavilySearch::new(&cfg.search)?),
        Arc::new(HttpScrapeBackend::new(&cfg.scrape)?),
    ))
}

pub fn build_planner(cfg: &AppConfig, router: Arc<LlmRouter>) -> Planner {
    Planner::new(cfg.planner.clone()).with_router(router)
}

/// Assemble a ready-to-run workflow from configuration.
pub fn build_workflow(cfg: &AppConfig) -> Result<Workflow> {
    let router = build_router(&cfg.llm)?;
    let nodes = NodeSet::new(build_backends(cfg)?, router.clone(), cfg.planner.search_results);
    let executor = TaskExecutor::new(Arc::new(nodes), ExecutorOptions::from(&cfg.executor));

    tracing::debug!(
        target: "scout.factory",
        strategy = ?cfg.planner.strategy,
        max_parallel = cfg.executor.max_parallel,
        providers = cfg.llm.providers.len(),
        "workflow assembled"
    );
    Ok(Workflow::new(build_planner(cfg, router), executor))
}

pub fn build_renderer(format: &str) -> Box<dyn OutputRenderer> {
    match format {
        "jsonl" => Box::new(JsonlRenderer::new(false)),
        "json" => Box::new(JsonlRenderer::new(true)),
        _ => Box::new(TextRenderer::new(false)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::api::TaskType;

    #[test]
    fn test_single_attempt_has_no_retry_strategy() {
        assert!(build_retry(&RetryConfig::default()).is_none());

        let linear = build_retry(&RetryConfig {
            max_attempts: 3,
            strategy: "linear".into(),
            ..RetryConfig::default()
        })
        .unwrap();
        assert_eq!(linear.name(), "linear");
    }

    #[test]
    fn test_router_routes_every_task_type() {
        let router = build_router(&LlmConfig::default()).unwrap();
        for task in TaskType::ALL {
            assert_eq!(router.table().candidates(task).len(), 2);
        }
    }

    #[test]
    fn test_build_workflow_from_defaults() {
        let cfg = AppConfig::default();
        let workflow = build_workflow(&cfg).unwrap();
        assert_eq!(workflow.executor().options().max_parallel, 4);
    }

    #[test]
    fn test_renderer_selection() {
        assert_eq!(build_renderer("jsonl").format(), "jsonl");
        assert_eq!(build_renderer("json").format(), "json");
        assert_eq!(build_renderer("anything").format(), "text");
    }
}
