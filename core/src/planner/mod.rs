//! Query → plan.
//!
//! Two strategies share one contract. The fixed strategy builds the linear
//! research pipeline without calling a model. The dynamic strategy asks the
//! router for a task graph, validates it, retries once with a corrective
//! prompt, and falls back to the fixed pipeline rather than failing.

mod dynamic;
pub mod fixed;
mod prompts;

use std::sync::Arc;

use crate::config::{PlannerConfig, PlannerStrategy};
use crate::error::PlanningError;
use crate::llm::{LlmRequest, LlmRouter, TaskType};
use crate::plan::{Plan, PlanSource};

pub use dynamic::parse_plan;
pub use fixed::{classify_intent, is_comparison_query};

/// Dynamic planning gets one corrective retry.
const DYNAMIC_ATTEMPTS: usize = 2;

pub struct Planner {
    config: PlannerConfig,
    router: Option<Arc<LlmRouter>>,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            router: None,
        }
    }

    pub fn with_router(mut self, router: Arc<LlmRouter>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn strategy(&self) -> PlannerStrategy {
        self.config.strategy
    }

    pub async fn plan(&self, query: &str) -> Result<Plan, PlanningError> {
        self.plan_with(query, None).await
    }

    /// Plan with an explicit strategy, or the configured one when `None`.
    pub async fn plan_with(
        &self,
        query: &str,
        strategy: Option<PlannerStrategy>,
    ) -> Result<Plan, PlanningError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PlanningError::EmptyQuery);
        }

        let strategy = strategy.unwrap_or(self.config.strategy);
        let plan = match (strategy, &self.router) {
            (PlannerStrategy::Fixed, _) => self.fixed(query, PlanSource::Fixed)?,
            (PlannerStrategy::Dynamic, Some(router)) => self.dynamic(query, router).await?,
            (PlannerStrategy::Dynamic, None) => {
                tracing::warn!(
                    target: "scout.planner",
                    "dynamic planning requested without a router, using the fixed pipeline"
                );
                self.fixed(query, PlanSource::FixedFallback)?
            }
        };

        tracing::info!(
            target: "scout.planner",
            intent = plan.intent(),
            source = ?plan.source(),
            tasks = plan.len(),
            stages = plan.stages().len(),
            "plan ready"
        );
        Ok(plan)
    }

    fn fixed(&self, query: &str, source: PlanSource) -> Result<Plan, PlanningError> {
        fixed::build(
            query,
            source,
            self.config.search_results,
            self.config.max_tasks,
        )
    }

    async fn dynamic(&self, query: &str, router: &LlmRouter) -> Result<Plan, PlanningError> {
        let mut request = Self::request(prompts::plan_request(query));

        for attempt in 1..=DYNAMIC_ATTEMPTS {
            let response = match router.invoke(TaskType::Planning, &request).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(
                        target: "scout.planner",
                        attempt,
                        provider = err.provider(),
                        error = %err,
                        "planner model unavailable, using the fixed pipeline"
                    );
                    return self.fixed(query, PlanSource::FixedFallback);
                }
            };

            match parse_plan(query, &response.text, self.config.max_tasks) {
                Ok(plan) => return Ok(plan),
                Err(err) => {
                    tracing::warn!(
                        target: "scout.planner",
                        attempt,
                        code = err.code(),
                        error = %err,
                        "dynamic plan rejected"
                    );
                    request = Self::request(prompts::corrective_request(
                        query,
                        &response.text,
                        &err.to_string(),
                    ));
                }
            }
        }

        tracing::warn!(
            target: "scout.planner",
            "dynamic planning failed validation twice, using the fixed pipeline"
        );
        self.fixed(query, PlanSource::FixedFallback)
    }

    fn request(prompt: String) -> LlmRequest {
        LlmRequest::new(prompt)
            .with_system(prompts::PLANNER_SYSTEM)
            .with_temperature(0.3)
            .json()
    }
}
