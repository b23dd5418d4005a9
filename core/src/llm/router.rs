use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::LlmConfig;
use crate::error::{LlmError, ProviderError};

use super::retry::RetryStrategy;
use super::traits::LlmProvider;
use super::types::{AttemptOutcome, LlmRequest, ModelResponse, RouteAttempt, RouteTarget, TaskType};

/// Task type -> ordered candidate list. Immutable once the router is built.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    routes: HashMap<TaskType, Vec<RouteTarget>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &LlmConfig) -> Self {
        TaskType::ALL
            .into_iter()
            .fold(Self::new(), |table, task| {
                table.with_route(task, cfg.candidates_for(task))
            })
    }

    pub fn with_route(mut self, task: TaskType, candidates: Vec<RouteTarget>) -> Self {
        self.routes.insert(task, candidates);
        self
    }

    pub fn candidates(&self, task: TaskType) -> &[RouteTarget] {
        self.routes.get(&task).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Routes model calls to providers with per-call timeouts, optional retry and
/// ordered fallback.
pub struct LlmRouter {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    table: RoutingTable,
    timeout: Duration,
    retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

pub struct LlmRouterBuilder {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    table: RoutingTable,
    timeout: Duration,
    retry_strategy: Option<Arc<dyn RetryStrategy>>,
}

impl LlmRouter {
    pub fn builder(table: RoutingTable) -> LlmRouterBuilder {
        LlmRouterBuilder::new(table)
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Walk the candidates for `task_type` until one answers.
    ///
    /// Candidates whose provider is missing or has no credentials are skipped
    /// without a call. Transient failures (including timeouts) are retried per
    /// the retry strategy, then fall through to the next candidate. A permanent
    /// failure stops the walk. Running out of candidates is a permanent error.
    pub async fn invoke(
        &self,
        task_type: TaskType,
        request: &LlmRequest,
    ) -> Result<ModelResponse, LlmError> {
        let candidates = self.table.candidates(task_type);
        if candidates.is_empty() {
            return Err(LlmError::Permanent {
                provider: "router".to_string(),
                message: format!("no route configured for {task_type}"),
            });
        }

        let started = Instant::now();
        let mut attempts: Vec<RouteAttempt> = Vec::new();

        for target in candidates {
            let Some(provider) = self.providers.get(&target.provider) else {
                tracing::debug!(
                    target: "scout.llm",
                    task_type = %task_type,
                    provider = %target.provider,
                    "provider not registered, skipping"
                );
                attempts.push(attempt(target, AttemptOutcome::Unavailable("not registered".into())));
                continue;
            };

            if !provider.has_credentials() {
                tracing::debug!(
                    target: "scout.llm",
                    task_type = %task_type,
                    provider = %target.provider,
                    "provider has no credentials, skipping"
                );
                attempts.push(attempt(target, AttemptOutcome::Unavailable("no credentials".into())));
                continue;
            }

            let max_attempts = self
                .retry_strategy
                .as_ref()
                .map(|s| s.max_attempts().max(1))
                .unwrap_or(1);

            let mut tries: u32 = 0;
            loop {
                let call_started = Instant::now();
                let result = tokio::time::timeout(
                    self.timeout,
                    provider.complete(&target.model, request, task_type),
                )
                .await
                .unwrap_or_else(|_| {
                    Err(ProviderError::Transient(format!(
                        "timed out after {}ms",
                        self.timeout.as_millis()
                    )))
                });
                tries += 1;

                match result {
                    Ok(text) => {
                        tracing::debug!(
                            target: "scout.llm",
                            task_type = %task_type,
                            provider = %target.provider,
                            model = %target.model,
                            elapsed_ms = call_started.elapsed().as_millis() as u64,
                            skipped = attempts.len(),
                            "llm call succeeded"
                        );
                        return Ok(ModelResponse {
                            provider: target.provider.clone(),
                            model: target.model.clone(),
                            text,
                            elapsed_ms: started.elapsed().as_millis() as u64,
                            attempts,
                        });
                    }
                    Err(ProviderError::Permanent(message)) => {
                        tracing::warn!(
                            target: "scout.llm",
                            task_type = %task_type,
                            provider = %target.provider,
                            model = %target.model,
                            error = %message,
                            "permanent llm failure, not falling back"
                        );
                        return Err(LlmError::Permanent {
                            provider: target.provider.clone(),
                            message,
                        });
                    }
                    Err(ProviderError::Transient(message)) => {
                        tracing::warn!(
                            target: "scout.llm",
                            task_type = %task_type,
                            provider = %target.provider,
                            model = %target.model,
                            attempt = tries,
                            error = %message,
                            "transient llm failure"
                        );

                        let delay = self.retry_strategy.as_ref().and_then(|strategy| {
                            if tries < max_attempts && strategy.should_retry(tries, &message) {
                                strategy.next_delay(tries, &message)
                            } else {
                                None
                            }
                        });
                        attempts.push(attempt(target, AttemptOutcome::Transient(message)));

                        match delay {
                            Some(delay) => tokio::time::sleep(delay).await,
                            None => break,
                        }
                    }
                }
            }
        }

        let last_provider = attempts
            .last()
            .map(|a| a.provider.clone())
            .unwrap_or_else(|| "router".to_string());
        Err(LlmError::Permanent {
            provider: last_provider,
            message: format!(
                "all {} candidate(s) for {} exhausted",
                candidates.len(),
                task_type
            ),
        })
    }
}

fn attempt(target: &RouteTarget, outcome: AttemptOutcome) -> RouteAttempt {
    RouteAttempt {
        provider: target.provider.clone(),
        model: target.model.clone(),
        outcome,
    }
}

impl LlmRouterBuilder {
    pub fn new(table: RoutingTable) -> Self {
        Self {
            providers: HashMap::new(),
            table,
            timeout: Duration::from_secs(60),
            retry_strategy: None,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.providers.insert(provider.name().to_string(), provider);
        self
    }

    pub fn providers(self, providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        providers.into_iter().fold(self, |b, p| b.provider(p))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry_strategy(mut self, strategy: Arc<dyn RetryStrategy>) -> Self {
        self.retry_strategy = Some(strategy);
        self
    }

    pub fn build(self) -> LlmRouter {
        LlmRouter {
            providers: self.providers,
            table: self.table,
            timeout: self.timeout,
            retry_strategy: self.retry_strategy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Step {
        Reply(&'static str),
        Fail(ProviderError),
        Hang,
    }

    struct Scripted {
        name: &'static str,
        credentials: bool,
        script: Mutex<VecDeque<Step>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(name: &'static str, credentials: bool, script: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                name,
                credentials,
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn has_credentials(&self) -> bool {
            self.credentials
        }

        async fn complete(
            &self,
            _model: &str,
            _request: &LlmRequest,
            _task_type: TaskType,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.script.lock().unwrap().pop_front();
            match step {
                Some(Step::Reply(text)) => Ok(text.to_string()),
                Some(Step::Fail(err)) => Err(err),
                Some(Step::Hang) => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
                None => Err(ProviderError::Permanent("script exhausted".into())),
            }
        }
    }

    struct FixedRetry(u32);

    impl RetryStrategy for FixedRetry {
        fn name(&self) -> &str {
            "fixed"
        }

        fn next_delay(&self, _attempt: u32, _error: &str) -> Option<Duration> {
            Some(Duration::from_millis(10))
        }

        fn max_attempts(&self) -> u32 {
            self.0
        }
    }

    fn table() -> RoutingTable {
        RoutingTable::new().with_route(
            TaskType::Summarize,
            vec![RouteTarget::new("p1", "m1"), RouteTarget::new("p2", "m2")],
        )
    }

    #[tokio::test]
    async fn test_missing_credentials_falls_through() {
        let p1 = Scripted::new("p1", false, vec![Step::Reply("nope")]);
        let p2 = Scripted::new("p2", true, vec![Step::Reply("hello")]);
        let router = LlmRouter::builder(table())
            .provider(p1.clone())
            .provider(p2.clone())
            .build();

        let resp = router
            .invoke(TaskType::Summarize, &LlmRequest::new("hi"))
            .await
            .unwrap();

        assert_eq!(resp.provider, "p2");
        assert_eq!(resp.model, "m2");
        assert_eq!(resp.text, "hello");
        assert_eq!(p1.calls(), 0);
        assert_eq!(
            resp.attempts[0].outcome,
            AttemptOutcome::Unavailable("no credentials".into())
        );
    }

    #[tokio::test]
    async fn test_transient_failure_falls_through() {
        let p1 = Scripted::new(
            "p1",
            true,
            vec![Step::Fail(ProviderError::Transient("503".into()))],
        );
        let p2 = Scripted::new("p2", true, vec![Step::Reply("ok")]);
        let router = LlmRouter::builder(table())
            .providers(vec![p1.clone(), p2.clone()])
            .build();

        let resp = router
            .invoke(TaskType::Summarize, &LlmRequest::new("hi"))
            .await
            .unwrap();
        assert_eq!(resp.provider, "p2");
        assert_eq!(p1.calls(), 1);
        assert_eq!(resp.attempts.len(), 1);
    }

    #[tokio::test]
    async fn test_permanent_failure_stops_fallback() {
        let p1 = Scripted::new(
            "p1",
            true,
            vec![Step::Fail(ProviderError::Permanent("401".into()))],
        );
        let p2 = Scripted::new("p2", true, vec![Step::Reply("ok")]);
        let router = LlmRouter::builder(table())
            .providers(vec![p1, p2.clone()])
            .build();

        let err = router
            .invoke(TaskType::Summarize, &LlmRequest::new("hi"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LlmError::Permanent {
                provider: "p1".into(),
                message: "401".into()
            }
        );
        assert_eq!(p2.calls(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_candidates_is_permanent() {
        let p1 = Scripted::new("p1", false, vec![]);
        let p2 = Scripted::new(
            "p2",
            true,
            vec![Step::Fail(ProviderError::Transient("429".into()))],
        );
        let router = LlmRouter::builder(table())
            .providers(vec![p1, p2])
            .build();

        let err = router
            .invoke(TaskType::Summarize, &LlmRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(err.provider(), "p2");
    }

    #[tokio::test]
    async fn test_unrouted_task_type_fails() {
        let router = LlmRouter::builder(table()).build();
        let err = router
            .invoke(TaskType::Compare, &LlmRequest::new("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.provider(), "router");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_transient_and_falls_through() {
        let p1 = Scripted::new("p1", true, vec![Step::Hang]);
        let p2 = Scripted::new("p2", true, vec![Step::Reply("late but fine")]);
        let router = LlmRouter::builder(table())
            .providers(vec![p1, p2])
            .timeout(Duration::from_millis(50))
            .build();

        let resp = router
            .invoke(TaskType::Summarize, &LlmRequest::new("hi"))
            .await
            .unwrap();
        assert_eq!(resp.provider, "p2");
        assert!(matches!(
            &resp.attempts[0].outcome,
            AttemptOutcome::Transient(msg) if msg.contains("timed out")
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_before_fallback() {
        let p1 = Scripted::new(
            "p1",
            true,
            vec![
                Step::Fail(ProviderError::Transient("503".into())),
                Step::Reply("second time lucky"),
            ],
        );
        let p2 = Scripted::new("p2", true, vec![Step::Reply("unused")]);
        let router = LlmRouter::builder(table())
            .providers(vec![p1.clone(), p2.clone()])
            .retry_strategy(Arc::new(FixedRetry(2)))
            .build();

        let resp = router
            .invoke(TaskType::Summarize, &LlmRequest::new("hi"))
            .await
            .unwrap();
        assert_eq!(resp.provider, "p1");
        assert_eq!(resp.text, "second time lucky");
        assert_eq!(p1.calls(), 2);
        assert_eq!(p2.calls(), 0);
    }

    #[test]
    fn test_table_from_config() {
        let table = RoutingTable::from_config(&LlmConfig::default());
        for task in TaskType::ALL {
            assert_eq!(table.candidates(task).len(), 2);
        }
    }
}
