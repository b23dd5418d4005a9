#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use scout_core::api::{
    BackendError, BackendSet, ExecutorOptions, LlmProvider, LlmRequest, LlmRouter, NodeError,
    NodeSet, PlannerConfig, PriorResults, ProductData, ProviderError, RouteTarget, RoutingTable,
    ScrapeBackend, ScrapeOutcome, SearchBackend, SearchHit, TaskExecutor, TaskInput, TaskKind,
    TaskNode, TaskPayload, TaskType, Workflow,
};
use scout_core::planner::Planner;

pub const SUMMARY_REPLY: &str = r#"{"summary": "Open-fit earbuds with USB-C and solid battery life.",
  "highlights": ["USB-C case", "Spatial audio"]}"#;

pub const SENTIMENT_REPLY: &str = r#"```json
{"overall": "positive", "score": 0.72, "key_positive_themes": ["comfort", "sound"],
 "key_negative_themes": ["no ear tips"], "confidence": 0.8,
 "analysis_summary": "Buyers praise comfort and sound quality."}
```"#;

pub const COMPARE_REPLY: &str = r#"{"alternatives": [
  {"name": "Samsung Galaxy Buds3", "price": "$179.99", "attributes": {"anc": "yes"},
   "verdict": "Best for Android users"}],
 "recommendation": "AirPods 4 are the pick for iPhone owners."}"#;

pub const CYCLIC_PLAN: &str = r#"{"intent": "product_research", "tasks": [
  {"id": "a", "kind": "search", "depends_on": ["b"], "input": {"query": "x"}},
  {"id": "b", "kind": "search", "depends_on": ["a"], "input": {"query": "y"}}]}"#;

pub struct MockSearch {
    pub hits: Vec<SearchHit>,
}

impl MockSearch {
    pub fn airpods() -> Self {
        Self {
            hits: vec![
                SearchHit::new("https://www.amazon.com/dp/B0DGHMNQ5Z", 0.95).with_title("Apple AirPods 4"),
                SearchHit::new("https://www.bestbuy.com/site/airpods-4", 0.9).with_title("AirPods 4 - Best Buy"),
                SearchHit::new("https://www.amazon.com/dp/B0D1GALAXY", 0.7).with_title("Samsung Galaxy Buds3"),
            ],
        }
    }
}

#[async_trait]
impl SearchBackend for MockSearch {
    fn name(&self) -> &str {
        "mock-search"
    }

    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<SearchHit>, BackendError> {
        Ok(self.hits.iter().take(limit).cloned().collect())
    }
}

pub struct MockScrape {
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl MockScrape {
    pub fn ok() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ScrapeBackend for MockScrape {
    fn name(&self) -> &str {
        "mock-scrape"
    }

    async fn fetch(&self, url: &str) -> ScrapeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BackendError::permanent("mock-scrape", "HTTP 500"));
        }
        let mut product = ProductData::new(url);
        product.title = Some("Apple AirPods 4".into());
        product.price = Some("$129.00".into());
        product.rating = Some(4.5);
        product.review_count = Some(12000);
        product.features = vec!["USB-C charging case".into(), "Spatial audio".into()];
        Ok(product)
    }
}

/// Provider answering per task type, with optional credentials and latency.
pub struct ScriptedProvider {
    name: String,
    credentials: bool,
    delay: Option<Duration>,
    planning: Mutex<Vec<String>>,
    pub calls: Mutex<Vec<TaskType>>,
}

impl ScriptedProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            credentials: true,
            delay: None,
            planning: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn without_credentials(mut self) -> Self {
        self.credentials = false;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_planning(self, replies: Vec<&str>) -> Self {
        *self.planning.lock().unwrap() = replies.into_iter().map(String::from).collect();
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_credentials(&self) -> bool {
        self.credentials
    }

    async fn complete(
        &self,
        _model: &str,
        _request: &LlmRequest,
        task_type: TaskType,
    ) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(task_type);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match task_type {
            TaskType::Planning => {
                let mut planning = self.planning.lock().unwrap();
                if planning.is_empty() {
                    Err(ProviderError::Permanent("no planning reply scripted".into()))
                } else {
                    Ok(planning.remove(0))
                }
            }
            TaskType::Summarize => Ok(SUMMARY_REPLY.to_string()),
            TaskType::Sentiment => Ok(SENTIMENT_REPLY.to_string()),
            TaskType::Compare => Ok(COMPARE_REPLY.to_string()),
        }
    }
}

pub fn route_all(candidates: Vec<RouteTarget>) -> RoutingTable {
    TaskType::ALL
        .iter()
        .fold(RoutingTable::new(), |table, task| {
            table.with_route(*task, candidates.clone())
        })
}

pub fn router(provider: Arc<ScriptedProvider>) -> Arc<LlmRouter> {
    let table = route_all(vec![RouteTarget::new(provider.name().to_string(), "model-1")]);
    Arc::new(LlmRouter::builder(table).provider(provider).build())
}

pub fn workflow(
    search: MockSearch,
    scrape: Arc<MockScrape>,
    provider: Arc<ScriptedProvider>,
    planner: PlannerConfig,
) -> Workflow {
    let router = router(provider);
    let backends = BackendSet::new(Arc::new(search), scrape);
    let nodes = NodeSet::new(backends, router.clone(), 5);
    Workflow::new(
        Planner::new(planner).with_router(router),
        TaskExecutor::new(Arc::new(nodes), ExecutorOptions::default()),
    )
}

/// Custom node driven by its params: `{"fail": bool, "sleep_ms": u64}`.
/// Tracks how many instances run at once.
#[derive(Default)]
pub struct ProbeNode {
    pub running: AtomicUsize,
    pub peak: AtomicUsize,
}

#[async_trait]
impl TaskNode for ProbeNode {
    fn kind(&self) -> TaskKind {
        TaskKind::Custom
    }

    async fn execute(
        &self,
        input: &TaskInput,
        _prior: &PriorResults,
    ) -> Result<TaskPayload, NodeError> {
        let TaskInput::Custom { name, params } = input else {
            return Err(NodeError::Unsupported("probe".into()));
        };

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let sleep_ms = params.get("sleep_ms").and_then(|v| v.as_u64()).unwrap_or(10);
        tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
        self.running.fetch_sub(1, Ordering::SeqCst);

        if params.get("fail").and_then(|v| v.as_bool()).unwrap_or(false) {
            return Err(NodeError::NoResults("probe told to fail".into()));
        }
        Ok(TaskPayload::Custom {
            name: name.clone(),
            value: params.clone(),
        })
    }
}

pub fn probe_task(id: &str, deps: &[&str], params: serde_json::Value) -> scout_core::api::Task {
    scout_core::api::Task::new(
        id,
        deps.iter().map(|d| d.to_string()).collect(),
        TaskInput::Custom {
            name: "probe".into(),
            params,
        },
    )
}

pub fn probe_executor(probe: Arc<ProbeNode>, opts: ExecutorOptions) -> TaskExecutor {
    TaskExecutor::new(Arc::new(NodeSet::default().with_custom("probe", probe)), opts)
}
