use serde::{Deserialize, Serialize};

use crate::llm::{RouteTarget, TaskType};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub scrape: ScrapeConfig,

    #[serde(default)]
    pub http_server: HttpServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "scout_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlannerStrategy {
    #[default]
    Fixed,
    Dynamic,
}

impl PlannerStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fixed" => Some(Self::Fixed),
            "dynamic" => Some(Self::Dynamic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub strategy: PlannerStrategy,

    /// Upper bound on tasks accepted from a dynamic plan.
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,

    /// How many search hits the search task asks for.
    #[serde(default = "default_search_results")]
    pub search_results: usize,
}

fn default_max_tasks() -> usize {
    16
}

fn default_search_results() -> usize {
    5
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            strategy: PlannerStrategy::default(),
            max_tasks: default_max_tasks(),
            search_results: default_search_results(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Deadline for a single node invocation.
    #[serde(default = "default_node_timeout_ms")]
    pub node_timeout_ms: u64,

    /// How long in-flight nodes may keep running after cancellation.
    #[serde(default = "default_cancel_grace_ms")]
    pub cancel_grace_ms: u64,
}

fn default_max_parallel() -> usize {
    4
}

fn default_node_timeout_ms() -> u64 {
    120_000
}

fn default_cancel_grace_ms() -> u64 {
    2_000
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            node_timeout_ms: default_node_timeout_ms(),
            cancel_grace_ms: default_cancel_grace_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub max_delay_ms: u64,

    /// "exponential-backoff" or "linear"
    #[serde(default = "default_retry_strategy")]
    pub strategy: String,
}

fn default_retry_max_attempts() -> u32 {
    1
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_ms() -> u64 {
    5_000
}

fn default_retry_strategy() -> String {
    "exponential-backoff".to_string()
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_max_attempts(),
            base_delay_ms: default_retry_base_delay_ms(),
            max_delay_ms: default_retry_max_delay_ms(),
            strategy: default_retry_strategy(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    Openai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Name used by routes to refer to this provider.
    pub name: String,

    pub kind: ProviderKind,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub base_url: Option<String>,

    pub model: String,

    /// Model used for planning calls; falls back to `model`.
    #[serde(default)]
    pub planner_model: Option<String>,
}

/// Explicit candidate list for one task type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub task: TaskType,
    pub candidates: Vec<RouteTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Deadline for each provider call.
    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,

    /// Task types without an entry here route through `providers` in order.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

fn default_llm_timeout_ms() -> u64 {
    60_000
}

fn default_llm_max_tokens() -> u32 {
    8192
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            name: "gemini".to_string(),
            kind: ProviderKind::Gemini,
            api_key: None,
            base_url: None,
            model: "gemini-2.5-flash".to_string(),
            planner_model: None,
        },
        ProviderConfig {
            name: "openai".to_string(),
            kind: ProviderKind::Openai,
            api_key: None,
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            planner_model: None,
        },
    ]
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_llm_timeout_ms(),
            max_tokens: default_llm_max_tokens(),
            retry: RetryConfig::default(),
            providers: default_providers(),
            routes: Vec::new(),
        }
    }
}

impl LlmConfig {
    /// Candidate list for a task type: the explicit route if one is configured,
    /// otherwise every provider in declaration order.
    pub fn candidates_for(&self, task: TaskType) -> Vec<RouteTarget> {
        if let Some(route) = self.routes.iter().find(|r| r.task == task) {
            return route.candidates.clone();
        }

        self.providers
            .iter()
            .map(|p| {
                let model = match task {
                    TaskType::Planning => p.planner_model.as_deref().unwrap_or(&p.model),
                    _ => &p.model,
                };
                RouteTarget::new(p.name.clone(), model)
            })
            .collect()
    }

    pub fn provider_mut(&mut self, kind: ProviderKind) -> Option<&mut ProviderConfig> {
        self.providers.iter_mut().find(|p| p.kind == kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    #[serde(default = "default_search_max_results")]
    pub max_results: usize,

    /// "basic" or "advanced"
    #[serde(default = "default_search_depth")]
    pub search_depth: String,

    #[serde(default = "default_include_domains")]
    pub include_domains: Vec<String>,

    #[serde(default = "default_search_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_search_base_url() -> String {
    "https://api.tavily.com".to_string()
}

fn default_search_max_results() -> usize {
    10
}

fn default_search_depth() -> String {
    "basic".to_string()
}

fn default_include_domains() -> Vec<String> {
    ["amazon.com", "bestbuy.com", "walmart.com", "target.com", "ebay.com"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}

fn default_search_timeout_ms() -> u64 {
    20_000
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_search_base_url(),
            max_results: default_search_max_results(),
            search_depth: default_search_depth(),
            include_domains: default_include_domains(),
            timeout_ms: default_search_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_scrape_timeout_ms")]
    pub timeout_ms: u64,

    /// Pages larger than this are truncated before extraction.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string()
}

fn default_scrape_timeout_ms() -> u64 {
    30_000
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_ms: default_scrape_timeout_ms(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_host")]
    pub host: String,

    #[serde(default = "default_http_port")]
    pub port: u16,
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8080
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_http_host(),
            port: default_http_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [executor]
            max_parallel = 2

            [planner]
            strategy = "dynamic"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.executor.max_parallel, 2);
        assert_eq!(cfg.executor.cancel_grace_ms, 2_000);
        assert_eq!(cfg.planner.strategy, PlannerStrategy::Dynamic);
        assert_eq!(cfg.planner.max_tasks, 16);
        assert_eq!(cfg.llm.providers.len(), 2);
        assert_eq!(cfg.search.include_domains.len(), 5);
    }

    #[test]
    fn test_default_routes_follow_provider_order() {
        let mut cfg = LlmConfig::default();
        cfg.providers[0].planner_model = Some("gemini-2.5-pro".into());

        let planning = cfg.candidates_for(TaskType::Planning);
        assert_eq!(planning[0], RouteTarget::new("gemini", "gemini-2.5-pro"));
        assert_eq!(planning[1], RouteTarget::new("openai", "gpt-4o-mini"));

        let summarize = cfg.candidates_for(TaskType::Summarize);
        assert_eq!(summarize[0], RouteTarget::new("gemini", "gemini-2.5-flash"));
    }

    #[test]
    fn test_explicit_route_wins() {
        let cfg: LlmConfig = toml::from_str(
            r#"
            [[routes]]
            task = "sentiment"
            candidates = [{ provider = "openai", model = "gpt-4o" }]
            "#,
        )
        .unwrap();

        assert_eq!(
            cfg.candidates_for(TaskType::Sentiment),
            vec![RouteTarget::new("openai", "gpt-4o")]
        );
        assert_eq!(cfg.candidates_for(TaskType::Compare).len(), 2);
    }
}
