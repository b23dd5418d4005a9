use std::fmt;

use serde::{Deserialize, Serialize};

/// Kinds of model work the router knows how to route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Planning,
    Summarize,
    Sentiment,
    Compare,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [
        TaskType::Planning,
        TaskType::Summarize,
        TaskType::Sentiment,
        TaskType::Compare,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Summarize => "summarize",
            Self::Sentiment => "sentiment",
            Self::Compare => "compare",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provider/model pair in a route.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteTarget {
    pub provider: String,
    pub model: String,
}

impl RouteTarget {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider for a JSON object response when it supports it.
    pub json_output: bool,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: 0.3,
            max_tokens: 8192,
            json_output: false,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn json(mut self) -> Self {
        self.json_output = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Skipped without a call: provider missing or no credentials.
    Unavailable(String),
    Transient(String),
    Permanent(String),
}

/// A candidate the router tried (or skipped) before the final answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteAttempt {
    pub provider: String,
    pub model: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelResponse {
    pub provider: String,
    pub model: String,
    pub text: String,
    pub elapsed_ms: u64,
    /// Failed or skipped attempts that preceded this response.
    pub attempts: Vec<RouteAttempt>,
}
