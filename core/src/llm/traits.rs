use async_trait::async_trait;

use crate::error::ProviderError;

use super::types::{LlmRequest, TaskType};

/// A concrete model API.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Whether an API key (or equivalent) is configured. Providers without
    /// credentials are skipped by the router without being called.
    fn has_credentials(&self) -> bool;

    async fn complete(
        &self,
        model: &str,
        request: &LlmRequest,
        task_type: TaskType,
    ) -> Result<String, ProviderError>;
}
