use std::time::Duration;

use scout_core::api::{RetryConfig, RetryStrategy};

/// `attempt` counts the calls already made, starting at 1.
pub struct ExponentialBackoffStrategy {
    config: RetryConfig,
}

pub struct LinearRetryStrategy {
    config: RetryConfig,
}

impl ExponentialBackoffStrategy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl LinearRetryStrategy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

/// Auth and quota-exhaustion messages will not improve with a retry.
fn is_fatal(error: &str) -> bool {
    let lower = error.to_ascii_lowercase();
    lower.contains("api key") || lower.contains("insufficient_quota")
}

impl RetryStrategy for ExponentialBackoffStrategy {
    fn name(&self) -> &str {
        "exponential-backoff"
    }

    fn next_delay(&self, attempt: u32, _error: &str) -> Option<Duration> {
        if attempt >= self.config.max_attempts {
            return None;
        }
        let exp = 1u64 << attempt.saturating_sub(1).min(30);
        let delay = self.config.base_delay_ms.saturating_mul(exp);
        let delay = delay.min(self.config.max_delay_ms);
        Some(Duration::from_millis(delay))
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    fn is_fatal_error(&self, error: &str) -> bool {
        is_fatal(error)
    }
}

impl RetryStrategy for LinearRetryStrategy {
    fn name(&self) -> &str {
        "linear"
    }

    fn next_delay(&self, attempt: u32, _error: &str) -> Option<Duration> {
        if attempt >= self.config.max_attempts {
            return None;
        }
        let delay = self.config.base_delay_ms.saturating_mul(attempt.max(1) as u64);
        let delay = delay.min(self.config.max_delay_ms);
        Some(Duration::from_millis(delay))
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    fn is_fatal_error(&self, error: &str) -> bool {
        is_fatal(error)
    }
}
