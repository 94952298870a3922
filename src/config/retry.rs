use std::time::Duration;

use serde::Deserialize;

/// Basic retry policy template
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct BackoffPolicy {
    /// Maximum number of retries (0 means unlimited retries)
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Backoff base (unit: milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum backoff time (unit: milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

/// Divide strategies by business domain
#[derive(Debug, Deserialize, Clone)]
pub struct RetryPolicies {
    /// Conflict retry for remote updates (field writes and commits)
    #[serde(default)]
    pub update: BackoffPolicy,

    /// Watch resubscription after a failed or terminated subscription
    #[serde(default)]
    pub watch: BackoffPolicy,
}

impl BackoffPolicy {
    /// Whether another attempt is allowed after `attempts` failures.
    pub fn should_retry(
        &self,
        attempts: usize,
    ) -> bool {
        self.max_retries == 0 || attempts < self.max_retries
    }

    /// Delay before attempt number `attempt` (1-based): base delay doubled
    /// per attempt, capped at the configured maximum.
    pub fn delay_for(
        &self,
        attempt: usize,
    ) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as u32;
        let delay = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

// Default value implementation
impl Default for RetryPolicies {
    fn default() -> Self {
        Self {
            update: BackoffPolicy {
                max_retries: 3,
                base_delay_ms: 50,
                max_delay_ms: 1000,
            },
            watch: BackoffPolicy {
                max_retries: 0,
                base_delay_ms: 500,
                max_delay_ms: 30000,
            },
        }
    }
}

fn default_max_retries() -> usize {
    3
}
fn default_base_delay_ms() -> u64 {
    50
}
fn default_max_delay_ms() -> u64 {
    1000
}
