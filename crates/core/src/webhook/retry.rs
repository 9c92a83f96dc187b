//! Retry schedule for failed webhook deliveries.

use chrono::{DateTime, TimeDelta, Utc};
use mentorledger_shared::config::WebhookConfig;

/// Exponential backoff with a cap and a retry limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failures after which the event is left for manual handling.
    pub max_retries: u32,
    /// Delay after the first failure, in seconds.
    pub base_secs: u64,
    /// Longest delay, in seconds.
    pub cap_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&WebhookConfig::default())
    }
}

impl RetryPolicy {
    /// Builds the policy from configuration.
    #[must_use]
    pub fn from_config(config: &WebhookConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_secs: config.backoff_base_secs,
            cap_secs: config.backoff_cap_secs,
        }
    }

    /// Delay before the next attempt after `retry_count` failures.
    ///
    /// `base * 2^(retry_count - 1)`, capped.
    #[must_use]
    pub fn delay(&self, retry_count: u32) -> TimeDelta {
        let exponent = retry_count.saturating_sub(1).min(32);
        let secs = self
            .base_secs
            .saturating_mul(1u64 << exponent)
            .min(self.cap_secs);
        i64::try_from(secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    /// Earliest time the event may be attempted again.
    #[must_use]
    pub fn next_attempt_at(&self, now: DateTime<Utc>, retry_count: u32) -> DateTime<Utc> {
        now.checked_add_signed(self.delay(retry_count))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Returns true once no further attempts should be made.
    #[must_use]
    pub fn is_exhausted(&self, retry_count: u32) -> bool {
        retry_count >= self.max_retries
    }
}
