//! Per-file retry policy.
//!
//! Attempt `k` (1-based) that fails waits `initial_delay * 2^(k-1)` before
//! attempt `k + 1`. The final attempt never sleeps.

use crate::config::SyncConfig;
use backon::ExponentialBuilder;
use std::time::Duration;

/// Retry configuration for a single upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait after the first failed attempt.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.retry_attempts,
            Duration::from_millis(config.retry_delay_ms),
        )
    }

    /// Delay slept after failed attempt `attempt` (1-based), if another follows.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.max_attempts {
            return None;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        Some(self.initial_delay.saturating_mul(factor))
    }

    /// Exponential backoff without jitter, capped at the last scheduled delay.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let retries = self.max_attempts.saturating_sub(1);
        let max_delay = self
            .delay_after(retries)
            .unwrap_or(self.initial_delay);

        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(max_delay)
            .with_factor(2.0)
            .with_max_times(retries as usize)
    }
}
