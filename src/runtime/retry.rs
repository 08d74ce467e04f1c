use std::time::Duration;

use crate::config::BackoffConfig;

/// Retry policy for one handler registration.
///
/// `RetryAfter` signals bypass this policy entirely: they are honored
/// verbatim and never consume an attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: BackoffConfig,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: BackoffConfig) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// No retries at all; first ordinary failure is terminal.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: BackoffConfig {
                default_backoff_seconds: vec![0],
                max_backoff_seconds: 0,
                backoff_multiplier: 1.0,
            },
        }
    }

    /// Webhook delivery profile: exponential from one minute up to a ceiling
    /// of eight hours, then terminal.
    pub fn webhook() -> Self {
        Self {
            max_attempts: 10,
            backoff: BackoffConfig {
                default_backoff_seconds: vec![60],
                max_backoff_seconds: 28_800,
                backoff_multiplier: 2.0,
            },
        }
    }

    /// Delay before the next attempt, given the attempt that just failed.
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        self.backoff.delay_for_attempt(failed_attempt)
    }

    pub fn attempts_remaining(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff: BackoffConfig {
                default_backoff_seconds: vec![1, 2, 4, 8, 16, 32],
                max_backoff_seconds: 300,
                backoff_multiplier: 2.0,
            },
        }
    }
}
