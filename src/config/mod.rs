//! # Leavecore Configuration System
//!
//! Explicit, validated configuration for the orchestration core. All tunable
//! behavior (retry/backoff, sync thresholds, batch sizes, runtime limits)
//! comes from one root structure with environment-aware loading; no hidden
//! fallbacks scattered through the modules.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use leavecore::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let poison_threshold = manager.config().calendar_sync.max_attempts;
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::limits;
use crate::error::{LeavecoreError, Result};

pub use loader::ConfigManager;

/// Root configuration structure for the orchestration core
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LeavecoreConfig {
    /// Event runtime settings (channel capacity, handler limits)
    pub runtime: RuntimeConfig,

    /// Retry and backoff configuration for ordinary failures
    pub backoff: BackoffConfig,

    /// Calendar sync orchestrator settings
    pub calendar_sync: CalendarSyncConfig,

    /// Notification dispatcher settings
    pub notification: NotificationConfig,

    /// Batch reconciliation settings
    pub batch: BatchConfig,
}

/// Event runtime configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuntimeConfig {
    /// Broadcast channel capacity for the in-process bus
    pub event_channel_capacity: usize,

    /// Upper bound on retry attempts when a handler has no explicit policy
    pub default_max_attempts: u32,
}

/// Exponential backoff configuration shared by the runtime and jobs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackoffConfig {
    /// Delay ladder applied per attempt; the last entry repeats
    pub default_backoff_seconds: Vec<u64>,
    /// Hard ceiling regardless of ladder or multiplier
    pub max_backoff_seconds: u64,
    /// Multiplier applied past the end of the ladder
    pub backoff_multiplier: f64,
}

impl BackoffConfig {
    /// Delay before the given (1-based) retry attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let idx = attempt.saturating_sub(1) as usize;
        let seconds = match self.default_backoff_seconds.get(idx) {
            Some(s) => *s,
            None => {
                let last = self.default_backoff_seconds.last().copied().unwrap_or(1);
                let overflow = (idx + 1 - self.default_backoff_seconds.len()) as i32;
                let scaled = (last as f64) * self.backoff_multiplier.powi(overflow);
                scaled.min(self.max_backoff_seconds as f64) as u64
            }
        };
        Duration::from_secs(seconds.min(self.max_backoff_seconds))
    }
}

/// Calendar sync orchestrator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CalendarSyncConfig {
    /// Ordinary failures tolerated per sync target before terminal Failed
    pub max_attempts: u32,

    /// Backoff applied when a 429 carries no Retry-After header
    pub default_retry_after_ms: u64,
}

impl CalendarSyncConfig {
    pub fn default_retry_after(&self) -> Duration {
        Duration::from_millis(self.default_retry_after_ms)
    }
}

/// Notification dispatcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    /// Default locale when a member carries none
    pub default_locale: String,

    /// Translation namespace used for lifecycle mails and cards
    pub namespace: String,
}

/// Batch reconciliation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Page size for workspace enumeration fan-out
    pub workspace_batch_size: usize,

    /// Page size for member/contact enumeration fan-out
    pub member_batch_size: usize,

    /// Page size for holiday-day push batches
    pub holiday_batch_size: usize,
}

impl Default for LeavecoreConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig {
                event_channel_capacity: 1000,
                default_max_attempts: 4,
            },
            backoff: BackoffConfig {
                // Webhook delivery profile: 1 minute doubling to 8 hours.
                default_backoff_seconds: vec![60, 120, 240, 480, 960],
                max_backoff_seconds: 28_800,
                backoff_multiplier: 2.0,
            },
            calendar_sync: CalendarSyncConfig {
                max_attempts: limits::MAX_SYNC_ATTEMPTS,
                default_retry_after_ms: limits::DEFAULT_RETRY_AFTER_MS,
            },
            notification: NotificationConfig {
                default_locale: "en".to_string(),
                namespace: "mails".to_string(),
            },
            batch: BatchConfig {
                workspace_batch_size: limits::DEFAULT_BATCH_SIZE,
                member_batch_size: 500,
                holiday_batch_size: 50,
            },
        }
    }
}

impl LeavecoreConfig {
    /// Validate invariants that the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.runtime.event_channel_capacity == 0 {
            return Err(LeavecoreError::ConfigurationError(
                "runtime.event_channel_capacity must be positive".to_string(),
            ));
        }
        if self.backoff.default_backoff_seconds.is_empty() {
            return Err(LeavecoreError::ConfigurationError(
                "backoff.default_backoff_seconds must not be empty".to_string(),
            ));
        }
        if self.backoff.backoff_multiplier < 1.0 {
            return Err(LeavecoreError::ConfigurationError(
                "backoff.backoff_multiplier must be >= 1.0".to_string(),
            ));
        }
        if self.calendar_sync.max_attempts == 0 {
            return Err(LeavecoreError::ConfigurationError(
                "calendar_sync.max_attempts must be positive".to_string(),
            ));
        }
        for (name, size) in [
            ("workspace_batch_size", self.batch.workspace_batch_size),
            ("member_batch_size", self.batch.member_batch_size),
            ("holiday_batch_size", self.batch.holiday_batch_size),
        ] {
            if size == 0 {
                return Err(LeavecoreError::ConfigurationError(format!(
                    "batch.{name} must be positive"
                )));
            }
        }
        Ok(())
    }
}
