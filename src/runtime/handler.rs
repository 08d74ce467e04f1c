use std::time::Duration;

use async_trait::async_trait;

use super::event::Event;
use super::step::StepContext;
use crate::error::LeavecoreError;

/// What invokes a handler: one event name, or a cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Event(&'static str),
    Cron(&'static str),
}

/// Failure signal a handler raises toward the runtime.
///
/// The tag drives the retry decision; business logic never relies on the
/// runtime's exception conventions.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Provider-mandated backoff; always honored verbatim and never counted
    /// against the attempt budget
    #[error("retry after {0:?}")]
    RetryAfter(Duration),

    /// Ordinary failure; retried with the handler's backoff policy
    #[error("retryable: {0}")]
    Retryable(String),

    /// Never retried; surfaced for operator attention
    #[error("fatal: {0}")]
    Fatal(String),
}

impl HandlerError {
    pub fn retryable(msg: impl Into<String>) -> Self {
        Self::Retryable(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }
}

/// Malformed domain state (missing request, missing schedule) usually means
/// a race with a concurrent deletion and may resolve after a delay, so store
/// errors surface as retryable by default.
impl From<LeavecoreError> for HandlerError {
    fn from(err: LeavecoreError) -> Self {
        HandlerError::Retryable(err.to_string())
    }
}

/// A registered event or cron function.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Stable handler name, used for checkpoints, logs, and registries.
    fn name(&self) -> &'static str;

    /// What this handler subscribes to.
    fn trigger(&self) -> Trigger;

    /// Process one delivery. May be re-invoked after a crash or retry; all
    /// side effects must go through checkpointed steps or conditional writes.
    async fn handle(&self, event: Event, ctx: StepContext) -> Result<(), HandlerError>;
}
