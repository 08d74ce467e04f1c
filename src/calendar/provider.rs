use std::time::Duration;

use async_trait::async_trait;

use super::payload::CalendarEventPayload;
use super::target::SyncTarget;

/// Error contract of the calendar provider.
///
/// Only what the orchestration logic depends on: status classes and
/// retry-after semantics, no SDK wire formats.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CalendarApiError {
    /// HTTP 429; `retry_after` is the parsed Retry-After header when present
    #[error("rate limited by calendar provider")]
    RateLimited { retry_after: Option<Duration> },

    /// HTTP 404 on the addressed event
    #[error("calendar event not found")]
    NotFound,

    /// Token lacks the required scope for this calendar
    #[error("insufficient calendar permissions: {0}")]
    Forbidden(String),

    /// Any other provider response
    #[error("calendar api error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Calendar write capability, authenticated per tenant.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Create an event; returns the provider-issued event id.
    async fn create_event(
        &self,
        target: &SyncTarget,
        payload: &CalendarEventPayload,
    ) -> Result<String, CalendarApiError>;

    /// Patch a previously created event in place.
    async fn update_event(
        &self,
        target: &SyncTarget,
        external_id: &str,
        payload: &CalendarEventPayload,
    ) -> Result<(), CalendarApiError>;

    async fn delete_event(
        &self,
        target: &SyncTarget,
        external_id: &str,
    ) -> Result<(), CalendarApiError>;

    /// Batch create: one sub-request per payload, per-item status in the
    /// returned vec. The default falls back to sequential single creates for
    /// providers without a batch endpoint.
    async fn create_events(
        &self,
        target: &SyncTarget,
        payloads: &[CalendarEventPayload],
    ) -> Result<Vec<Result<String, CalendarApiError>>, CalendarApiError> {
        let mut results = Vec::with_capacity(payloads.len());
        for payload in payloads {
            results.push(self.create_event(target, payload).await);
        }
        Ok(results)
    }
}
