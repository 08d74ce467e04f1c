//! # Calendar Sync Orchestrator
//!
//! Pushes leave requests into external calendars: the requester's native
//! calendar via a delegated token, a shared/group calendar via an app token,
//! or a plain iCal invite as the fallback. Every attempt is recorded as a
//! [`crate::models::RequestSyncLog`] row, which is the durable record other
//! jobs poll: what was pushed where, and what to do next.
//!
//! Rate limiting from the provider is a scheduling signal, not a failure:
//! it propagates as [`SyncOutcome::RateLimited`] carrying the mandatory
//! backoff, and never counts toward the poison-pill threshold.
//!
//! All calendar mutations for a single external tenant are serialized; the
//! bus registrations in [`handlers`] apply a per-tenant concurrency key.

pub mod handlers;
pub mod orchestrator;
pub mod payload;
pub mod provider;
pub mod target;

use std::time::Duration;

pub use handlers::{
    sync_registrations, SyncCreateHandler, SyncDeleteHandler, SyncHandlerDeps, SyncUpdateHandler,
    TokenInspector,
};
pub use orchestrator::CalendarSyncOrchestrator;
pub use payload::{occurrence_window, CalendarEventPayload, EventDateTime, ShowAs, TimeWindow};
pub use provider::{CalendarApiError, CalendarProvider};
pub use target::{select_sync_target, SkipReason, SyncTarget, TokenScopes};

/// Outcome of one sync operation against one target.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Push succeeded; for deletes the log row settles to Removed and the
    /// carried id is the one that was removed
    Synced { external_id: String },
    /// Nothing to do for this target
    Skipped { reason: SkipReason },
    /// Ordinary failure, recorded against the retry budget; `terminal` is
    /// set once the budget is exhausted and the row must not be retried
    Failed { error: String, terminal: bool },
    /// Provider asked us to come back later; reschedule, don't count
    RateLimited { retry_after: Duration },
}
