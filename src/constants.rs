//! # System Constants
//!
//! Event names, cron expressions, and operational boundaries of the
//! leave-management orchestration core.
//!
//! Event names are stable, dot-namespaced strings: handlers subscribe to
//! exactly one of them (or to a cron expression) and receive the raw JSON
//! payload plus durable step primitives.

/// Lifecycle and orchestration events that flow through the event bus
pub mod events {
    // Request lifecycle events
    pub const REQUEST_CREATED: &str = "request.created";
    pub const REQUEST_CREATED_ON_BEHALF: &str = "request.created_on_behalf";
    pub const REQUEST_APPROVED: &str = "request.approved";
    pub const REQUEST_DECLINED: &str = "request.declined";
    pub const REQUEST_CANCELED: &str = "request.canceled";
    pub const REQUEST_APPROVAL_NEEDED: &str = "request.approval_needed";

    // Calendar sync events
    pub const CALENDAR_SYNC_CREATE: &str = "calendar.sync_create_requested";
    pub const CALENDAR_SYNC_UPDATE: &str = "calendar.sync_update_requested";
    pub const CALENDAR_SYNC_DELETE: &str = "calendar.sync_delete_requested";

    // Batch reconciliation fan-out events
    pub const SUBSCRIPTION_RECONCILE_BATCH: &str = "billing.subscription_reconcile_batch";
    pub const HOLIDAY_CACHE_REFRESH_BATCH: &str = "holiday.cache_refresh_batch";
    pub const HOLIDAY_PUSH_BATCH: &str = "holiday.calendar_push_batch";
    pub const CRM_CONTACT_SYNC_BATCH: &str = "crm.contact_sync_batch";

    // Group archival (superseded by a settings change mid-flight)
    pub const GROUP_ARCHIVE_REQUESTED: &str = "group.archive_requested";
    pub const GROUP_ARCHIVE_SETTING_CHANGED: &str = "group.archive_setting_changed";
}

/// Cron schedules for the periodic reconciliation jobs
pub mod cron {
    pub const SUBSCRIPTION_RECONCILE: &str = "0 3 * * *";
    pub const HOLIDAY_CACHE_REFRESH: &str = "0 4 * * 0";
    pub const HOLIDAY_PUSH: &str = "0 5 * * *";
    pub const CRM_CONTACT_SYNC: &str = "30 2 * * *";
}

/// Operational boundaries shared across modules
pub mod limits {
    /// Ordinary (non-rate-limit) failures tolerated per sync target before
    /// the orchestrator records a terminal failure and stops retrying.
    pub const MAX_SYNC_ATTEMPTS: u32 = 5;

    /// Backoff applied when a 429 response carries no Retry-After header.
    pub const DEFAULT_RETRY_AFTER_MS: u64 = 5_000;

    /// Default page size for batch reconciliation fan-out.
    pub const DEFAULT_BATCH_SIZE: usize = 1_000;
}
