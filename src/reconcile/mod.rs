//! # Batch Reconciliation Jobs
//!
//! Cron-triggered jobs that walk large entity sets (workspaces, members,
//! holiday-cache combinations) and fan each page out as its own follow-up
//! event instead of processing inline. Paging bounds memory; per-event
//! delivery lets the bus apply its concurrency and rate limits downstream.
//!
//! Every per-entity effect is an upsert or a conditional write, so a cron
//! tick that fires before the previous run's fan-out drains converges
//! instead of duplicating work.

pub mod fanout;
pub mod jobs;

pub use fanout::{fan_out, page_payloads, BatchPayload};
pub use jobs::{
    reconcile_registrations, CrmContactSyncBatchHandler, CrmContactSyncJob, CrmSyncItem,
    HolidayCache, HolidayCacheRefreshBatchHandler, HolidayCacheRefreshJob, HolidayPushBatchHandler,
    HolidayPushJob, ReconcileDeps, SubscriptionReconcileBatchHandler, SubscriptionReconcileJob,
};
