//! # Persistence Collaborator Traits
//!
//! The relational store is an external collaborator; the orchestration core
//! consumes it through these traits with defined selection shapes. Every
//! mutating method with a `bool` return is a conditional write ("only update
//! if not already settled") so handlers tolerate concurrent and duplicate
//! event delivery.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    CalendarSyncSetting, HolidayPushStatus, Member, PublicHolidayDaySyncStatus, Request,
    RequestApprover, RequestDetails, RequestStatus, RequestSyncLog, Subscription, SyncStatus,
    Workspace,
};

pub use memory::InMemoryStore;

/// Read/write access to requests and their details
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn get_request(&self, id: Uuid) -> Result<Option<Request>>;
    async fn get_details(&self, request_id: Uuid) -> Result<Option<RequestDetails>>;

    /// Conditional transition; returns false when the request is already in a
    /// terminal state (lost race with a concurrent transition).
    async fn set_status_if_open(&self, id: Uuid, status: RequestStatus) -> Result<bool>;
}

/// Read/write access to approval steps
#[async_trait]
pub trait ApproverStore: Send + Sync {
    async fn list_for_request(&self, request_id: Uuid) -> Result<Vec<RequestApprover>>;

    /// Persist the messenger-issued card id, but only on first send; returns
    /// false when an id is already stored (duplicate delivery).
    async fn set_chat_message_id_if_absent(&self, approver_id: Uuid, message_id: &str)
        -> Result<bool>;
}

/// Read/write access to request sync logs
#[async_trait]
pub trait SyncLogStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<RequestSyncLog>>;
    async fn find_for_request(&self, request_id: Uuid) -> Result<Vec<RequestSyncLog>>;
    async fn upsert(&self, log: RequestSyncLog) -> Result<()>;

    /// Record a successful push; no-op (false) when the row is already settled.
    async fn record_synced(&self, id: Uuid, external_event_id: &str) -> Result<bool>;

    /// Record an ordinary failure and return the updated retry count.
    async fn record_failure(&self, id: Uuid, error: &str) -> Result<u32>;

    /// One-way transition into the given settled status.
    async fn settle(&self, id: Uuid, status: SyncStatus) -> Result<bool>;
}

/// Read access to members, paged for batch fan-out
#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Member>>;
    async fn list_page(&self, offset: usize, limit: usize) -> Result<Vec<Member>>;
    async fn count(&self) -> Result<usize>;

    /// Active member count for one workspace, the seat quantity reported to
    /// billing.
    async fn count_active_for_workspace(&self, workspace_id: Uuid) -> Result<u32>;
}

/// Read access to workspaces, subscriptions, and sync settings
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Workspace>>;
    async fn get_subscription(&self, workspace_id: Uuid) -> Result<Option<Subscription>>;
    async fn get_sync_setting(&self, id: Uuid) -> Result<Option<CalendarSyncSetting>>;
    async fn list_ids_page(&self, offset: usize, limit: usize) -> Result<Vec<Uuid>>;
    async fn count(&self) -> Result<usize>;
}

/// Read/write access to public-holiday push records
#[async_trait]
pub trait HolidaySyncStore: Send + Sync {
    async fn list_pending_page(&self, limit: usize) -> Result<Vec<PublicHolidayDaySyncStatus>>;

    /// Insert-or-replace keyed on (member, day); overlapping cron runs are
    /// safe because a second upsert of the same day is a no-op.
    async fn upsert(&self, record: PublicHolidayDaySyncStatus) -> Result<()>;

    /// Conditional result recording; false when the row already left Pending.
    async fn record_push_result(
        &self,
        id: Uuid,
        status: HolidayPushStatus,
        external_event_id: Option<String>,
        error: Option<String>,
    ) -> Result<bool>;
}
