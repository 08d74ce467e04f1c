//! In-memory store implementing every collaborator trait.
//!
//! Backs the integration tests and local runs; the conditional-write
//! semantics match what the real store enforces with row-level predicates.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{
    ApproverStore, HolidaySyncStore, MemberStore, RequestStore, SyncLogStore, WorkspaceStore,
};
use crate::error::Result;
use crate::models::{
    CalendarSyncSetting, HolidayPushStatus, Member, PublicHolidayDaySyncStatus, Request,
    RequestApprover, RequestDetails, RequestStatus, RequestSyncLog, Subscription, SyncStatus,
    Workspace,
};

#[derive(Default)]
struct Tables {
    requests: HashMap<Uuid, Request>,
    details: HashMap<Uuid, RequestDetails>,
    approvers: HashMap<Uuid, RequestApprover>,
    sync_logs: HashMap<Uuid, RequestSyncLog>,
    members: Vec<Member>,
    workspaces: HashMap<Uuid, Workspace>,
    subscriptions: HashMap<Uuid, Subscription>,
    sync_settings: HashMap<Uuid, CalendarSyncSetting>,
    holiday_syncs: HashMap<Uuid, PublicHolidayDaySyncStatus>,
}

/// Shared in-memory store; clone-cheap via interior locking.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_request(&self, request: Request) {
        self.tables.write().requests.insert(request.id, request);
    }

    pub fn insert_details(&self, details: RequestDetails) {
        self.tables
            .write()
            .details
            .insert(details.request_id, details);
    }

    pub fn insert_approver(&self, approver: RequestApprover) {
        self.tables.write().approvers.insert(approver.id, approver);
    }

    pub fn insert_member(&self, member: Member) {
        self.tables.write().members.push(member);
    }

    pub fn insert_workspace(&self, workspace: Workspace) {
        self.tables
            .write()
            .workspaces
            .insert(workspace.id, workspace);
    }

    pub fn insert_subscription(&self, subscription: Subscription) {
        self.tables
            .write()
            .subscriptions
            .insert(subscription.workspace_id, subscription);
    }

    pub fn insert_sync_setting(&self, setting: CalendarSyncSetting) {
        self.tables
            .write()
            .sync_settings
            .insert(setting.id, setting);
    }

    /// Seed N bare workspaces; returns their ids. Test convenience.
    pub fn seed_workspaces(&self, count: usize) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(count);
        let mut tables = self.tables.write();
        for i in 0..count {
            let id = Uuid::new_v4();
            tables.workspaces.insert(
                id,
                Workspace {
                    id,
                    name: format!("workspace-{i}"),
                    default_timezone: "UTC".to_string(),
                    schedule: Default::default(),
                    outside_tracking_category: None,
                },
            );
            ids.push(id);
        }
        ids
    }

    pub fn get_approver(&self, id: Uuid) -> Option<RequestApprover> {
        self.tables.read().approvers.get(&id).cloned()
    }

    pub fn get_sync_log(&self, id: Uuid) -> Option<RequestSyncLog> {
        self.tables.read().sync_logs.get(&id).cloned()
    }
}

#[async_trait]
impl RequestStore for InMemoryStore {
    async fn get_request(&self, id: Uuid) -> Result<Option<Request>> {
        Ok(self.tables.read().requests.get(&id).cloned())
    }

    async fn get_details(&self, request_id: Uuid) -> Result<Option<RequestDetails>> {
        Ok(self.tables.read().details.get(&request_id).cloned())
    }

    async fn set_status_if_open(&self, id: Uuid, status: RequestStatus) -> Result<bool> {
        let mut tables = self.tables.write();
        match tables.requests.get_mut(&id) {
            Some(request) if !request.status.is_terminal() => {
                request.status = status;
                request.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl ApproverStore for InMemoryStore {
    async fn list_for_request(&self, request_id: Uuid) -> Result<Vec<RequestApprover>> {
        let tables = self.tables.read();
        let details_id = match tables.details.get(&request_id) {
            Some(details) => details.request_id,
            None => return Ok(Vec::new()),
        };
        Ok(tables
            .approvers
            .values()
            .filter(|a| a.request_details_id == details_id)
            .cloned()
            .collect())
    }

    async fn set_chat_message_id_if_absent(
        &self,
        approver_id: Uuid,
        message_id: &str,
    ) -> Result<bool> {
        let mut tables = self.tables.write();
        match tables.approvers.get_mut(&approver_id) {
            Some(approver) if approver.chat_message_id.is_none() => {
                approver.chat_message_id = Some(message_id.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl SyncLogStore for InMemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<RequestSyncLog>> {
        Ok(self.tables.read().sync_logs.get(&id).cloned())
    }

    async fn find_for_request(&self, request_id: Uuid) -> Result<Vec<RequestSyncLog>> {
        Ok(self
            .tables
            .read()
            .sync_logs
            .values()
            .filter(|l| l.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn upsert(&self, log: RequestSyncLog) -> Result<()> {
        self.tables.write().sync_logs.insert(log.id, log);
        Ok(())
    }

    async fn record_synced(&self, id: Uuid, external_event_id: &str) -> Result<bool> {
        let mut tables = self.tables.write();
        match tables.sync_logs.get_mut(&id) {
            Some(log) if !log.status.is_settled() => {
                log.status = SyncStatus::Synced;
                log.external_event_id = Some(external_event_id.to_string());
                log.error = None;
                log.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_failure(&self, id: Uuid, error: &str) -> Result<u32> {
        let mut tables = self.tables.write();
        match tables.sync_logs.get_mut(&id) {
            Some(log) => {
                log.retry_count += 1;
                log.status = SyncStatus::Failed;
                log.error = Some(error.to_string());
                log.updated_at = Utc::now();
                Ok(log.retry_count)
            }
            None => Ok(0),
        }
    }

    async fn settle(&self, id: Uuid, status: SyncStatus) -> Result<bool> {
        let mut tables = self.tables.write();
        match tables.sync_logs.get_mut(&id) {
            Some(log) if log.status.can_settle_to(status) => {
                log.status = status;
                log.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl MemberStore for InMemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<Member>> {
        Ok(self
            .tables
            .read()
            .members
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn list_page(&self, offset: usize, limit: usize) -> Result<Vec<Member>> {
        Ok(self
            .tables
            .read()
            .members
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.tables.read().members.len())
    }

    async fn count_active_for_workspace(&self, workspace_id: Uuid) -> Result<u32> {
        Ok(self
            .tables
            .read()
            .members
            .iter()
            .filter(|m| m.workspace_id == workspace_id && m.is_active())
            .count() as u32)
    }
}

#[async_trait]
impl WorkspaceStore for InMemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<Workspace>> {
        Ok(self.tables.read().workspaces.get(&id).cloned())
    }

    async fn get_subscription(&self, workspace_id: Uuid) -> Result<Option<Subscription>> {
        Ok(self.tables.read().subscriptions.get(&workspace_id).cloned())
    }

    async fn get_sync_setting(&self, id: Uuid) -> Result<Option<CalendarSyncSetting>> {
        Ok(self.tables.read().sync_settings.get(&id).cloned())
    }

    async fn list_ids_page(&self, offset: usize, limit: usize) -> Result<Vec<Uuid>> {
        let tables = self.tables.read();
        let mut ids: Vec<Uuid> = tables.workspaces.keys().copied().collect();
        ids.sort();
        Ok(ids.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.tables.read().workspaces.len())
    }
}

#[async_trait]
impl HolidaySyncStore for InMemoryStore {
    async fn list_pending_page(&self, limit: usize) -> Result<Vec<PublicHolidayDaySyncStatus>> {
        Ok(self
            .tables
            .read()
            .holiday_syncs
            .values()
            .filter(|h| h.status == HolidayPushStatus::Pending)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn upsert(&self, record: PublicHolidayDaySyncStatus) -> Result<()> {
        let mut tables = self.tables.write();
        // Keyed on (member, day) so a re-run of the enumerating cron cannot
        // create duplicates.
        let existing = tables
            .holiday_syncs
            .values()
            .find(|h| h.member_id == record.member_id && h.day == record.day)
            .map(|h| h.id);
        let id = existing.unwrap_or(record.id);
        tables.holiday_syncs.insert(id, PublicHolidayDaySyncStatus { id, ..record });
        Ok(())
    }

    async fn record_push_result(
        &self,
        id: Uuid,
        status: HolidayPushStatus,
        external_event_id: Option<String>,
        error: Option<String>,
    ) -> Result<bool> {
        let mut tables = self.tables.write();
        match tables.holiday_syncs.get_mut(&id) {
            Some(record) if record.status == HolidayPushStatus::Pending => {
                if status == HolidayPushStatus::Error {
                    record.retry_count += 1;
                }
                record.status = status;
                record.external_event_id = external_event_id;
                record.error = error;
                record.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
