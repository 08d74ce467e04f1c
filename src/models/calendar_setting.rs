use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::request::RequestStatus;
use super::sync_log::SyncType;

/// Shared or group calendar target configuration for a workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSyncSetting {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    /// Shared vs group calendar; never a native or email target
    pub sync_type: SyncType,
    pub tenant_id: String,
    pub calendar_id: String,
    /// Leave types that sync to this calendar; empty means all
    pub leave_type_ids: Vec<Uuid>,
    /// Only push requests that have reached Approved
    pub only_approved: bool,
    /// Member whose delegated token is used instead of the app token
    pub token_member_id: Option<Uuid>,
}

impl CalendarSyncSetting {
    /// Whether this setting accepts the given leave type.
    pub fn includes_leave_type(&self, leave_type_id: Uuid) -> bool {
        self.leave_type_ids.is_empty() || self.leave_type_ids.contains(&leave_type_id)
    }

    /// Whether this setting accepts a request in the given status.
    pub fn accepts_status(&self, status: RequestStatus) -> bool {
        !self.only_approved || status == RequestStatus::Approved
    }
}
