use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Which external calendar a request was pushed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    /// Requester's own calendar via a delegated user token
    NativeCalendar,
    /// Shared calendar via an app-level token
    SharedCalendar,
    /// Group calendar via an app-level token
    GroupCalendar,
    /// Plain iCal invite mailed to the requester
    EmailInvite,
}

/// Outcome state of one (request, sync target) pair.
///
/// Transitions are one-directional except `Failed`, which a later retry may
/// replace with a fresh create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    Skipped,
    Failed,
    Removed,
}

impl SyncStatus {
    /// States no further sync work should touch.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Synced | Self::Skipped | Self::Removed)
    }

    /// Legal settle transitions: a synced event can still be removed;
    /// skipped and removed rows never move again.
    pub fn can_settle_to(&self, next: SyncStatus) -> bool {
        match self {
            Self::Failed => next.is_settled(),
            Self::Synced => matches!(next, Self::Removed),
            Self::Skipped | Self::Removed => false,
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synced => write!(f, "synced"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

/// Durable record of one sync attempt against one external calendar target.
///
/// These rows are the contract other jobs poll and filter on: what was
/// pushed where, and what to do next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSyncLog {
    pub id: Uuid,
    pub request_id: Uuid,
    pub sync_type: SyncType,
    pub status: SyncStatus,
    /// Event id issued by the calendar provider on create
    pub external_event_id: Option<String>,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub calendar_id: Option<String>,
    /// Shared/group calendar configuration this row belongs to, if any
    pub calendar_sync_setting_id: Option<Uuid>,
    pub error: Option<String>,
    /// Ordinary failures recorded so far; rate limits are never counted
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RequestSyncLog {
    pub fn new(request_id: Uuid, sync_type: SyncType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            request_id,
            sync_type,
            status: SyncStatus::Failed,
            external_event_id: None,
            tenant_id: None,
            user_id: None,
            calendar_id: None,
            calendar_sync_setting_id: None,
            error: None,
            retry_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settled_statuses() {
        assert!(SyncStatus::Synced.is_settled());
        assert!(SyncStatus::Skipped.is_settled());
        assert!(SyncStatus::Removed.is_settled());
        assert!(!SyncStatus::Failed.is_settled());
    }

    #[test]
    fn test_settle_transitions() {
        assert!(SyncStatus::Failed.can_settle_to(SyncStatus::Synced));
        assert!(SyncStatus::Failed.can_settle_to(SyncStatus::Removed));
        assert!(SyncStatus::Synced.can_settle_to(SyncStatus::Removed));
        assert!(!SyncStatus::Synced.can_settle_to(SyncStatus::Skipped));
        assert!(!SyncStatus::Removed.can_settle_to(SyncStatus::Synced));
        assert!(!SyncStatus::Skipped.can_settle_to(SyncStatus::Removed));
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&SyncStatus::Removed).unwrap();
        assert_eq!(json, "\"removed\"");
    }
}
