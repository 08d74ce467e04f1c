use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Push state of one public-holiday day for one member's calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidayPushStatus {
    Pending,
    Success,
    Error,
}

impl fmt::Display for HolidayPushStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Per-member, per-holiday-day sync record, batched for calendar push.
///
/// Same pending/success/error/retry_count contract as
/// [`super::sync_log::RequestSyncLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicHolidayDaySyncStatus {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub member_id: Uuid,
    pub holiday_name: String,
    pub day: NaiveDate,
    pub tenant_id: Option<String>,
    pub status: HolidayPushStatus,
    pub external_event_id: Option<String>,
    pub error: Option<String>,
    pub retry_count: u32,
    pub updated_at: DateTime<Utc>,
}

/// One cached holiday-table combination to refresh
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HolidayCacheKey {
    pub year: i32,
    /// ISO 3166-1 alpha-2
    pub country_code: String,
    pub language: String,
}
