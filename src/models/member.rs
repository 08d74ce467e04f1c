use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a member wants to be notified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    ChatBot,
    EmailAndChatBot,
}

impl NotificationChannel {
    pub fn wants_email(&self) -> bool {
        matches!(self, Self::Email | Self::EmailAndChatBot)
    }

    pub fn wants_chat(&self) -> bool {
        matches!(self, Self::ChatBot | Self::EmailAndChatBot)
    }
}

/// Clock rendering preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    Hour12,
    Hour24,
}

/// Membership lifecycle within a workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Active,
    Inactive,
    Archived,
}

/// Workspace user, reduced to the attributes the orchestration core reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub display_name: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub notification_channel: NotificationChannel,
    pub status: MembershipStatus,
    /// BCP 47 tag, e.g. "en" or "de"
    pub locale: String,
    /// IANA zone name, e.g. "Europe/Berlin"
    pub timezone: String,
    /// chrono-style date pattern, e.g. "%m/%d/%Y"
    pub date_format: String,
    pub time_format: TimeFormat,
    pub is_admin: bool,
    /// External identity: directory tenant the member belongs to
    pub tenant_id: Option<String>,
    /// External identity: directory user id
    pub external_user_id: Option<String>,
    /// Chat identity issued by the messenger integration
    pub chat_user_id: Option<String>,
    /// Opted in to plain iCal invites when no calendar write is possible
    pub email_invite_opt_in: bool,
}

impl Member {
    /// Guard-clause input: a member we can address at all.
    pub fn has_verified_email(&self) -> bool {
        self.email_verified && self.email.is_some()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, MembershipStatus::Active)
    }
}
