use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{CalendarSyncSetting, Member, Request, RequestDetails, SyncType};

/// Scopes granted to the decoded access token for the requester's tenant.
#[derive(Debug, Clone, Default)]
pub struct TokenScopes(Vec<String>);

impl TokenScopes {
    pub fn new(scopes: Vec<String>) -> Self {
        Self(scopes)
    }

    /// Whether the token may write the user's own calendar. Checked before
    /// the call is attempted; a missing scope means fall back, not fail.
    pub fn grants_calendar_write(&self) -> bool {
        self.0.iter().any(|s| s == "Calendars.ReadWrite")
    }
}

/// Resolved sync destination for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncTarget {
    /// Shared/group calendar from a workspace-level setting
    Shared { setting: CalendarSyncSetting },
    /// Requester's own calendar via their delegated token
    Native { tenant_id: String, user_id: String },
    /// Plain iCal invite mailed to the requester
    EmailInvite { email: String },
}

impl SyncTarget {
    pub fn sync_type(&self) -> SyncType {
        match self {
            Self::Shared { setting } => setting.sync_type,
            Self::Native { .. } => SyncType::NativeCalendar,
            Self::EmailInvite { .. } => SyncType::EmailInvite,
        }
    }

    /// Serialization key: all mutations for one tenant run one at a time.
    pub fn tenant_key(&self) -> Option<&str> {
        match self {
            Self::Shared { setting } => Some(&setting.tenant_id),
            Self::Native { tenant_id, .. } => Some(tenant_id),
            Self::EmailInvite { .. } => None,
        }
    }
}

/// Why a sync was not attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Setting excludes this leave type
    LeaveTypeExcluded,
    /// Setting only syncs approved requests
    StatusFiltered,
    /// No writable calendar and no email-invite opt-in
    NoViableTarget,
    /// Member carries no external identity to address
    MissingIdentity,
    /// Stored sync used a different target type than current settings
    /// require; the stale log stays, a fresh create is queued
    StaleTarget,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeaveTypeExcluded => write!(f, "leave type excluded by sync setting"),
            Self::StatusFiltered => write!(f, "request status filtered by sync setting"),
            Self::NoViableTarget => write!(f, "no viable sync target"),
            Self::MissingIdentity => write!(f, "member has no external identity"),
            Self::StaleTarget => write!(f, "stored sync target is stale"),
        }
    }
}

/// Decide where this request syncs to.
///
/// Precedence: a specified shared/group setting wins (subject to its
/// leave-type and only-approved filters); otherwise the requester's native
/// calendar when the tenant token grants write; otherwise an email invite
/// when opted in.
pub fn select_sync_target(
    request: &Request,
    details: &RequestDetails,
    member: &Member,
    setting: Option<&CalendarSyncSetting>,
    scopes: &TokenScopes,
) -> Result<SyncTarget, SkipReason> {
    if let Some(setting) = setting {
        if !setting.includes_leave_type(details.leave_type_id) {
            return Err(SkipReason::LeaveTypeExcluded);
        }
        if !setting.accepts_status(request.status) {
            return Err(SkipReason::StatusFiltered);
        }
        return Ok(SyncTarget::Shared {
            setting: setting.clone(),
        });
    }

    if scopes.grants_calendar_write() {
        match (&member.tenant_id, &member.external_user_id) {
            (Some(tenant_id), Some(user_id)) => {
                return Ok(SyncTarget::Native {
                    tenant_id: tenant_id.clone(),
                    user_id: user_id.clone(),
                });
            }
            _ => return Err(SkipReason::MissingIdentity),
        }
    }

    if member.email_invite_opt_in {
        if let Some(email) = &member.email {
            return Ok(SyncTarget::EmailInvite {
                email: email.clone(),
            });
        }
    }

    Err(SkipReason::NoViableTarget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ApprovalPolicy, DayBoundary, LeaveUnit, MembershipStatus, NotificationChannel,
        RequestStatus, TimeFormat,
    };
    use chrono::Utc;
    use uuid::Uuid;

    fn fixtures() -> (Request, RequestDetails, Member) {
        let now = Utc::now();
        let workspace_id = Uuid::new_v4();
        let request = Request {
            id: Uuid::new_v4(),
            workspace_id,
            requester_member_id: Uuid::new_v4(),
            created_by_member_id: Uuid::new_v4(),
            start: now,
            end: now,
            start_at: DayBoundary::Morning,
            end_at: DayBoundary::EndOfDay,
            leave_unit: LeaveUnit::Days,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        let details = RequestDetails {
            request_id: request.id,
            leave_type_id: Uuid::new_v4(),
            leave_type_name: "Vacation".to_string(),
            reason: None,
            cancel_reason: None,
            duration_minutes: 480,
            approval_policy: ApprovalPolicy::LinearAllHaveToAgree,
        };
        let member = Member {
            id: request.requester_member_id,
            workspace_id,
            display_name: "Ada".to_string(),
            email: Some("ada@example.com".to_string()),
            email_verified: true,
            notification_channel: NotificationChannel::Email,
            status: MembershipStatus::Active,
            locale: "en".to_string(),
            timezone: "Europe/Berlin".to_string(),
            date_format: "%m/%d/%Y".to_string(),
            time_format: TimeFormat::Hour12,
            is_admin: false,
            tenant_id: Some("tenant-1".to_string()),
            external_user_id: Some("user-1".to_string()),
            chat_user_id: None,
            email_invite_opt_in: false,
        };
        (request, details, member)
    }

    fn setting(only_approved: bool) -> CalendarSyncSetting {
        CalendarSyncSetting {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            name: "Shared".to_string(),
            sync_type: crate::models::SyncType::SharedCalendar,
            tenant_id: "tenant-1".to_string(),
            calendar_id: "cal-1".to_string(),
            leave_type_ids: vec![],
            only_approved,
            token_member_id: None,
        }
    }

    #[test]
    fn test_shared_setting_takes_precedence() {
        let (request, details, member) = fixtures();
        let scopes = TokenScopes::new(vec!["Calendars.ReadWrite".to_string()]);
        let target =
            select_sync_target(&request, &details, &member, Some(&setting(false)), &scopes)
                .unwrap();
        assert!(matches!(target, SyncTarget::Shared { .. }));
    }

    #[test]
    fn test_only_approved_filters_pending_request() {
        let (request, details, member) = fixtures();
        let result = select_sync_target(
            &request,
            &details,
            &member,
            Some(&setting(true)),
            &TokenScopes::default(),
        );
        assert_eq!(result.unwrap_err(), SkipReason::StatusFiltered);
    }

    #[test]
    fn test_native_when_scope_granted() {
        let (request, details, member) = fixtures();
        let scopes = TokenScopes::new(vec!["Calendars.ReadWrite".to_string()]);
        let target = select_sync_target(&request, &details, &member, None, &scopes).unwrap();
        assert_eq!(
            target,
            SyncTarget::Native {
                tenant_id: "tenant-1".to_string(),
                user_id: "user-1".to_string()
            }
        );
    }

    #[test]
    fn test_missing_scope_falls_back_to_email_invite() {
        let (request, details, mut member) = fixtures();
        member.email_invite_opt_in = true;
        let target =
            select_sync_target(&request, &details, &member, None, &TokenScopes::default())
                .unwrap();
        assert!(matches!(target, SyncTarget::EmailInvite { .. }));
    }

    #[test]
    fn test_no_target_at_all() {
        let (request, details, member) = fixtures();
        let result =
            select_sync_target(&request, &details, &member, None, &TokenScopes::default());
        assert_eq!(result.unwrap_err(), SkipReason::NoViableTarget);
    }
}
