//! Shared fixtures and scripted collaborator doubles for the integration
//! tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use leavecore::billing::{BillingError, BillingProvider, ProrationPreview};
use leavecore::calendar::{
    CalendarApiError, CalendarEventPayload, CalendarProvider, SyncTarget, TokenInspector,
    TokenScopes,
};
use leavecore::crm::{CrmCompany, CrmContact, CrmError, CrmProvider};
use leavecore::models::{
    ApprovalPolicy, ApproverStatus, DayBoundary, HolidayCacheKey, LeaveUnit, Member,
    MembershipStatus, NotificationChannel, Request, RequestApprover, RequestDetails,
    RequestStatus, TimeFormat, Workspace, WorkspaceSchedule,
};
use leavecore::notification::{ChatCard, ChatMessenger, EmailMessage, Mailer, SendError};
use leavecore::reconcile::HolidayCache;

// --- fixtures ---------------------------------------------------------------

pub fn workspace() -> Workspace {
    Workspace {
        id: Uuid::new_v4(),
        name: "Acme".to_string(),
        default_timezone: "UTC".to_string(),
        schedule: WorkspaceSchedule::default(),
        outside_tracking_category: None,
    }
}

pub fn member_in(workspace_id: Uuid) -> Member {
    let id = Uuid::new_v4();
    Member {
        id,
        workspace_id,
        display_name: format!("member-{id}"),
        email: Some(format!("{id}@example.com")),
        email_verified: true,
        notification_channel: NotificationChannel::EmailAndChatBot,
        status: MembershipStatus::Active,
        locale: "en".to_string(),
        timezone: "UTC".to_string(),
        date_format: "%m/%d/%Y".to_string(),
        time_format: TimeFormat::Hour24,
        is_admin: false,
        tenant_id: Some("tenant-1".to_string()),
        external_user_id: Some(format!("ext-{id}")),
        chat_user_id: Some(format!("chat-{id}")),
        email_invite_opt_in: false,
    }
}

pub fn day_request(
    workspace_id: Uuid,
    requester: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Request {
    Request {
        id: Uuid::new_v4(),
        workspace_id,
        requester_member_id: requester,
        created_by_member_id: requester,
        start,
        end,
        start_at: DayBoundary::Morning,
        end_at: DayBoundary::EndOfDay,
        leave_unit: LeaveUnit::Days,
        status: RequestStatus::Pending,
        created_at: start,
        updated_at: start,
    }
}

pub fn july_request(workspace_id: Uuid, requester: Uuid) -> Request {
    day_request(
        workspace_id,
        requester,
        Utc.with_ymd_and_hms(2026, 7, 6, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2026, 7, 8, 0, 0, 0).unwrap(),
    )
}

pub fn details_for(request_id: Uuid, policy: ApprovalPolicy) -> RequestDetails {
    RequestDetails {
        request_id,
        leave_type_id: Uuid::new_v4(),
        leave_type_name: "Vacation".to_string(),
        reason: None,
        cancel_reason: None,
        duration_minutes: 3 * 8 * 60,
        approval_policy: policy,
    }
}

pub fn approver_step(
    request_id: Uuid,
    approver: Uuid,
    predecessor: Option<Uuid>,
    status: ApproverStatus,
) -> RequestApprover {
    RequestApprover {
        id: Uuid::new_v4(),
        request_details_id: request_id,
        approver_member_id: Some(approver),
        status,
        predecessor_approver_member_id: predecessor,
        decline_reason: None,
        reminder_sent_at: None,
        chat_message_id: None,
    }
}

// --- scripted calendar provider ---------------------------------------------

/// Calendar double with per-operation scripts. An empty script means every
/// call succeeds; each scripted entry is consumed in order.
#[derive(Default)]
pub struct MockCalendarProvider {
    create_script: Mutex<VecDeque<Result<String, CalendarApiError>>>,
    update_script: Mutex<VecDeque<Result<(), CalendarApiError>>>,
    delete_script: Mutex<VecDeque<Result<(), CalendarApiError>>>,
    pub calls: Mutex<Vec<String>>,
    next_id: AtomicU32,
}

impl MockCalendarProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_create(&self, result: Result<String, CalendarApiError>) {
        self.create_script.lock().push_back(result);
    }

    pub fn script_update(&self, result: Result<(), CalendarApiError>) {
        self.update_script.lock().push_back(result);
    }

    pub fn script_delete(&self, result: Result<(), CalendarApiError>) {
        self.delete_script.lock().push_back(result);
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == op).count()
    }
}

#[async_trait]
impl CalendarProvider for MockCalendarProvider {
    async fn create_event(
        &self,
        _target: &SyncTarget,
        _payload: &CalendarEventPayload,
    ) -> Result<String, CalendarApiError> {
        self.calls.lock().push("create".to_string());
        if let Some(scripted) = self.create_script.lock().pop_front() {
            return scripted;
        }
        Ok(format!("evt-{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn update_event(
        &self,
        _target: &SyncTarget,
        _external_id: &str,
        _payload: &CalendarEventPayload,
    ) -> Result<(), CalendarApiError> {
        self.calls.lock().push("update".to_string());
        self.update_script.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn delete_event(
        &self,
        _target: &SyncTarget,
        _external_id: &str,
    ) -> Result<(), CalendarApiError> {
        self.calls.lock().push("delete".to_string());
        self.delete_script.lock().pop_front().unwrap_or(Ok(()))
    }
}

/// Token inspector granting (or withholding) the calendar write scope.
pub struct StaticTokens {
    pub grant_write: bool,
}

#[async_trait]
impl TokenInspector for StaticTokens {
    async fn scopes_for(&self, _member: &Member) -> TokenScopes {
        if self.grant_write {
            TokenScopes::new(vec!["Calendars.ReadWrite".to_string()])
        } else {
            TokenScopes::new(Vec::new())
        }
    }
}

// --- recording notification channels ----------------------------------------

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), SendError> {
        self.sent.lock().push(message);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingChatMessenger {
    pub created: Mutex<Vec<ChatCard>>,
    pub updated: Mutex<Vec<(String, ChatCard)>>,
    next_id: AtomicU32,
}

#[async_trait]
impl ChatMessenger for RecordingChatMessenger {
    async fn send_card(&self, card: ChatCard) -> Result<String, SendError> {
        self.created.lock().push(card);
        Ok(format!("msg-{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn update_card(&self, message_id: &str, card: ChatCard) -> Result<(), SendError> {
        self.updated.lock().push((message_id.to_string(), card));
        Ok(())
    }
}

// --- billing / crm / holiday doubles ----------------------------------------

#[derive(Default)]
pub struct RecordingBilling {
    pub quantity_updates: Mutex<Vec<(String, u32)>>,
}

#[async_trait]
impl BillingProvider for RecordingBilling {
    async fn update_subscription_quantity(
        &self,
        provider_subscription_id: &str,
        quantity: u32,
    ) -> Result<(), BillingError> {
        self.quantity_updates
            .lock()
            .push((provider_subscription_id.to_string(), quantity));
        Ok(())
    }

    async fn preview_proration(
        &self,
        provider_subscription_id: &str,
        _quantity: u32,
    ) -> Result<ProrationPreview, BillingError> {
        Ok(ProrationPreview {
            proration_id: format!("pro-{provider_subscription_id}"),
            amount_cents: 0,
            currency: "EUR".to_string(),
        })
    }

    async fn apply_proration(
        &self,
        _provider_subscription_id: &str,
        _proration_id: &str,
    ) -> Result<(), BillingError> {
        Ok(())
    }

    async fn create_charge(
        &self,
        _provider_customer_id: &str,
        _amount_cents: i64,
        _currency: &str,
        _description: &str,
    ) -> Result<(), BillingError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingCrm {
    pub contacts: Mutex<Vec<CrmContact>>,
    pub deleted: Mutex<Vec<String>>,
    pub companies: Mutex<Vec<CrmCompany>>,
}

#[async_trait]
impl CrmProvider for RecordingCrm {
    async fn upsert_contact(&self, contact: &CrmContact) -> Result<(), CrmError> {
        self.contacts.lock().push(contact.clone());
        Ok(())
    }

    async fn delete_contact(&self, email: &str) -> Result<(), CrmError> {
        self.deleted.lock().push(email.to_string());
        Ok(())
    }

    async fn set_list_membership(
        &self,
        _email: &str,
        _list_id: &str,
        _member: bool,
    ) -> Result<(), CrmError> {
        Ok(())
    }

    async fn upsert_company(&self, company: &CrmCompany) -> Result<(), CrmError> {
        self.companies.lock().push(company.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingHolidayCache {
    pub refreshed: Mutex<Vec<HolidayCacheKey>>,
}

#[async_trait]
impl HolidayCache for RecordingHolidayCache {
    async fn refresh(&self, key: &HolidayCacheKey) -> leavecore::Result<usize> {
        self.refreshed.lock().push(key.clone());
        Ok(1)
    }
}
