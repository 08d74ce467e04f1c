use std::collections::HashMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::fanout::{fan_out, BatchPayload};
use crate::billing::BillingProvider;
use crate::calendar::{
    CalendarApiError, CalendarEventPayload, CalendarProvider, EventDateTime, ShowAs, SyncTarget,
};
use crate::config::BatchConfig;
use crate::constants::{cron, events, limits};
use crate::crm::{CrmCompany, CrmContact, CrmProvider};
use crate::models::{
    HolidayCacheKey, HolidayPushStatus, PlanTier, PublicHolidayDaySyncStatus,
};
use crate::runtime::{
    Event, EventBus, EventHandler, HandlerError, HandlerRegistration, StepContext, Trigger,
};
use crate::store::{HolidaySyncStore, MemberStore, WorkspaceStore};

/// Upstream public-holiday table, cached per year/country/language.
#[async_trait]
pub trait HolidayCache: Send + Sync {
    /// Fetch one combination upstream and upsert it into the cache; returns
    /// the number of holiday days now cached for the key. Refreshing an
    /// already-current key is a no-op, so overlapping cron runs converge.
    async fn refresh(&self, key: &HolidayCacheKey) -> crate::error::Result<usize>;
}

/// Collaborators shared by the reconciliation jobs.
///
/// The bus reference is weak: registrations live inside the bus, so a strong
/// reference from a handler back to it would never drop.
#[derive(Clone)]
pub struct ReconcileDeps {
    pub bus: Weak<EventBus>,
    pub workspaces: Arc<dyn WorkspaceStore>,
    pub members: Arc<dyn MemberStore>,
    pub holidays: Arc<dyn HolidaySyncStore>,
    pub billing: Arc<dyn BillingProvider>,
    pub crm: Arc<dyn CrmProvider>,
    pub holiday_cache: Arc<dyn HolidayCache>,
    pub calendar: Arc<dyn CalendarProvider>,
    /// Country/language combinations the holiday cache keeps warm
    pub holiday_locales: Vec<(String, String)>,
    pub config: BatchConfig,
}

impl ReconcileDeps {
    fn bus(&self) -> Result<Arc<EventBus>, HandlerError> {
        self.bus
            .upgrade()
            .ok_or_else(|| HandlerError::fatal("event bus is gone"))
    }
}

/// Nightly seat-count reconciliation: enumerate workspaces, one follow-up
/// event per page.
pub struct SubscriptionReconcileJob {
    deps: ReconcileDeps,
}

impl SubscriptionReconcileJob {
    pub fn new(deps: ReconcileDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl EventHandler for SubscriptionReconcileJob {
    fn name(&self) -> &'static str {
        "subscription_reconcile"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Cron(cron::SUBSCRIPTION_RECONCILE)
    }

    async fn handle(&self, _event: Event, _ctx: StepContext) -> Result<(), HandlerError> {
        let bus = self.deps.bus()?;
        let ids = collect_workspace_ids(&self.deps).await?;
        let pages = fan_out(
            &bus,
            events::SUBSCRIPTION_RECONCILE_BATCH,
            &ids,
            self.deps.config.workspace_batch_size,
        )
        .await?;
        info!(workspaces = ids.len(), pages, "subscription reconciliation fanned out");
        Ok(())
    }
}

/// Per-page worker: report the active seat count to billing where it drifted
/// from the last reported quantity.
pub struct SubscriptionReconcileBatchHandler {
    deps: ReconcileDeps,
}

impl SubscriptionReconcileBatchHandler {
    pub fn new(deps: ReconcileDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl EventHandler for SubscriptionReconcileBatchHandler {
    fn name(&self) -> &'static str {
        "subscription_reconcile_batch"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Event(events::SUBSCRIPTION_RECONCILE_BATCH)
    }

    async fn handle(&self, event: Event, ctx: StepContext) -> Result<(), HandlerError> {
        let batch: BatchPayload<Uuid> = BatchPayload::from_event(&event)?;

        for workspace_id in batch.items {
            let Some(subscription) = self.deps.workspaces.get_subscription(workspace_id).await?
            else {
                continue;
            };
            if subscription.cancelled {
                continue;
            }
            let Some(provider_id) = subscription.provider_subscription_id.clone() else {
                continue;
            };

            let active = self
                .deps
                .members
                .count_active_for_workspace(workspace_id)
                .await?;
            if active == subscription.quantity {
                continue;
            }

            let billing = self.deps.billing.clone();
            ctx.run(&format!("billing:{workspace_id}"), || async move {
                billing
                    .update_subscription_quantity(&provider_id, active)
                    .await
                    .map_err(|e| HandlerError::retryable(e.to_string()))?;
                Ok(active)
            })
            .await?;
            info!(
                %workspace_id,
                reported = subscription.quantity,
                actual = active,
                "subscription quantity corrected"
            );
        }
        Ok(())
    }
}

/// Weekly holiday-table refresh across every year × country × language
/// combination in use.
pub struct HolidayCacheRefreshJob {
    deps: ReconcileDeps,
}

impl HolidayCacheRefreshJob {
    pub fn new(deps: ReconcileDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl EventHandler for HolidayCacheRefreshJob {
    fn name(&self) -> &'static str {
        "holiday_cache_refresh"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Cron(cron::HOLIDAY_CACHE_REFRESH)
    }

    async fn handle(&self, _event: Event, _ctx: StepContext) -> Result<(), HandlerError> {
        let bus = self.deps.bus()?;
        let current_year = Utc::now().year();

        let mut keys = Vec::new();
        for year in [current_year, current_year + 1] {
            for (country_code, language) in &self.deps.holiday_locales {
                keys.push(HolidayCacheKey {
                    year,
                    country_code: country_code.clone(),
                    language: language.clone(),
                });
            }
        }

        let pages = fan_out(
            &bus,
            events::HOLIDAY_CACHE_REFRESH_BATCH,
            &keys,
            self.deps.config.holiday_batch_size,
        )
        .await?;
        info!(combinations = keys.len(), pages, "holiday cache refresh fanned out");
        Ok(())
    }
}

pub struct HolidayCacheRefreshBatchHandler {
    deps: ReconcileDeps,
}

impl HolidayCacheRefreshBatchHandler {
    pub fn new(deps: ReconcileDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl EventHandler for HolidayCacheRefreshBatchHandler {
    fn name(&self) -> &'static str {
        "holiday_cache_refresh_batch"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Event(events::HOLIDAY_CACHE_REFRESH_BATCH)
    }

    async fn handle(&self, event: Event, _ctx: StepContext) -> Result<(), HandlerError> {
        let batch: BatchPayload<HolidayCacheKey> = BatchPayload::from_event(&event)?;
        for key in batch.items {
            let days = self.deps.holiday_cache.refresh(&key).await?;
            info!(
                year = key.year,
                country = %key.country_code,
                language = %key.language,
                days,
                "holiday table refreshed"
            );
        }
        Ok(())
    }
}

/// Wire shape of one per-tenant holiday push page.
#[derive(Debug, Serialize, Deserialize)]
pub struct HolidayPushBatchPayload {
    pub tenant_id: String,
    pub items: Vec<PublicHolidayDaySyncStatus>,
}

/// Nightly push of pending holiday days into member calendars, batched per
/// tenant so the per-tenant concurrency key serializes the mutations.
pub struct HolidayPushJob {
    deps: ReconcileDeps,
}

impl HolidayPushJob {
    pub fn new(deps: ReconcileDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl EventHandler for HolidayPushJob {
    fn name(&self) -> &'static str {
        "holiday_push"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Cron(cron::HOLIDAY_PUSH)
    }

    async fn handle(&self, _event: Event, _ctx: StepContext) -> Result<(), HandlerError> {
        let bus = self.deps.bus()?;
        let pending = self
            .deps
            .holidays
            .list_pending_page(limits::DEFAULT_BATCH_SIZE)
            .await?;

        let mut by_tenant: HashMap<String, Vec<PublicHolidayDaySyncStatus>> = HashMap::new();
        for row in pending {
            let Some(tenant_id) = row.tenant_id.clone() else {
                warn!(row_id = %row.id, "holiday row without tenant, cannot push");
                continue;
            };
            by_tenant.entry(tenant_id).or_default().push(row);
        }

        let mut events_out = Vec::new();
        for (tenant_id, rows) in by_tenant {
            for chunk in rows.chunks(self.deps.config.holiday_batch_size.max(1)) {
                let payload = serde_json::to_value(HolidayPushBatchPayload {
                    tenant_id: tenant_id.clone(),
                    items: chunk.to_vec(),
                })
                .map_err(|e| HandlerError::fatal(format!("unserializable push batch: {e}")))?;
                events_out.push(Event::new(events::HOLIDAY_PUSH_BATCH, payload));
            }
        }

        info!(batches = events_out.len(), "holiday push fanned out");
        bus.publish_batch(events_out).await;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PushStepResult {
    external_event_id: Option<String>,
    error: Option<String>,
}

/// Per-tenant worker pushing one page of holiday days through the calendar
/// provider's batch surface.
pub struct HolidayPushBatchHandler {
    deps: ReconcileDeps,
}

impl HolidayPushBatchHandler {
    pub fn new(deps: ReconcileDeps) -> Self {
        Self { deps }
    }

    fn all_day_payload(row: &PublicHolidayDaySyncStatus) -> CalendarEventPayload {
        let next_day = row.day.succ_opt().unwrap_or(row.day);
        CalendarEventPayload {
            subject: row.holiday_name.clone(),
            is_all_day: true,
            start: EventDateTime {
                date_time: format!("{}T00:00:00", row.day),
                time_zone: "UTC".to_string(),
            },
            end: EventDateTime {
                date_time: format!("{next_day}T00:00:00"),
                time_zone: "UTC".to_string(),
            },
            show_as: ShowAs::Free.wire_value().to_string(),
            intended_status: None,
            categories: Vec::new(),
        }
    }
}

#[async_trait]
impl EventHandler for HolidayPushBatchHandler {
    fn name(&self) -> &'static str {
        "holiday_push_batch"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Event(events::HOLIDAY_PUSH_BATCH)
    }

    async fn handle(&self, event: Event, ctx: StepContext) -> Result<(), HandlerError> {
        let batch: HolidayPushBatchPayload = serde_json::from_value(event.payload.clone())
            .map_err(|e| HandlerError::fatal(format!("malformed push batch payload: {e}")))?;

        for row in &batch.items {
            if row.status != HolidayPushStatus::Pending {
                continue;
            }
            let Some(member) = self.deps.members.get(row.member_id).await? else {
                self.deps
                    .holidays
                    .record_push_result(
                        row.id,
                        HolidayPushStatus::Error,
                        None,
                        Some("member no longer exists".to_string()),
                    )
                    .await?;
                continue;
            };
            let Some(user_id) = member.external_user_id.clone() else {
                self.deps
                    .holidays
                    .record_push_result(
                        row.id,
                        HolidayPushStatus::Error,
                        None,
                        Some("member has no external identity".to_string()),
                    )
                    .await?;
                continue;
            };

            let target = SyncTarget::Native {
                tenant_id: batch.tenant_id.clone(),
                user_id,
            };
            let payload = Self::all_day_payload(row);
            let calendar = self.deps.calendar.clone();

            // The create itself is checkpointed per row: a retried batch
            // resumes after the last pushed day instead of duplicating events.
            let pushed = ctx
                .run(&format!("push:{}", row.id), || async move {
                    match calendar.create_event(&target, &payload).await {
                        Ok(id) => Ok(PushStepResult {
                            external_event_id: Some(id),
                            error: None,
                        }),
                        Err(CalendarApiError::RateLimited { retry_after }) => {
                            Err(HandlerError::RetryAfter(retry_after.unwrap_or(
                                std::time::Duration::from_millis(limits::DEFAULT_RETRY_AFTER_MS),
                            )))
                        }
                        Err(e) => Ok(PushStepResult {
                            external_event_id: None,
                            error: Some(e.to_string()),
                        }),
                    }
                })
                .await?;

            let status = if pushed.error.is_none() {
                HolidayPushStatus::Success
            } else {
                HolidayPushStatus::Error
            };
            self.deps
                .holidays
                .record_push_result(row.id, status, pushed.external_event_id, pushed.error)
                .await?;
        }
        Ok(())
    }
}

/// One member contact or workspace company to reconcile against the CRM.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CrmSyncItem {
    Member { id: Uuid },
    Workspace { id: Uuid },
}

/// Nightly CRM reconciliation: contacts for members, companies for
/// workspaces.
pub struct CrmContactSyncJob {
    deps: ReconcileDeps,
}

impl CrmContactSyncJob {
    pub fn new(deps: ReconcileDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl EventHandler for CrmContactSyncJob {
    fn name(&self) -> &'static str {
        "crm_contact_sync"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Cron(cron::CRM_CONTACT_SYNC)
    }

    async fn handle(&self, _event: Event, _ctx: StepContext) -> Result<(), HandlerError> {
        let bus = self.deps.bus()?;

        let mut contacts = Vec::new();
        let mut offset = 0;
        loop {
            let page = self
                .deps
                .members
                .list_page(offset, self.deps.config.member_batch_size)
                .await?;
            if page.is_empty() {
                break;
            }
            offset += page.len();
            contacts.extend(page.into_iter().map(|m| CrmSyncItem::Member { id: m.id }));
        }

        let companies: Vec<CrmSyncItem> = collect_workspace_ids(&self.deps)
            .await?
            .into_iter()
            .map(|id| CrmSyncItem::Workspace { id })
            .collect();

        let contact_pages = fan_out(
            &bus,
            events::CRM_CONTACT_SYNC_BATCH,
            &contacts,
            self.deps.config.member_batch_size,
        )
        .await?;
        let company_pages = fan_out(
            &bus,
            events::CRM_CONTACT_SYNC_BATCH,
            &companies,
            self.deps.config.workspace_batch_size,
        )
        .await?;
        info!(
            contacts = contacts.len(),
            companies = companies.len(),
            pages = contact_pages + company_pages,
            "crm reconciliation fanned out"
        );
        Ok(())
    }
}

pub struct CrmContactSyncBatchHandler {
    deps: ReconcileDeps,
}

impl CrmContactSyncBatchHandler {
    pub fn new(deps: ReconcileDeps) -> Self {
        Self { deps }
    }

    async fn sync_member(&self, id: Uuid) -> Result<(), HandlerError> {
        let Some(member) = self.deps.members.get(id).await? else {
            return Ok(());
        };
        let Some(email) = member.email.clone() else {
            return Ok(());
        };

        if member.is_active() && member.email_verified {
            self.deps
                .crm
                .upsert_contact(&CrmContact {
                    email,
                    display_name: member.display_name.clone(),
                    locale: member.locale.clone(),
                    workspace_id: member.workspace_id,
                    is_admin: member.is_admin,
                })
                .await
                .map_err(|e| HandlerError::retryable(e.to_string()))?;
        } else if !member.is_active() {
            match self.deps.crm.delete_contact(&email).await {
                // Already absent is the desired state.
                Ok(()) | Err(crate::crm::CrmError::ContactNotFound(_)) => {}
                Err(e) => return Err(HandlerError::retryable(e.to_string())),
            }
        }
        Ok(())
    }

    async fn sync_workspace(&self, id: Uuid) -> Result<(), HandlerError> {
        let Some(workspace) = self.deps.workspaces.get(id).await? else {
            return Ok(());
        };
        let plan = match self.deps.workspaces.get_subscription(id).await? {
            Some(sub) => plan_name(sub.plan),
            None => plan_name(PlanTier::Free),
        };
        let member_count = self.deps.members.count_active_for_workspace(id).await?;

        self.deps
            .crm
            .upsert_company(&CrmCompany {
                workspace_id: id,
                name: workspace.name.clone(),
                plan: plan.to_string(),
                member_count,
            })
            .await
            .map_err(|e| HandlerError::retryable(e.to_string()))
    }
}

#[async_trait]
impl EventHandler for CrmContactSyncBatchHandler {
    fn name(&self) -> &'static str {
        "crm_contact_sync_batch"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Event(events::CRM_CONTACT_SYNC_BATCH)
    }

    async fn handle(&self, event: Event, _ctx: StepContext) -> Result<(), HandlerError> {
        let batch: BatchPayload<CrmSyncItem> = BatchPayload::from_event(&event)?;
        for item in batch.items {
            match item {
                CrmSyncItem::Member { id } => self.sync_member(id).await?,
                CrmSyncItem::Workspace { id } => self.sync_workspace(id).await?,
            }
        }
        Ok(())
    }
}

fn plan_name(plan: PlanTier) -> &'static str {
    match plan {
        PlanTier::Free => "free",
        PlanTier::Small => "small",
        PlanTier::Business => "business",
        PlanTier::Enterprise => "enterprise",
    }
}

async fn collect_workspace_ids(deps: &ReconcileDeps) -> Result<Vec<Uuid>, HandlerError> {
    let mut ids = Vec::new();
    let mut offset = 0;
    loop {
        let page = deps
            .workspaces
            .list_ids_page(offset, deps.config.workspace_batch_size)
            .await?;
        if page.is_empty() {
            break;
        }
        offset += page.len();
        ids.extend(page);
    }
    Ok(ids)
}

/// Registrations for every reconciliation job and its batch worker.
///
/// Holiday pushes carry a per-tenant concurrency key: the provider serializes
/// mutations per tenant, and so do we.
pub fn reconcile_registrations(deps: ReconcileDeps) -> Vec<HandlerRegistration> {
    vec![
        HandlerRegistration::new(Arc::new(SubscriptionReconcileJob::new(deps.clone()))),
        HandlerRegistration::new(Arc::new(SubscriptionReconcileBatchHandler::new(deps.clone()))),
        HandlerRegistration::new(Arc::new(HolidayCacheRefreshJob::new(deps.clone()))),
        HandlerRegistration::new(Arc::new(HolidayCacheRefreshBatchHandler::new(deps.clone()))),
        HandlerRegistration::new(Arc::new(HolidayPushJob::new(deps.clone()))),
        HandlerRegistration::new(Arc::new(HolidayPushBatchHandler::new(deps.clone())))
            .with_concurrency_key("tenant_id"),
        HandlerRegistration::new(Arc::new(CrmContactSyncJob::new(deps.clone()))),
        HandlerRegistration::new(Arc::new(CrmContactSyncBatchHandler::new(deps))),
    ]
}
