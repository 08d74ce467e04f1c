//! Event handlers wiring the sync orchestrator to the runtime.
//!
//! All three handlers register with a per-tenant concurrency key, so
//! mutations for one external tenant apply one at a time and in order. A
//! rate-limited outcome is surfaced as [`HandlerError::RetryAfter`], which
//! the runtime honors verbatim before re-invoking.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use super::orchestrator::CalendarSyncOrchestrator;
use super::payload::{build_event_payload, ShowAs};
use super::target::{select_sync_target, SkipReason, SyncTarget, TokenScopes};
use super::SyncOutcome;
use crate::constants::events;
use crate::models::{Member, Request, RequestDetails, RequestSyncLog, SyncType, Workspace};
use crate::runtime::{Event, EventHandler, HandlerError, HandlerRegistration, StepContext, Trigger};
use crate::store::{MemberStore, RequestStore, SyncLogStore, WorkspaceStore};

/// Access-token introspection: which scopes the tenant granted us for a
/// member. Checked before a native-calendar call is attempted.
#[async_trait]
pub trait TokenInspector: Send + Sync {
    async fn scopes_for(&self, member: &Member) -> TokenScopes;
}

/// Shared dependencies for the sync handlers.
pub struct SyncHandlerDeps {
    pub orchestrator: CalendarSyncOrchestrator,
    pub requests: Arc<dyn RequestStore>,
    pub members: Arc<dyn MemberStore>,
    pub workspaces: Arc<dyn WorkspaceStore>,
    pub sync_logs: Arc<dyn SyncLogStore>,
    pub tokens: Arc<dyn TokenInspector>,
}

#[derive(Debug, Deserialize)]
struct SyncEventPayload {
    request_id: Uuid,
    #[serde(default)]
    sync_setting_id: Option<Uuid>,
    #[serde(default)]
    subject_override: Option<String>,
    #[serde(default)]
    show_as: Option<ShowAs>,
}

struct LoadedContext {
    request: Request,
    details: RequestDetails,
    member: Member,
    workspace: Workspace,
}

impl SyncHandlerDeps {
    async fn load(&self, request_id: Uuid) -> Result<LoadedContext, HandlerError> {
        // Missing rows usually mean a race with concurrent deletion; retry
        // under the runtime's default policy.
        let request = self
            .requests
            .get_request(request_id)
            .await?
            .ok_or_else(|| HandlerError::retryable(format!("request {request_id} not found")))?;
        let details = self
            .requests
            .get_details(request_id)
            .await?
            .ok_or_else(|| HandlerError::retryable(format!("details for {request_id} missing")))?;
        let member = self
            .members
            .get(request.requester_member_id)
            .await?
            .ok_or_else(|| HandlerError::retryable("requester member missing"))?;
        let workspace = self
            .workspaces
            .get(request.workspace_id)
            .await?
            .ok_or_else(|| HandlerError::retryable("workspace missing"))?;
        Ok(LoadedContext {
            request,
            details,
            member,
            workspace,
        })
    }

    async fn resolve_target(
        &self,
        loaded: &LoadedContext,
        sync_setting_id: Option<Uuid>,
    ) -> Result<Result<SyncTarget, SkipReason>, HandlerError> {
        let setting = match sync_setting_id {
            Some(id) => self.workspaces.get_sync_setting(id).await?,
            None => None,
        };
        let scopes = self.tokens.scopes_for(&loaded.member).await;
        Ok(select_sync_target(
            &loaded.request,
            &loaded.details,
            &loaded.member,
            setting.as_ref(),
            &scopes,
        ))
    }

    /// Rebuild the minimal target a stored log row addresses, for update
    /// and delete paths.
    async fn target_from_log(
        &self,
        log: &RequestSyncLog,
    ) -> Result<Option<SyncTarget>, HandlerError> {
        match log.sync_type {
            SyncType::SharedCalendar | SyncType::GroupCalendar => {
                let Some(setting_id) = log.calendar_sync_setting_id else {
                    return Ok(None);
                };
                Ok(self
                    .workspaces
                    .get_sync_setting(setting_id)
                    .await?
                    .map(|setting| SyncTarget::Shared { setting }))
            }
            SyncType::NativeCalendar => match (&log.tenant_id, &log.user_id) {
                (Some(tenant_id), Some(user_id)) => Ok(Some(SyncTarget::Native {
                    tenant_id: tenant_id.clone(),
                    user_id: user_id.clone(),
                })),
                _ => Ok(None),
            },
            // An invite cannot be unsent or patched.
            SyncType::EmailInvite => Ok(None),
        }
    }
}

fn parse_payload(event: &Event) -> Result<SyncEventPayload, HandlerError> {
    serde_json::from_value(event.payload.clone())
        .map_err(|e| HandlerError::fatal(format!("malformed sync payload: {e}")))
}

fn outcome_to_result(outcome: SyncOutcome) -> Result<(), HandlerError> {
    match outcome {
        SyncOutcome::Synced { .. } | SyncOutcome::Skipped { .. } => Ok(()),
        SyncOutcome::RateLimited { retry_after } => Err(HandlerError::RetryAfter(retry_after)),
        // An exhausted retry budget is already recorded on the log row; the
        // runtime must not spend its own attempts on it.
        SyncOutcome::Failed { error, terminal } => {
            if terminal {
                Err(HandlerError::fatal(error))
            } else {
                Err(HandlerError::retryable(error))
            }
        }
    }
}

/// Handles `calendar.sync_create_requested`.
pub struct SyncCreateHandler {
    pub deps: Arc<SyncHandlerDeps>,
}

#[async_trait]
impl EventHandler for SyncCreateHandler {
    fn name(&self) -> &'static str {
        "calendar-sync-create"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Event(events::CALENDAR_SYNC_CREATE)
    }

    async fn handle(&self, event: Event, _ctx: StepContext) -> Result<(), HandlerError> {
        let payload = parse_payload(&event)?;
        let loaded = self.deps.load(payload.request_id).await?;

        let target = match self
            .deps
            .resolve_target(&loaded, payload.sync_setting_id)
            .await?
        {
            Ok(target) => target,
            Err(reason) => {
                // Record the decision so it is visible in sync status.
                let target_type = payload
                    .sync_setting_id
                    .map_or(SyncType::NativeCalendar, |_| SyncType::SharedCalendar);
                self.deps
                    .orchestrator
                    .record_skip(payload.request_id, target_type, &reason)
                    .await?;
                return Ok(());
            }
        };

        let event_payload = build_event_payload(
            &loaded.request,
            &loaded.details,
            &loaded.member,
            &loaded.workspace,
            matches!(target, SyncTarget::Shared { .. }),
            payload.subject_override.as_deref(),
            payload.show_as.unwrap_or(ShowAs::Oof),
        );

        let outcome = self
            .deps
            .orchestrator
            .sync_request(payload.request_id, &target, &event_payload)
            .await?;
        outcome_to_result(outcome)
    }
}

/// Handles `calendar.sync_update_requested`.
pub struct SyncUpdateHandler {
    pub deps: Arc<SyncHandlerDeps>,
}

#[async_trait]
impl EventHandler for SyncUpdateHandler {
    fn name(&self) -> &'static str {
        "calendar-sync-update"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Event(events::CALENDAR_SYNC_UPDATE)
    }

    async fn handle(&self, event: Event, _ctx: StepContext) -> Result<(), HandlerError> {
        let payload = parse_payload(&event)?;
        let loaded = self.deps.load(payload.request_id).await?;

        let target = match self
            .deps
            .resolve_target(&loaded, payload.sync_setting_id)
            .await?
        {
            Ok(target) => target,
            Err(_) => return Ok(()),
        };

        let event_payload = build_event_payload(
            &loaded.request,
            &loaded.details,
            &loaded.member,
            &loaded.workspace,
            matches!(target, SyncTarget::Shared { .. }),
            payload.subject_override.as_deref(),
            payload.show_as.unwrap_or(ShowAs::Oof),
        );

        let logs = self.deps.sync_logs.find_for_request(payload.request_id).await?;
        let Some(log) = logs.into_iter().find(|l| l.external_event_id.is_some()) else {
            // Nothing was ever pushed; treat the update as a create.
            let outcome = self
                .deps
                .orchestrator
                .sync_request(payload.request_id, &target, &event_payload)
                .await?;
            return outcome_to_result(outcome);
        };

        let outcome = self
            .deps
            .orchestrator
            .update_sync(log.id, &target, &event_payload)
            .await?;

        if matches!(
            outcome,
            SyncOutcome::Skipped {
                reason: SkipReason::StaleTarget
            }
        ) {
            // Current settings point elsewhere: leave the stale entry and
            // create fresh on the new target.
            let outcome = self
                .deps
                .orchestrator
                .sync_request(payload.request_id, &target, &event_payload)
                .await?;
            return outcome_to_result(outcome);
        }
        outcome_to_result(outcome)
    }
}

/// Handles `calendar.sync_delete_requested`.
pub struct SyncDeleteHandler {
    pub deps: Arc<SyncHandlerDeps>,
}

#[async_trait]
impl EventHandler for SyncDeleteHandler {
    fn name(&self) -> &'static str {
        "calendar-sync-delete"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Event(events::CALENDAR_SYNC_DELETE)
    }

    async fn handle(&self, event: Event, _ctx: StepContext) -> Result<(), HandlerError> {
        let payload = parse_payload(&event)?;
        let logs = self.deps.sync_logs.find_for_request(payload.request_id).await?;

        for log in logs {
            let Some(target) = self.deps.target_from_log(&log).await? else {
                continue;
            };
            let outcome = self.deps.orchestrator.delete_sync(log.id, &target).await?;
            outcome_to_result(outcome)?;
        }
        Ok(())
    }
}

/// Bus registrations for all three handlers, serialized per tenant.
pub fn sync_registrations(deps: Arc<SyncHandlerDeps>) -> Vec<HandlerRegistration> {
    vec![
        HandlerRegistration::new(Arc::new(SyncCreateHandler { deps: deps.clone() }))
            .with_concurrency_key("tenant_id"),
        HandlerRegistration::new(Arc::new(SyncUpdateHandler { deps: deps.clone() }))
            .with_concurrency_key("tenant_id"),
        HandlerRegistration::new(Arc::new(SyncDeleteHandler { deps }))
            .with_concurrency_key("tenant_id"),
    ]
}
