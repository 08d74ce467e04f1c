use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::dispatcher::{DispatchContext, NotificationDispatcher};
use super::LifecycleEvent;
use crate::constants::events;
use crate::models::Member;
use crate::runtime::{
    Event, EventHandler, HandlerError, HandlerRegistration, StepContext, Trigger,
};
use crate::store::{ApproverStore, MemberStore, RequestStore};

/// Collaborators shared by all lifecycle notification handlers.
#[derive(Clone)]
pub struct NotificationDeps {
    pub dispatcher: Arc<NotificationDispatcher>,
    pub requests: Arc<dyn RequestStore>,
    pub approvers: Arc<dyn ApproverStore>,
    pub members: Arc<dyn MemberStore>,
}

/// Payload carried by every request lifecycle event.
#[derive(Debug, Serialize, Deserialize)]
pub struct LifecycleEventPayload {
    pub request_id: Uuid,
    pub actor_member_id: Uuid,
}

/// One registered handler per lifecycle event.
///
/// The whole dispatch runs inside a single durable step, so a handler
/// retried after a crash mid-fan-out does not re-send what a completed
/// delivery already sent; partially-sent fan-outs rely on the chat-card id
/// conditional write instead.
pub struct LifecycleNotificationHandler {
    deps: NotificationDeps,
    event: LifecycleEvent,
}

impl LifecycleNotificationHandler {
    pub fn new(deps: NotificationDeps, event: LifecycleEvent) -> Self {
        Self { deps, event }
    }

    async fn load_members(
        &self,
        payload: &LifecycleEventPayload,
        request_id: Uuid,
        requester_id: Uuid,
        creator_id: Uuid,
    ) -> Result<HashMap<Uuid, Member>, HandlerError> {
        let mut ids = vec![requester_id, creator_id, payload.actor_member_id];
        for step in self.deps.approvers.list_for_request(request_id).await? {
            if let Some(id) = step.approver_member_id {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        ids.dedup();

        let mut members = HashMap::new();
        for id in ids {
            if let Some(m) = self.deps.members.get(id).await? {
                members.insert(id, m);
            }
        }
        Ok(members)
    }
}

#[async_trait]
impl EventHandler for LifecycleNotificationHandler {
    fn name(&self) -> &'static str {
        match self.event {
            LifecycleEvent::CreatedOnBehalf => "notify_created_on_behalf",
            LifecycleEvent::Approved => "notify_approved",
            LifecycleEvent::Declined => "notify_declined",
            LifecycleEvent::ApprovalNeeded => "notify_approval_needed",
            LifecycleEvent::Canceled => "notify_canceled",
        }
    }

    fn trigger(&self) -> Trigger {
        Trigger::Event(match self.event {
            LifecycleEvent::CreatedOnBehalf => events::REQUEST_CREATED_ON_BEHALF,
            LifecycleEvent::Approved => events::REQUEST_APPROVED,
            LifecycleEvent::Declined => events::REQUEST_DECLINED,
            LifecycleEvent::ApprovalNeeded => events::REQUEST_APPROVAL_NEEDED,
            LifecycleEvent::Canceled => events::REQUEST_CANCELED,
        })
    }

    async fn handle(&self, event: Event, ctx: StepContext) -> Result<(), HandlerError> {
        let payload: LifecycleEventPayload = serde_json::from_value(event.payload.clone())
            .map_err(|e| HandlerError::fatal(format!("malformed lifecycle payload: {e}")))?;

        let Some(request) = self.deps.requests.get_request(payload.request_id).await? else {
            // A request deleted between emission and delivery leaves nothing
            // to announce.
            warn!(request_id = %payload.request_id, "request vanished before notification");
            return Ok(());
        };
        let Some(details) = self.deps.requests.get_details(payload.request_id).await? else {
            warn!(request_id = %payload.request_id, "request details missing, skipping notification");
            return Ok(());
        };

        let members = self
            .load_members(
                &payload,
                request.id,
                request.requester_member_id,
                request.created_by_member_id,
            )
            .await?;

        let dispatch_ctx = DispatchContext {
            request,
            details,
            actor_member_id: payload.actor_member_id,
            members,
        };

        let lifecycle = self.event;
        let dispatcher = self.dispatcher();
        ctx.run("dispatch", || async move {
            dispatcher
                .dispatch(lifecycle, &dispatch_ctx)
                .await
                .map_err(HandlerError::from)
        })
        .await
    }
}

impl LifecycleNotificationHandler {
    fn dispatcher(&self) -> Arc<NotificationDispatcher> {
        self.deps.dispatcher.clone()
    }
}

/// Registrations for all five lifecycle events.
pub fn notification_registrations(deps: NotificationDeps) -> Vec<HandlerRegistration> {
    [
        LifecycleEvent::CreatedOnBehalf,
        LifecycleEvent::Approved,
        LifecycleEvent::Declined,
        LifecycleEvent::ApprovalNeeded,
        LifecycleEvent::Canceled,
    ]
    .into_iter()
    .map(|event| {
        HandlerRegistration::new(Arc::new(LifecycleNotificationHandler::new(
            deps.clone(),
            event,
        )))
    })
    .collect()
}
