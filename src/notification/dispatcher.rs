use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::channels::{ChatCard, ChatMessenger, EmailMessage, Mailer};
use super::format::format_request_range;
use super::localize::{Localizer, TranslatorOptions};
use super::recipient::{passes_guards, resolve_recipients, Recipient};
use super::LifecycleEvent;
use crate::approval::sort_approvers;
use crate::config::NotificationConfig;
use crate::error::Result;
use crate::models::{Member, Request, RequestDetails};
use crate::store::ApproverStore;

/// Everything the dispatcher needs about one lifecycle event, pre-loaded by
/// the handler so dispatch itself stays a pure fan-out over recipients.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub request: Request,
    pub details: RequestDetails,
    /// Member whose action caused the event (never self-notified, with one
    /// cancellation exception).
    pub actor_member_id: Uuid,
    /// All members referenced by the request and its approval chain.
    pub members: HashMap<Uuid, Member>,
}

/// Composes and sends lifecycle notifications over e-mail and chat.
pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
    messenger: Arc<dyn ChatMessenger>,
    localizer: Arc<dyn Localizer>,
    approvers: Arc<dyn ApproverStore>,
    config: NotificationConfig,
}

impl NotificationDispatcher {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        messenger: Arc<dyn ChatMessenger>,
        localizer: Arc<dyn Localizer>,
        approvers: Arc<dyn ApproverStore>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            mailer,
            messenger,
            localizer,
            approvers,
            config,
        }
    }

    /// Fan one lifecycle event out to its recipients.
    ///
    /// Approval steps are re-read from the store on every dispatch: a
    /// redelivered event must see the chat-card ids persisted by the first
    /// delivery, or cards would duplicate instead of updating in place.
    ///
    /// Send failures are logged and swallowed. A missed notification never
    /// fails the business transaction that produced the event.
    pub async fn dispatch(&self, event: LifecycleEvent, ctx: &DispatchContext) -> Result<()> {
        let steps = self.approvers.list_for_request(ctx.request.id).await?;
        let chain = sort_approvers(&steps);
        let recipients = resolve_recipients(
            event,
            &ctx.request,
            &chain,
            ctx.details.approval_policy,
            &ctx.members,
        );

        info!(
            request_id = %ctx.request.id,
            ?event,
            recipients = recipients.len(),
            "dispatching lifecycle notifications"
        );

        for recipient in recipients {
            if !passes_guards(&recipient, ctx.actor_member_id, event) {
                continue;
            }
            let member = recipient.member().clone();
            let (subject, body) = self.compose(event, &member, ctx);

            if member.notification_channel.wants_email() {
                self.deliver_email(&member, &subject, &body).await;
            }
            if member.notification_channel.wants_chat() {
                self.deliver_chat(&recipient, &member, &subject, &body).await;
            }
        }

        Ok(())
    }

    fn compose(
        &self,
        event: LifecycleEvent,
        recipient: &Member,
        ctx: &DispatchContext,
    ) -> (String, String) {
        let translator = self.localizer.translator(&TranslatorOptions {
            locale: if recipient.locale.is_empty() {
                self.config.default_locale.clone()
            } else {
                recipient.locale.clone()
            },
            namespace: self.config.namespace.clone(),
        });

        let mut params: HashMap<&str, String> = HashMap::new();
        params.insert(
            "requester",
            ctx.members
                .get(&ctx.request.requester_member_id)
                .map(|m| m.display_name.clone())
                .unwrap_or_default(),
        );
        params.insert(
            "creator",
            ctx.members
                .get(&ctx.request.created_by_member_id)
                .map(|m| m.display_name.clone())
                .unwrap_or_default(),
        );
        params.insert("leave_type", ctx.details.leave_type_name.clone());
        params.insert("range", format_request_range(&ctx.request, recipient));

        let prefix = key_prefix(event);
        (
            translator.t(&format!("{prefix}.subject"), &params),
            translator.t(&format!("{prefix}.body"), &params),
        )
    }

    async fn deliver_email(&self, member: &Member, subject: &str, body: &str) {
        let Some(address) = member.email.clone() else {
            return;
        };
        let message = EmailMessage {
            to: address,
            subject: subject.to_string(),
            body: body.to_string(),
        };
        if let Err(e) = self.mailer.send(message).await {
            warn!(member_id = %member.id, error = %e, "e-mail notification failed");
        }
    }

    /// Approver cards are idempotent across redeliveries: a step that already
    /// carries a chat message id gets an in-place update, otherwise a fresh
    /// card is created and its id persisted (first writer wins).
    async fn deliver_chat(
        &self,
        recipient: &Recipient,
        member: &Member,
        subject: &str,
        body: &str,
    ) {
        let Some(chat_id) = member.chat_user_id.clone() else {
            return;
        };
        let card = ChatCard {
            recipient_chat_id: chat_id,
            title: subject.to_string(),
            body: body.to_string(),
        };

        match recipient.step() {
            Some(step) => {
                if let Some(message_id) = &step.chat_message_id {
                    if let Err(e) = self.messenger.update_card(message_id, card).await {
                        warn!(member_id = %member.id, error = %e, "chat card update failed");
                    }
                    return;
                }
                match self.messenger.send_card(card).await {
                    Ok(message_id) => {
                        match self
                            .approvers
                            .set_chat_message_id_if_absent(step.id, &message_id)
                            .await
                        {
                            Ok(true) => {}
                            Ok(false) => {
                                debug!(
                                    approver_id = %step.id,
                                    "card id already persisted by a concurrent delivery"
                                );
                            }
                            Err(e) => {
                                warn!(approver_id = %step.id, error = %e, "failed to persist chat card id");
                            }
                        }
                    }
                    Err(e) => {
                        warn!(member_id = %member.id, error = %e, "chat card send failed");
                    }
                }
            }
            None => {
                // Informational cards (requester, creator) have no stored id.
                if let Err(e) = self.messenger.send_card(card).await {
                    warn!(member_id = %member.id, error = %e, "chat card send failed");
                }
            }
        }
    }
}

fn key_prefix(event: LifecycleEvent) -> &'static str {
    match event {
        LifecycleEvent::CreatedOnBehalf => "created_on_behalf",
        LifecycleEvent::Approved => "approved",
        LifecycleEvent::Declined => "declined",
        LifecycleEvent::ApprovalNeeded => "approval_needed",
        LifecycleEvent::Canceled => "canceled",
    }
}
