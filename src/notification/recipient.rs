use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use super::LifecycleEvent;
use crate::approval::active_approvers;
use crate::models::{ApprovalPolicy, Member, Request, RequestApprover};

/// Who receives a notification, and in what role.
///
/// A discriminated union instead of approver-shaped stand-ins: the
/// creator-on-behalf gets their own variant rather than a mocked approver
/// record, and one rendering path consumes all three.
#[derive(Debug, Clone)]
pub enum Recipient {
    Requester(Member),
    Approver {
        member: Member,
        step: RequestApprover,
    },
    Creator(Member),
}

impl Recipient {
    pub fn member(&self) -> &Member {
        match self {
            Self::Requester(m) | Self::Creator(m) => m,
            Self::Approver { member, .. } => member,
        }
    }

    /// The approval step this recipient acts on, when they are one.
    pub fn step(&self) -> Option<&RequestApprover> {
        match self {
            Self::Approver { step, .. } => Some(step),
            _ => None,
        }
    }
}

/// Resolve the recipient set for one lifecycle event.
///
/// `chain` must already be in chain order (see
/// [`crate::approval::sort_approvers`]); `members` maps member ids to their
/// loaded records. Steps whose approver member cannot be resolved are
/// skipped.
pub fn resolve_recipients(
    event: LifecycleEvent,
    request: &Request,
    chain: &[RequestApprover],
    policy: ApprovalPolicy,
    members: &HashMap<Uuid, Member>,
) -> Vec<Recipient> {
    let requester = members.get(&request.requester_member_id);
    let creator = members.get(&request.created_by_member_id);
    let creator_is_distinct = request.is_created_on_behalf();
    let creator_in_chain = chain.iter().any(|s| {
        s.approver_member_id
            .is_some_and(|id| id == request.created_by_member_id)
    });

    let mut recipients = Vec::new();

    match event {
        LifecycleEvent::CreatedOnBehalf => {
            if let Some(m) = requester {
                recipients.push(Recipient::Requester(m.clone()));
            }
        }
        LifecycleEvent::Approved | LifecycleEvent::Declined => {
            if let Some(m) = requester {
                recipients.push(Recipient::Requester(m.clone()));
            }
            if creator_is_distinct && !creator_in_chain {
                if let Some(m) = creator {
                    recipients.push(Recipient::Creator(m.clone()));
                }
            }
        }
        LifecycleEvent::ApprovalNeeded => {
            for step in active_approvers(chain, policy) {
                let Some(member_id) = step.approver_member_id else {
                    continue;
                };
                if let Some(m) = members.get(&member_id) {
                    recipients.push(Recipient::Approver {
                        member: m.clone(),
                        step: step.clone(),
                    });
                } else {
                    debug!(step_id = %step.id, "approver member not resolvable, skipping");
                }
            }
        }
        LifecycleEvent::Canceled => {
            if let Some(m) = requester {
                recipients.push(Recipient::Requester(m.clone()));
            }
            for step in chain {
                let Some(member_id) = step.approver_member_id else {
                    continue;
                };
                if let Some(m) = members.get(&member_id) {
                    recipients.push(Recipient::Approver {
                        member: m.clone(),
                        step: step.clone(),
                    });
                }
            }
            // Creator-on-behalf who never was a real approver still learns
            // about the cancellation, in their own role.
            if creator_is_distinct && !creator_in_chain {
                if let Some(m) = creator {
                    recipients.push(Recipient::Creator(m.clone()));
                }
            }
        }
    }

    recipients
}

/// Per-recipient guard clauses, evaluated in order and short-circuiting.
///
/// The actor never notifies themselves, except a canceled-by-self request
/// still informs the requester: they must see the confirmation.
pub fn passes_guards(recipient: &Recipient, actor_member_id: Uuid, event: LifecycleEvent) -> bool {
    let member = recipient.member();

    if !member.has_verified_email() {
        debug!(member_id = %member.id, "skipping recipient: unverified email");
        return false;
    }
    if member.chat_user_id.is_none() {
        debug!(member_id = %member.id, "skipping recipient: no linked chat identity");
        return false;
    }
    if !member.is_active() {
        debug!(member_id = %member.id, "skipping recipient: membership not active");
        return false;
    }
    if member.id == actor_member_id {
        let canceled_self_exception =
            event == LifecycleEvent::Canceled && matches!(recipient, Recipient::Requester(_));
        if !canceled_self_exception {
            debug!(member_id = %member.id, "skipping recipient: actor does not self-notify");
            return false;
        }
    }
    true
}
