mod common;

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use common::{
    approver_step, details_for, july_request, member_in, workspace, RecordingChatMessenger,
    RecordingMailer,
};
use leavecore::config::LeavecoreConfig;
use leavecore::models::{ApprovalPolicy, ApproverStatus, Member, NotificationChannel};
use leavecore::notification::{
    DispatchContext, LifecycleEvent, NotificationDispatcher, StaticLocalizer,
};
use leavecore::store::InMemoryStore;

struct Setup {
    mailer: Arc<RecordingMailer>,
    messenger: Arc<RecordingChatMessenger>,
    dispatcher: NotificationDispatcher,
}

fn setup(store: Arc<InMemoryStore>) -> Setup {
    let mailer = Arc::new(RecordingMailer::default());
    let messenger = Arc::new(RecordingChatMessenger::default());
    let dispatcher = NotificationDispatcher::new(
        mailer.clone(),
        messenger.clone(),
        Arc::new(StaticLocalizer::english()),
        store,
        LeavecoreConfig::default().notification,
    );
    Setup {
        mailer,
        messenger,
        dispatcher,
    }
}

fn member_map(members: &[&Member]) -> HashMap<Uuid, Member> {
    members.iter().map(|m| (m.id, (*m).clone())).collect()
}

#[tokio::test]
async fn test_duplicate_approval_needed_updates_card_in_place() {
    let store = Arc::new(InMemoryStore::new());
    let ws = workspace();
    let requester = member_in(ws.id);
    let approver = member_in(ws.id);

    let request = july_request(ws.id, requester.id);
    let details = details_for(request.id, ApprovalPolicy::LinearAllHaveToAgree);
    let step = approver_step(request.id, approver.id, None, ApproverStatus::Pending);
    store.insert_request(request.clone());
    store.insert_details(details.clone());
    store.insert_approver(step.clone());

    let s = setup(store.clone());
    let ctx = DispatchContext {
        request,
        details,
        actor_member_id: requester.id,
        members: member_map(&[&requester, &approver]),
    };

    s.dispatcher
        .dispatch(LifecycleEvent::ApprovalNeeded, &ctx)
        .await
        .unwrap();
    s.dispatcher
        .dispatch(LifecycleEvent::ApprovalNeeded, &ctx)
        .await
        .unwrap();

    // One freshly created card, then one in-place update via the stored id.
    assert_eq!(s.messenger.created.lock().len(), 1);
    let updated = s.messenger.updated.lock();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].0, "msg-0");

    let persisted = store.get_approver(step.id).unwrap();
    assert_eq!(persisted.chat_message_id.as_deref(), Some("msg-0"));
}

#[tokio::test]
async fn test_channel_preference_controls_duplex_delivery() {
    let store = Arc::new(InMemoryStore::new());
    let ws = workspace();
    let actor = member_in(ws.id);
    let mut requester = member_in(ws.id);
    requester.notification_channel = NotificationChannel::Email;

    let mut request = july_request(ws.id, requester.id);
    request.created_by_member_id = actor.id;
    let details = details_for(request.id, ApprovalPolicy::LinearAllHaveToAgree);
    store.insert_request(request.clone());
    store.insert_details(details.clone());

    let s = setup(store);
    let ctx = DispatchContext {
        request,
        details,
        actor_member_id: actor.id,
        members: member_map(&[&requester, &actor]),
    };

    s.dispatcher
        .dispatch(LifecycleEvent::CreatedOnBehalf, &ctx)
        .await
        .unwrap();

    let sent = s.mailer.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "A request was created for you");
    assert!(sent[0].body.contains("Vacation"));
    // Email-only preference never produces a chat card.
    assert!(s.messenger.created.lock().is_empty());
}

#[tokio::test]
async fn test_actor_is_not_notified_of_their_own_decision() {
    let store = Arc::new(InMemoryStore::new());
    let ws = workspace();
    let requester = member_in(ws.id);
    let approver = member_in(ws.id);

    let request = july_request(ws.id, requester.id);
    let details = details_for(request.id, ApprovalPolicy::LinearAllHaveToAgree);
    let step = approver_step(request.id, approver.id, None, ApproverStatus::Approved);
    store.insert_request(request.clone());
    store.insert_details(details.clone());
    store.insert_approver(step);

    let s = setup(store);
    let ctx = DispatchContext {
        request,
        details,
        actor_member_id: approver.id,
        members: member_map(&[&requester, &approver]),
    };

    s.dispatcher
        .dispatch(LifecycleEvent::Approved, &ctx)
        .await
        .unwrap();

    let sent = s.mailer.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, requester.email.clone().unwrap());
}

#[tokio::test]
async fn test_canceled_by_requester_still_confirms_to_them() {
    let store = Arc::new(InMemoryStore::new());
    let ws = workspace();
    let requester = member_in(ws.id);
    let approver = member_in(ws.id);

    let request = july_request(ws.id, requester.id);
    let details = details_for(request.id, ApprovalPolicy::LinearAllHaveToAgree);
    let step = approver_step(request.id, approver.id, None, ApproverStatus::Pending);
    store.insert_request(request.clone());
    store.insert_details(details.clone());
    store.insert_approver(step);

    let s = setup(store);
    let ctx = DispatchContext {
        request,
        details,
        actor_member_id: requester.id,
        members: member_map(&[&requester, &approver]),
    };

    s.dispatcher
        .dispatch(LifecycleEvent::Canceled, &ctx)
        .await
        .unwrap();

    let sent = s.mailer.sent.lock();
    let recipients: Vec<&str> = sent.iter().map(|m| m.to.as_str()).collect();
    // Self-cancellation still confirms to the requester, and the pending
    // approver learns the request is gone.
    assert!(recipients.contains(&requester.email.as_deref().unwrap()));
    assert!(recipients.contains(&approver.email.as_deref().unwrap()));
}

#[tokio::test]
async fn test_unverified_email_blocks_all_channels() {
    let store = Arc::new(InMemoryStore::new());
    let ws = workspace();
    let actor = member_in(ws.id);
    let mut requester = member_in(ws.id);
    requester.email_verified = false;

    let mut request = july_request(ws.id, requester.id);
    request.created_by_member_id = actor.id;
    let details = details_for(request.id, ApprovalPolicy::LinearAllHaveToAgree);
    store.insert_request(request.clone());
    store.insert_details(details.clone());

    let s = setup(store);
    let ctx = DispatchContext {
        request,
        details,
        actor_member_id: actor.id,
        members: member_map(&[&requester, &actor]),
    };

    s.dispatcher
        .dispatch(LifecycleEvent::CreatedOnBehalf, &ctx)
        .await
        .unwrap();
    assert!(s.mailer.sent.lock().is_empty());
    assert!(s.messenger.created.lock().is_empty());
}
