mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use common::{july_request, member_in, MockCalendarProvider, StaticTokens};
use leavecore::calendar::{
    sync_registrations, CalendarApiError, CalendarSyncOrchestrator, SyncHandlerDeps, SyncOutcome,
    SyncTarget,
};
use leavecore::config::LeavecoreConfig;
use leavecore::models::{ApprovalPolicy, RequestSyncLog, SyncStatus, SyncType};
use leavecore::runtime::{Event, EventBus};
use leavecore::store::{InMemoryStore, SyncLogStore};

fn orchestrator(
    provider: Arc<MockCalendarProvider>,
    store: Arc<InMemoryStore>,
) -> CalendarSyncOrchestrator {
    CalendarSyncOrchestrator::new(provider, store, LeavecoreConfig::default().calendar_sync)
}

fn native_target() -> SyncTarget {
    SyncTarget::Native {
        tenant_id: "tenant-1".to_string(),
        user_id: "ext-user".to_string(),
    }
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after_and_stops() {
    let provider = Arc::new(MockCalendarProvider::new());
    provider.script_create(Err(CalendarApiError::RateLimited {
        retry_after: Some(Duration::from_secs(10)),
    }));
    let store = Arc::new(InMemoryStore::new());
    let orch = orchestrator(provider.clone(), store.clone());

    let request_id = Uuid::new_v4();
    let payload = holiday_free_payload();
    let outcome = orch
        .sync_request(request_id, &native_target(), &payload)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SyncOutcome::RateLimited {
            retry_after: Duration::from_secs(10)
        }
    );
    // Exactly one provider call; no speculative retry inside the orchestrator.
    assert_eq!(provider.call_count("create"), 1);

    // The retry budget is untouched by rate limiting.
    let log = SyncLogStore::find_for_request(store.as_ref(), request_id)
        .await
        .unwrap()
        .remove(0);
    assert_eq!(log.retry_count, 0);
}

#[tokio::test]
async fn test_missing_retry_after_uses_default_backoff() {
    let provider = Arc::new(MockCalendarProvider::new());
    provider.script_create(Err(CalendarApiError::RateLimited { retry_after: None }));
    let store = Arc::new(InMemoryStore::new());
    let orch = orchestrator(provider.clone(), store);

    let outcome = orch
        .sync_request(Uuid::new_v4(), &native_target(), &holiday_free_payload())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::RateLimited {
            retry_after: Duration::from_millis(5000)
        }
    );
}

#[tokio::test]
async fn test_delete_of_missing_event_is_success() {
    let provider = Arc::new(MockCalendarProvider::new());
    provider.script_delete(Err(CalendarApiError::NotFound));
    let store = Arc::new(InMemoryStore::new());
    let orch = orchestrator(provider.clone(), store.clone());

    let request_id = Uuid::new_v4();
    let mut log = RequestSyncLog::new(request_id, SyncType::NativeCalendar);
    log.status = SyncStatus::Synced;
    log.external_event_id = Some("evt-1".to_string());
    let log_id = log.id;
    SyncLogStore::upsert(store.as_ref(), log).await.unwrap();

    let outcome = orch.delete_sync(log_id, &native_target()).await.unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::Synced {
            external_id: "evt-1".to_string()
        }
    );
    assert_eq!(provider.call_count("delete"), 1);
    assert_eq!(store.get_sync_log(log_id).unwrap().status, SyncStatus::Removed);
}

#[tokio::test]
async fn test_poison_pill_after_five_ordinary_failures() {
    let provider = Arc::new(MockCalendarProvider::new());
    for _ in 0..5 {
        provider.script_create(Err(CalendarApiError::Api {
            status: 500,
            message: "boom".to_string(),
        }));
    }
    let store = Arc::new(InMemoryStore::new());
    let orch = orchestrator(provider.clone(), store.clone());

    let request_id = Uuid::new_v4();
    let payload = holiday_free_payload();
    for attempt in 1..=5 {
        let outcome = orch
            .sync_request(request_id, &native_target(), &payload)
            .await
            .unwrap();
        // Only the fifth failure exhausts the budget.
        assert!(matches!(
            outcome,
            SyncOutcome::Failed { terminal, .. } if terminal == (attempt == 5)
        ));
    }
    assert_eq!(provider.call_count("create"), 5);

    // Sixth attempt short-circuits without touching the provider.
    let outcome = orch
        .sync_request(request_id, &native_target(), &payload)
        .await
        .unwrap();
    assert!(matches!(outcome, SyncOutcome::Failed { terminal: true, .. }));
    assert_eq!(provider.call_count("create"), 5);
}

#[tokio::test]
async fn test_synced_row_short_circuits_reruns() {
    let provider = Arc::new(MockCalendarProvider::new());
    let store = Arc::new(InMemoryStore::new());
    let orch = orchestrator(provider.clone(), store);

    let request_id = Uuid::new_v4();
    let payload = holiday_free_payload();
    let first = orch
        .sync_request(request_id, &native_target(), &payload)
        .await
        .unwrap();
    let second = orch
        .sync_request(request_id, &native_target(), &payload)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(provider.call_count("create"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_create_retries_through_the_bus() {
    let store = Arc::new(InMemoryStore::new());
    let workspace = common::workspace();
    let member = member_in(workspace.id);
    let request = july_request(workspace.id, member.id);
    let details = common::details_for(request.id, ApprovalPolicy::LinearAllHaveToAgree);
    let request_id = request.id;
    store.insert_workspace(workspace);
    store.insert_member(member);
    store.insert_request(request);
    store.insert_details(details);

    let provider = Arc::new(MockCalendarProvider::new());
    provider.script_create(Err(CalendarApiError::RateLimited {
        retry_after: Some(Duration::from_secs(10)),
    }));

    let deps = Arc::new(SyncHandlerDeps {
        orchestrator: CalendarSyncOrchestrator::new(
            provider.clone(),
            store.clone(),
            LeavecoreConfig::default().calendar_sync,
        ),
        requests: store.clone(),
        members: store.clone(),
        workspaces: store.clone(),
        sync_logs: store.clone(),
        tokens: Arc::new(StaticTokens { grant_write: true }),
    });

    let bus = EventBus::in_memory();
    for registration in sync_registrations(deps) {
        bus.register(registration);
    }

    let outcomes = bus
        .publish(Event::new(
            "calendar.sync_create_requested",
            json!({"request_id": request_id, "tenant_id": "tenant-1"}),
        ))
        .await;
    assert!(outcomes.iter().all(|(_, r)| r.is_ok()));

    // First call was rate limited, the runtime slept the mandated backoff
    // and the second call succeeded.
    assert_eq!(provider.call_count("create"), 2);
}

fn holiday_free_payload() -> leavecore::calendar::CalendarEventPayload {
    leavecore::calendar::CalendarEventPayload {
        subject: "Vacation".to_string(),
        is_all_day: true,
        start: leavecore::calendar::EventDateTime {
            date_time: "2026-07-06T00:00:00".to_string(),
            time_zone: "UTC".to_string(),
        },
        end: leavecore::calendar::EventDateTime {
            date_time: "2026-07-09T00:00:00".to_string(),
            time_zone: "UTC".to_string(),
        },
        show_as: "oof".to_string(),
        intended_status: None,
        categories: Vec::new(),
    }
}
