use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use leavecore::config::BackoffConfig;
use leavecore::runtime::{
    Event, EventBus, EventHandler, HandlerError, HandlerRegistration, RetryPolicy, StepContext,
    Trigger,
};

/// Rate-limits itself a fixed number of times, then succeeds.
struct RateLimitedHandler {
    calls: Arc<AtomicU32>,
    limit_first: Arc<AtomicU32>,
}

#[async_trait]
impl EventHandler for RateLimitedHandler {
    fn name(&self) -> &'static str {
        "rate-limited"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Event("provider.call")
    }

    async fn handle(&self, _event: Event, _ctx: StepContext) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.limit_first.load(Ordering::SeqCst) > 0 {
            self.limit_first.fetch_sub(1, Ordering::SeqCst);
            return Err(HandlerError::RetryAfter(Duration::from_secs(10)));
        }
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_never_consumes_the_attempt_budget() {
    let bus = EventBus::in_memory();
    let calls = Arc::new(AtomicU32::new(0));
    bus.register(
        HandlerRegistration::new(Arc::new(RateLimitedHandler {
            calls: calls.clone(),
            limit_first: Arc::new(AtomicU32::new(3)),
        }))
        // One attempt: any counted failure would be terminal.
        .with_retry(RetryPolicy::new(
            1,
            BackoffConfig {
                default_backoff_seconds: vec![1],
                max_backoff_seconds: 1,
                backoff_multiplier: 1.0,
            },
        )),
    );

    let outcomes = bus.publish(Event::new("provider.call", json!({}))).await;
    assert!(outcomes[0].1.is_ok());
    // Three rate-limited invocations plus the final success.
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

/// Fails after its first step once, so the retry proves checkpoint reuse.
struct TwoStepHandler {
    step_one_runs: Arc<AtomicU32>,
    fail_once: Arc<AtomicU32>,
}

#[async_trait]
impl EventHandler for TwoStepHandler {
    fn name(&self) -> &'static str {
        "two-step"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Event("pipeline.run")
    }

    async fn handle(&self, _event: Event, ctx: StepContext) -> Result<(), HandlerError> {
        let runs = self.step_one_runs.clone();
        ctx.run("expensive", || async move {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(1u32)
        })
        .await?;

        if self.fail_once.swap(0, Ordering::SeqCst) > 0 {
            return Err(HandlerError::retryable("crash between steps"));
        }
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_checkpointed_step_survives_handler_retry() {
    let bus = EventBus::in_memory();
    let step_one_runs = Arc::new(AtomicU32::new(0));
    bus.register(HandlerRegistration::new(Arc::new(TwoStepHandler {
        step_one_runs: step_one_runs.clone(),
        fail_once: Arc::new(AtomicU32::new(1)),
    })));

    let outcomes = bus.publish(Event::new("pipeline.run", json!({}))).await;
    assert!(outcomes[0].1.is_ok());
    // The handler ran twice but the checkpointed step only once.
    assert_eq!(step_one_runs.load(Ordering::SeqCst), 1);
}

struct InstantHandler;

#[async_trait]
impl EventHandler for InstantHandler {
    fn name(&self) -> &'static str {
        "instant"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Event("burst.fired")
    }

    async fn handle(&self, _event: Event, _ctx: StepContext) -> Result<(), HandlerError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_defers_calls_beyond_the_window() {
    let bus = EventBus::in_memory();
    bus.register(
        HandlerRegistration::new(Arc::new(InstantHandler))
            .with_rate_limit(2, Duration::from_secs(60)),
    );

    let started = tokio::time::Instant::now();
    for _ in 0..3 {
        bus.publish(Event::new("burst.fired", json!({}))).await;
    }
    // The third invocation had to wait for the window to roll over.
    assert!(started.elapsed() >= Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_redelivered_event_reuses_its_invocation_key() {
    let bus = EventBus::in_memory();
    let step_one_runs = Arc::new(AtomicU32::new(0));
    bus.register(HandlerRegistration::new(Arc::new(TwoStepHandler {
        step_one_runs: step_one_runs.clone(),
        fail_once: Arc::new(AtomicU32::new(0)),
    })));

    let event = Event::new("pipeline.run", json!({}));
    bus.publish(event.clone()).await;
    // Same event id delivered again: the checkpoint is found and the step
    // does not rerun.
    bus.publish(event).await;
    assert_eq!(step_one_runs.load(Ordering::SeqCst), 1);
}
