use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::json;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::event::Event;
use super::handler::{EventHandler, HandlerError, Trigger};
use super::retry::RetryPolicy;
use super::step::{CheckpointStore, InMemoryCheckpointStore, StepContext};

/// Per-handler rate limit: at most `limit` invocations per `per` window.
#[derive(Debug, Clone)]
pub struct RateLimit {
    pub limit: u32,
    pub per: Duration,
}

/// Cancellation rule: an arriving `event_name` event whose `match_field`
/// payload value equals the running invocation's value aborts it.
#[derive(Debug, Clone)]
pub struct CancelRule {
    pub event_name: &'static str,
    pub match_field: &'static str,
}

/// A handler plus its runtime options.
pub struct HandlerRegistration {
    handler: Arc<dyn EventHandler>,
    /// Payload field whose value keys per-key serialization (limit 1, the
    /// only ordering primitive the runtime offers)
    concurrency_key_field: Option<&'static str>,
    rate_limit: Option<RateLimit>,
    cancel_on: Option<CancelRule>,
    retry: RetryPolicy,
}

impl HandlerRegistration {
    pub fn new(handler: Arc<dyn EventHandler>) -> Self {
        Self {
            handler,
            concurrency_key_field: None,
            rate_limit: None,
            cancel_on: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_concurrency_key(mut self, payload_field: &'static str) -> Self {
        self.concurrency_key_field = Some(payload_field);
        self
    }

    pub fn with_rate_limit(mut self, limit: u32, per: Duration) -> Self {
        self.rate_limit = Some(RateLimit { limit, per });
        self
    }

    pub fn with_cancel_on(mut self, event_name: &'static str, match_field: &'static str) -> Self {
        self.cancel_on = Some(CancelRule {
            event_name,
            match_field,
        });
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// In-process event bus implementing the durable runtime contract.
pub struct EventBus {
    registrations: RwLock<Vec<Arc<HandlerRegistration>>>,
    key_locks: DashMap<String, Arc<Mutex<()>>>,
    rate_windows: DashMap<String, Arc<Mutex<VecDeque<Instant>>>>,
    /// Match value -> one sender per in-flight invocation, so concurrent
    /// invocations sharing a value are all reachable by a cancellation.
    cancel_channels: DashMap<String, Vec<(uuid::Uuid, watch::Sender<bool>)>>,
    checkpoints: Arc<dyn CheckpointStore>,
}

impl EventBus {
    pub fn new(checkpoints: Arc<dyn CheckpointStore>) -> Self {
        Self {
            registrations: RwLock::new(Vec::new()),
            key_locks: DashMap::new(),
            rate_windows: DashMap::new(),
            cancel_channels: DashMap::new(),
            checkpoints,
        }
    }

    /// Bus with a process-local checkpoint store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCheckpointStore::new()))
    }

    pub fn register(&self, registration: HandlerRegistration) {
        debug!(
            handler = registration.handler.name(),
            trigger = ?registration.handler.trigger(),
            "handler registered"
        );
        self.registrations.write().push(Arc::new(registration));
    }

    /// Deliver an event to every subscribed handler, driving each one's
    /// retry loop to completion. Returns per-handler outcomes so callers and
    /// tests can observe terminal failures.
    pub async fn publish(&self, event: Event) -> Vec<(&'static str, Result<(), HandlerError>)> {
        self.signal_cancellations(&event);

        let matching: Vec<Arc<HandlerRegistration>> = {
            let regs = self.registrations.read();
            regs.iter()
                .filter(|r| matches!(r.handler.trigger(), Trigger::Event(name) if name == event.name))
                .cloned()
                .collect()
        };

        if matching.is_empty() {
            debug!(event = %event.name, "no subscribers for event");
            return Vec::new();
        }

        let invocations = matching.iter().map(|reg| {
            let event = event.clone();
            async move { (reg.handler.name(), self.invoke(reg.clone(), event).await) }
        });
        join_all(invocations).await
    }

    /// Publish a batch of events sequentially, preserving emission order.
    pub async fn publish_batch(&self, events: Vec<Event>) {
        for event in events {
            self.publish(event).await;
        }
    }

    /// Fire one cron-registered handler by name with a synthetic tick event.
    pub async fn tick(&self, handler_name: &str) -> Option<Result<(), HandlerError>> {
        let reg = {
            let regs = self.registrations.read();
            regs.iter()
                .find(|r| {
                    matches!(r.handler.trigger(), Trigger::Cron(_))
                        && r.handler.name() == handler_name
                })
                .cloned()
        }?;

        let event = Event::new(format!("cron.{handler_name}"), json!({}));
        Some(self.invoke(reg, event).await)
    }

    /// Abort in-flight invocations superseded by this event.
    fn signal_cancellations(&self, event: &Event) {
        let regs = self.registrations.read();
        for reg in regs.iter() {
            let Some(rule) = &reg.cancel_on else { continue };
            if rule.event_name != event.name {
                continue;
            }
            let Some(value) = event.payload_field(rule.match_field) else {
                continue;
            };
            let key = format!("{}:{value}", reg.handler.name());
            if let Some(senders) = self.cancel_channels.get(&key) {
                info!(
                    handler = reg.handler.name(),
                    match_value = %value,
                    superseded_by = %event.name,
                    in_flight = senders.len(),
                    "cancelling in-flight invocations"
                );
                for (_, tx) in senders.iter() {
                    let _ = tx.send(true);
                }
            }
        }
    }

    async fn invoke(
        &self,
        reg: Arc<HandlerRegistration>,
        event: Event,
    ) -> Result<(), HandlerError> {
        let handler_name = reg.handler.name();

        if let Some(limit) = &reg.rate_limit {
            self.wait_for_rate_slot(handler_name, limit).await;
        }

        // Per-key serialization: at most one concurrent invocation per key.
        let _key_guard: Option<OwnedMutexGuard<()>> = match reg
            .concurrency_key_field
            .and_then(|field| event.payload_field(field))
        {
            Some(value) => {
                let lock = self
                    .key_locks
                    .entry(format!("{handler_name}:{value}"))
                    .or_insert_with(|| Arc::new(Mutex::new(())))
                    .clone();
                Some(lock.lock_owned().await)
            }
            None => None,
        };

        let cancel = reg.cancel_on.as_ref().and_then(|rule| {
            let value = event.payload_field(rule.match_field)?;
            let key = format!("{handler_name}:{value}");
            let (tx, rx) = watch::channel(false);
            let token = uuid::Uuid::new_v4();
            self.cancel_channels
                .entry(key.clone())
                .or_default()
                .push((token, tx));
            Some((key, token, rx))
        });
        let (cancel_key, mut cancel_rx) = match cancel {
            Some((k, token, rx)) => (Some((k, token)), Some(rx)),
            None => (None, None),
        };

        // Stable across retries so checkpointed steps survive them.
        let invocation_key = format!("{}:{handler_name}", event.id);
        let mut attempt = 1u32;

        let result = loop {
            let ctx = StepContext::new(invocation_key.clone(), attempt, self.checkpoints.clone());
            let outcome = match cancel_rx.as_mut() {
                Some(rx) => {
                    tokio::select! {
                        _ = rx.changed() => {
                            info!(handler = handler_name, event = %event.name, "invocation cancelled");
                            break Ok(());
                        }
                        r = reg.handler.handle(event.clone(), ctx) => r,
                    }
                }
                None => reg.handler.handle(event.clone(), ctx).await,
            };

            match outcome {
                Ok(()) => break Ok(()),
                Err(HandlerError::RetryAfter(delay)) => {
                    // Provider-mandated backoff; does not consume an attempt.
                    warn!(
                        handler = handler_name,
                        event = %event.name,
                        delay_ms = delay.as_millis() as u64,
                        "rate limited, rescheduling"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(HandlerError::Retryable(msg)) if reg.retry.attempts_remaining(attempt) => {
                    let delay = reg.retry.delay_after(attempt);
                    warn!(
                        handler = handler_name,
                        event = %event.name,
                        attempt = attempt,
                        delay_s = delay.as_secs(),
                        error = %msg,
                        "handler failed, backing off"
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    error!(
                        handler = handler_name,
                        event = %event.name,
                        attempt = attempt,
                        error = %err,
                        "handler failed terminally"
                    );
                    break Err(err);
                }
            }
        };

        if let Some((key, token)) = cancel_key {
            if let Some(mut senders) = self.cancel_channels.get_mut(&key) {
                senders.retain(|(id, _)| *id != token);
            }
            self.cancel_channels.remove_if(&key, |_, senders| senders.is_empty());
        }
        result
    }

    async fn wait_for_rate_slot(&self, handler_name: &str, limit: &RateLimit) {
        let window = self
            .rate_windows
            .entry(handler_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(VecDeque::new())))
            .clone();

        loop {
            let wait = {
                let mut slots = window.lock().await;
                let now = Instant::now();
                while slots
                    .front()
                    .is_some_and(|t| now.duration_since(*t) >= limit.per)
                {
                    slots.pop_front();
                }
                if (slots.len() as u32) < limit.limit {
                    slots.push_back(now);
                    None
                } else {
                    slots
                        .front()
                        .map(|oldest| limit.per.saturating_sub(now.duration_since(*oldest)))
                }
            };
            match wait {
                None => return,
                Some(delay) => tokio::time::sleep(delay.max(Duration::from_millis(1))).await,
            }
        }
    }
}
