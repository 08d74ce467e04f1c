//! # Event Runtime
//!
//! In-process abstraction over the durable function runtime the deployed
//! system runs on. Its contract is what the orchestration logic is written
//! against:
//!
//! - named events with JSON payloads delivered to registered handlers
//! - durable multi-step execution: each step's result is checkpointed, so a
//!   re-execution after a crash or retry skips completed steps
//! - delayed execution ("sleep"), checkpointed the same way
//! - per-key concurrency limits (limit 1 is the only ordering primitive)
//! - per-handler rate limits
//! - automatic retry with handler-specified or default backoff, honoring an
//!   explicit "retry after N ms" signal raised by a handler
//! - payload-field-matched cancellation of superseded in-flight invocations
//!
//! Handlers never share in-process mutable state; everything crosses through
//! the persistent store.

pub mod bus;
pub mod event;
pub mod handler;
pub mod retry;
pub mod step;

pub use bus::{CancelRule, EventBus, HandlerRegistration, RateLimit};
pub use event::Event;
pub use handler::{EventHandler, HandlerError, Trigger};
pub use retry::RetryPolicy;
pub use step::{CheckpointStore, InMemoryCheckpointStore, StepContext};
