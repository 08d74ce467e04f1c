//! # Leavecore
//!
//! Asynchronous orchestration core of a leave-management system: everything
//! that happens after a request is created, approved, declined, or canceled.
//!
//! ## Architecture
//!
//! Business logic runs as event handlers on a durable runtime
//! ([`runtime`]): named events with JSON payloads, checkpointed multi-step
//! execution, per-key serialization, rate limits, retry with backoff, and
//! supersession-based cancellation. On top of that sit:
//!
//! - [`approval`]: reconstructs the ordered approver chain from
//!   predecessor-linked step records and resolves the active approver set
//!   per policy
//! - [`calendar`]: pushes requests into external calendars, with target
//!   selection, per-target retry state, and rate-limit handling
//! - [`notification`]: composes and sends localized e-mails and chat cards
//!   per lifecycle event
//! - [`reconcile`]: cron-driven batch jobs fanning large entity sets out in
//!   bounded pages
//!
//! The persistent store and all external providers (calendar, billing,
//! mail/CRM) are collaborators behind traits ([`store`], [`billing`],
//! [`crm`], [`calendar::CalendarProvider`]); in-memory implementations back
//! the tests.

pub mod approval;
pub mod billing;
pub mod calendar;
pub mod config;
pub mod constants;
pub mod crm;
pub mod error;
pub mod logging;
pub mod models;
pub mod notification;
pub mod reconcile;
pub mod runtime;
pub mod store;

pub use config::{ConfigManager, LeavecoreConfig};
pub use error::{LeavecoreError, Result};
pub use logging::init_structured_logging;
pub use runtime::{Event, EventBus, EventHandler, HandlerError, HandlerRegistration, StepContext};
