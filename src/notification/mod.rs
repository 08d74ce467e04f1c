//! # Notification Dispatcher
//!
//! Composes and sends the right message (e-mail and/or chat card) to the
//! right recipients for each request lifecycle event. Recipients are
//! resolved per event, filtered through ordered guard clauses, and messages
//! honor each recipient's own locale, date format, and clock preference.
//!
//! Dispatch is side-effecting only, and a missed notification is never
//! fatal to the business transaction: send failures are logged and
//! swallowed. Redelivered events are safe because the chat-card id stored
//! on the approver row decides "update in place" vs "create".

pub mod channels;
pub mod dispatcher;
pub mod format;
pub mod handlers;
pub mod localize;
pub mod recipient;

use serde::{Deserialize, Serialize};

pub use channels::{ChatCard, ChatMessenger, EmailMessage, Mailer, SendError};
pub use dispatcher::{DispatchContext, NotificationDispatcher};
pub use format::format_request_range;
pub use handlers::{notification_registrations, LifecycleNotificationHandler, NotificationDeps};
pub use localize::{Localizer, StaticLocalizer, Translator, TranslatorOptions};
pub use recipient::{passes_guards, resolve_recipients, Recipient};

/// Request lifecycle events that trigger notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Someone entered a request for another member
    CreatedOnBehalf,
    Approved,
    Declined,
    /// The active approver set should act
    ApprovalNeeded,
    Canceled,
}
