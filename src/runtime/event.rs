use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A named event with a JSON payload.
///
/// The id is stable across redeliveries of the same logical event and keys
/// the durable-step checkpoints for every handler invocation it triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub payload: Value,
    pub occurred_at: DateTime<Utc>,
}

impl Event {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            payload,
            occurred_at: Utc::now(),
        }
    }

    /// A string field from the payload, used for concurrency keys and
    /// cancellation matching.
    pub fn payload_field(&self, field: &str) -> Option<String> {
        match self.payload.get(field) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) if !other.is_null() => Some(other.to_string()),
            _ => None,
        }
    }
}
