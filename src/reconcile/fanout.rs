use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::runtime::{Event, EventBus, HandlerError};

/// Wire shape of one fan-out page.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchPayload<T> {
    pub items: Vec<T>,
    /// Zero-based page index
    pub page: usize,
    pub pages: usize,
}

impl<T: DeserializeOwned> BatchPayload<T> {
    /// Parse a batch payload out of a delivered event.
    pub fn from_event(event: &Event) -> Result<Self, HandlerError> {
        serde_json::from_value(event.payload.clone())
            .map_err(|e| HandlerError::fatal(format!("malformed batch payload: {e}")))
    }
}

/// Page an enumeration at a fixed batch size into event payloads.
///
/// 2,350 items at a batch size of 1,000 become three pages of 1,000, 1,000,
/// and 350. A batch size of zero is treated as one.
pub fn page_payloads<T: Serialize>(
    items: &[T],
    batch_size: usize,
) -> serde_json::Result<Vec<Value>> {
    let batch_size = batch_size.max(1);
    let pages = items.len().div_ceil(batch_size);
    items
        .chunks(batch_size)
        .enumerate()
        .map(|(page, chunk)| {
            serde_json::to_value(BatchPayload {
                items: chunk.iter().collect::<Vec<&T>>(),
                page,
                pages,
            })
        })
        .collect()
}

/// Emit one follow-up event per page of `items`. Returns the page count.
pub async fn fan_out<T: Serialize>(
    bus: &EventBus,
    event_name: &'static str,
    items: &[T],
    batch_size: usize,
) -> Result<usize, HandlerError> {
    let payloads = page_payloads(items, batch_size)
        .map_err(|e| HandlerError::fatal(format!("unserializable fan-out items: {e}")))?;
    let pages = payloads.len();
    debug!(event = event_name, items = items.len(), pages, "fanning out batches");

    let events = payloads
        .into_iter()
        .map(|payload| Event::new(event_name, payload))
        .collect();
    bus.publish_batch(events).await;
    Ok(pages)
}
