//! # Queued message types.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// A unit of work submitted to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Caller-chosen identifier; doubles as the retry-policy target id.
    pub id: String,
    /// Opaque payload handed back to the consumer on delivery.
    pub payload: Vec<u8>,
}

impl Message {
    /// Creates a message from an id and payload.
    pub fn new(id: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
        }
    }
}

/// Observable lifecycle state of a message inside the broker.
///
/// Acknowledged messages leave the broker entirely and no longer have a
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    /// Waiting in the queue (possibly behind a visibility delay).
    Pending,
    /// Handed to a consumer; awaiting `ack` or `nack`.
    Delivering,
    /// Retry budget exhausted; parked in the DLQ.
    DeadLettered,
}

/// Terminal record of a message that exhausted its retry budget.
///
/// Carries the forensic payload from the final policy check.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    /// The message itself, preserved for inspection or manual redrive.
    pub message: Message,
    /// Attempt count at dead-lettering time.
    pub attempts: u32,
    /// Final verdict label (e.g. `ceiling_reached`, `store_unavailable`).
    pub reason: Arc<str>,
    /// When the message was dead-lettered.
    pub at: DateTime<Utc>,
}
