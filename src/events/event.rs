//! # Broker lifecycle events.
//!
//! [`EventKind`] classifies the delivery pipeline's observable moments;
//! [`Event`] carries the metadata (message id, attempt, delay, reason).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! consumed out of order.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of broker events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A message entered the delivery queue.
    ///
    /// Sets: `message`, `at`, `seq`.
    MessageSubmitted,

    /// A message was handed to a consumer for delivery.
    ///
    /// Sets: `message`, `attempt` (1-based delivery number), `at`, `seq`.
    DeliveryStarted,

    /// A delivery was acknowledged; the message left the queue.
    ///
    /// Sets: `message`, `attempt`, `at`, `seq`.
    MessageAcked,

    /// A failed delivery was re-enqueued for a later attempt.
    ///
    /// Sets: `message`, `attempt`, `delay_ms` (until visible again),
    /// `at`, `seq`.
    RetryScheduled,

    /// A message exhausted its retry budget and moved to the DLQ.
    ///
    /// Terminal. Sets: `message`, `attempt`, `reason` (final policy
    /// verdict label), `at`, `seq`.
    MessageDeadLettered,
}

impl EventKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::MessageSubmitted => "message_submitted",
            EventKind::DeliveryStarted => "delivery_started",
            EventKind::MessageAcked => "message_acked",
            EventKind::RetryScheduled => "retry_scheduled",
            EventKind::MessageDeadLettered => "message_dead_lettered",
        }
    }
}

/// Broker event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: DateTime<Utc>,
    /// Event classification.
    pub kind: EventKind,
    /// Message id, if applicable.
    pub message: Option<Arc<str>>,
    /// Delivery attempt number (1-based).
    pub attempt: Option<u32>,
    /// Delay until the message becomes visible again, in milliseconds.
    pub delay_ms: Option<u64>,
    /// Human-readable reason (failure note, final verdict label).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: Utc::now(),
            kind,
            message: None,
            attempt: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a message id.
    #[inline]
    pub fn with_message(mut self, id: impl Into<Arc<str>>) -> Self {
        self.message = Some(id.into());
        self
    }

    /// Attaches a delivery attempt number.
    #[inline]
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    /// Attaches a visibility delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = Some(delay.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// True for the terminal dead-letter event.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, EventKind::MessageDeadLettered)
    }
}
