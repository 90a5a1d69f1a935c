//! # Message broker: delivery queue, retry routing, dead-letter queue.
//!
//! The broker owns the in-flight delivery pipeline and wraps the policy
//! engine's check/record cycle around it: every `nack` records the failure
//! and then routes the message — back into the queue with a visibility
//! delay, or into the DLQ once the target is terminal.
//!
//! ## Contents
//! - [`Message`] / [`MessageState`] / [`DeadLetter`] the queued unit and its
//!   lifecycle states
//! - [`DelayQueue`] visibility-ordered pending queue
//! - [`MessageBroker`] the `submit` / `receive` / `ack` / `nack` surface
//!
//! ## Per-message state machine
//! ```text
//! submit ──► PENDING ──receive──► DELIVERING ──ack───► ACKED (gone)
//!               ▲                     │
//!               │                     └─nack─► record_attempt(failure)
//!               │                               │
//!               │            ceiling reached?   │
//!               └── no: requeue at next_allowed_at
//!                            yes: ──► DEAD-LETTERED (terminal event)
//! ```
//!
//! Per-message ordering is preserved (a message is never handed out before
//! its `visible_after`); no ordering exists across distinct messages.

mod core;
mod message;
mod queue;

pub use self::core::{MessageBroker, NackOutcome};
pub use message::{DeadLetter, Message, MessageState};
pub use queue::DelayQueue;
