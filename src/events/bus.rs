//! # Event bus for broadcasting broker events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that lets the
//! broker publish delivery lifecycle events to any number of observers.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks or awaits.
//! - **Bounded capacity**: a single ring buffer stores recent events for all
//!   receivers; slow receivers observe `RecvError::Lagged(n)` and skip the
//!   `n` oldest items.
//! - **No persistence**: events are dropped if no subscriber is listening at
//!   send time. The DLQ itself is the durable record of terminal outcomes;
//!   the bus is observability only.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for broker events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to ≥ 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active subscribers.
    ///
    /// If there are no receivers the event is dropped; publishing still
    /// returns immediately.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes subsequent events.
    ///
    /// A receiver only gets events sent **after** it subscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn subscriber_receives_published_events() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::MessageSubmitted).with_message("m-1"));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::MessageSubmitted);
        assert_eq!(ev.message.as_deref(), Some("m-1"));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_noop() {
        let bus = Bus::new(16);
        bus.publish(Event::new(EventKind::MessageAcked));
        // No receiver existed at send time; a late subscriber sees nothing.
        let mut rx = bus.subscribe();
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }
}
