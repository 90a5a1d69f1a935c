//! # MessageBroker: delivery pipeline with policy-gated retries.
//!
//! The broker wraps the policy engine's check/record cycle around a
//! visibility-ordered queue:
//!
//! ```text
//! submit(msg) ──► DelayQueue (visible now)
//! receive()   ──► pops a due message, marks it Delivering
//! ack(id)     ──► record_attempt(success) ──► message leaves the broker
//! nack(id)    ──► record_attempt(failure)
//!                   ├─ ceiling reached ──► DLQ + MessageDeadLettered event
//!                   └─ otherwise       ──► requeue at next_allowed_at
//! ```
//!
//! ## Rules
//! - A message is never handed out before its `visible_after`; the requeue
//!   time is exactly the policy's `next_allowed_at`.
//! - Dead-lettering is surfaced as a terminal [`Event`], carrying the final
//!   policy verdict for forensics; the [`DeadLetter`] record keeps the
//!   message itself.
//! - A store outage during `nack` dead-letters the message (fail closed:
//!   no retry runs on state the backend cannot confirm).
//! - `close()` stops `submit`/`receive`; `ack`/`nack` keep working so
//!   consumers can drain deliveries already in flight.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::broker::{DeadLetter, DelayQueue, Message, MessageState};
use crate::clock::Clock;
use crate::error::{BrokerError, RetryError};
use crate::events::{Bus, Event, EventKind};
use crate::policy::RetryPolicyManager;
use crate::subscribers::Subscriber;

/// Target namespace the broker uses for its policy records.
const TARGET_TYPE: &str = "message";

/// How a `nack` was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NackOutcome {
    /// The message was re-enqueued and becomes visible at the given instant.
    Requeued {
        /// Earliest redelivery time (the policy's `next_allowed_at`).
        visible_at: DateTime<Utc>,
    },
    /// The message moved to the dead-letter queue. Terminal.
    DeadLettered,
}

struct Inner {
    queue: DelayQueue,
    in_flight: HashMap<String, Message>,
    /// 1-based delivery counter per live message id.
    deliveries: HashMap<String, u32>,
    dead: Vec<DeadLetter>,
}

/// In-process message broker gated by a [`RetryPolicyManager`].
pub struct MessageBroker {
    policy: Arc<RetryPolicyManager>,
    clock: Arc<dyn Clock>,
    bus: Bus,
    inner: Mutex<Inner>,
    notify: Notify,
    shutdown: CancellationToken,
}

impl MessageBroker {
    /// Creates a broker over the given policy engine.
    ///
    /// The broker shares the engine's clock so queue visibility and window
    /// arithmetic agree on "now". `bus_capacity` bounds the event channel.
    pub fn new(policy: Arc<RetryPolicyManager>, bus_capacity: usize) -> Self {
        let clock = policy.clock();
        Self {
            policy,
            clock,
            bus: Bus::new(bus_capacity),
            inner: Mutex::new(Inner {
                queue: DelayQueue::new(),
                in_flight: HashMap::new(),
                deliveries: HashMap::new(),
                dead: Vec::new(),
            }),
            notify: Notify::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Enqueues a message for immediate delivery.
    pub async fn submit(&self, message: Message) -> Result<(), BrokerError> {
        if self.shutdown.is_cancelled() {
            return Err(BrokerError::Closed);
        }
        let id = message.id.clone();
        {
            let mut inner = self.inner.lock().await;
            inner.queue.push(message, self.clock.now());
        }
        self.bus
            .publish(Event::new(EventKind::MessageSubmitted).with_message(id.as_str()));
        self.notify.notify_waiters();
        Ok(())
    }

    /// Hands out the next due message, or `None` when nothing is due yet.
    pub async fn try_receive(&self) -> Result<Option<Message>, BrokerError> {
        if self.shutdown.is_cancelled() {
            return Err(BrokerError::Closed);
        }
        Ok(self.take_due().await)
    }

    /// Waits for the next due message.
    ///
    /// Returns [`BrokerError::Closed`] once the broker shuts down.
    pub async fn receive(&self) -> Result<Message, BrokerError> {
        loop {
            if self.shutdown.is_cancelled() {
                return Err(BrokerError::Closed);
            }
            let notified = self.notify.notified();
            tokio::pin!(notified);

            if let Some(message) = self.take_due().await {
                return Ok(message);
            }

            let wait = {
                let inner = self.inner.lock().await;
                match inner.queue.next_visible_at() {
                    Some(at) => (at - self.clock.now())
                        .to_std()
                        .unwrap_or(std::time::Duration::ZERO),
                    // Nothing queued: sleep until woken by submit/nack.
                    None => std::time::Duration::from_secs(60),
                }
            };

            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep(wait) => {}
                _ = self.shutdown.cancelled() => return Err(BrokerError::Closed),
            }
        }
    }

    /// Acknowledges a successful delivery.
    ///
    /// Records the success against the retry history (which is left in the
    /// store for forensics unless the caller explicitly resets it) and
    /// removes the message from the broker.
    pub async fn ack(&self, id: &str) -> Result<(), BrokerError> {
        let attempt = {
            let mut inner = self.inner.lock().await;
            if inner.in_flight.remove(id).is_none() {
                return Err(BrokerError::UnknownMessage { id: id.to_string() });
            }
            inner.deliveries.remove(id).unwrap_or(1)
        };

        self.policy
            .record_attempt(TARGET_TYPE, id, true, false)
            .await
            .map_err(BrokerError::Policy)?;

        self.bus.publish(
            Event::new(EventKind::MessageAcked)
                .with_message(id)
                .with_attempt(attempt),
        );
        debug!(id, attempt, "delivery acked");
        Ok(())
    }

    /// Reports a failed delivery and routes the message.
    ///
    /// Records the failure first, then consults the policy: a terminal
    /// verdict (ceiling reached) moves the message to the DLQ; anything else
    /// re-enqueues it with `visible_after = next_allowed_at`. A store outage
    /// dead-letters the message rather than retrying blind.
    pub async fn nack(&self, id: &str) -> Result<NackOutcome, BrokerError> {
        let (message, attempt) = {
            let mut inner = self.inner.lock().await;
            let message = inner
                .in_flight
                .remove(id)
                .ok_or_else(|| BrokerError::UnknownMessage { id: id.to_string() })?;
            let attempt = inner.deliveries.get(id).copied().unwrap_or(1);
            (message, attempt)
        };

        if let Err(err) = self
            .policy
            .record_attempt(TARGET_TYPE, id, false, false)
            .await
        {
            return self.route_policy_failure(message, attempt, err).await;
        }

        let decision = match self.policy.can_retry(TARGET_TYPE, id, false).await {
            Ok(decision) => decision,
            Err(err) => return self.route_policy_failure(message, attempt, err).await,
        };

        if decision.is_terminal() {
            self.dead_letter(message, decision.attempt_count, decision.as_label())
                .await;
            return Ok(NackOutcome::DeadLettered);
        }

        let now = self.clock.now();
        let visible_at = decision.next_allowed_at.unwrap_or(now);
        let delay = (visible_at - now).to_std().unwrap_or_default();
        {
            let mut inner = self.inner.lock().await;
            inner.queue.push(message, visible_at);
        }
        self.bus.publish(
            Event::new(EventKind::RetryScheduled)
                .with_message(id)
                .with_attempt(attempt)
                .with_delay(delay),
        );
        self.notify.notify_waiters();
        debug!(id, attempt, ?delay, "retry scheduled");
        Ok(NackOutcome::Requeued { visible_at })
    }

    /// Snapshot of the dead-letter queue.
    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.inner.lock().await.dead.clone()
    }

    /// Observable state of a message, if it is still inside the broker.
    ///
    /// Acknowledged messages have left the broker and report `None`.
    pub async fn state(&self, id: &str) -> Option<MessageState> {
        let inner = self.inner.lock().await;
        if inner.in_flight.contains_key(id) {
            Some(MessageState::Delivering)
        } else if inner.queue.contains(id) {
            Some(MessageState::Pending)
        } else if inner.dead.iter().any(|d| d.message.id == id) {
            Some(MessageState::DeadLettered)
        } else {
            None
        }
    }

    /// Number of messages waiting in the queue.
    pub async fn pending_len(&self) -> usize {
        self.inner.lock().await.queue.len()
    }

    /// Creates a receiver for the broker's event stream.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Attaches a subscriber, driven by a dedicated listener task until the
    /// broker shuts down. A lagging subscriber skips missed events (warn).
    pub fn attach_subscriber(&self, subscriber: Arc<dyn Subscriber>) {
        let mut rx = self.bus.subscribe();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => subscriber.on_event(&ev).await,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(subscriber = subscriber.name(), skipped, "subscriber lagged");
                        }
                    }
                }
            }
        });
    }

    /// Shuts the broker down: `submit` and `receive` stop; `ack`/`nack`
    /// keep working so in-flight deliveries can drain.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    // ---------------------------
    // Internals
    // ---------------------------

    /// Pops a due message and marks it delivering.
    async fn take_due(&self) -> Option<Message> {
        let now = self.clock.now();
        let (message, attempt) = {
            let mut inner = self.inner.lock().await;
            let message = inner.queue.pop_due(now)?;
            let attempt = {
                let counter = inner.deliveries.entry(message.id.clone()).or_insert(0);
                *counter += 1;
                *counter
            };
            inner.in_flight.insert(message.id.clone(), message.clone());
            (message, attempt)
        };
        self.bus.publish(
            Event::new(EventKind::DeliveryStarted)
                .with_message(message.id.as_str())
                .with_attempt(attempt),
        );
        Some(message)
    }

    /// Routes a policy-engine failure during `nack`. A store outage fails
    /// closed into the DLQ; anything else propagates.
    async fn route_policy_failure(
        &self,
        message: Message,
        attempt: u32,
        err: RetryError,
    ) -> Result<NackOutcome, BrokerError> {
        match err {
            RetryError::StoreUnavailable { .. } => {
                warn!(id = message.id.as_str(), "store outage during nack, dead-lettering");
                self.dead_letter(message, attempt, err.as_label()).await;
                Ok(NackOutcome::DeadLettered)
            }
            other => Err(BrokerError::Policy(other)),
        }
    }

    /// Parks a message in the DLQ and emits the terminal event.
    async fn dead_letter(&self, message: Message, attempts: u32, reason: &'static str) {
        let id = message.id.clone();
        {
            let mut inner = self.inner.lock().await;
            inner.deliveries.remove(&id);
            inner.dead.push(DeadLetter {
                message,
                attempts,
                reason: reason.into(),
                at: self.clock.now(),
            });
        }
        self.bus.publish(
            Event::new(EventKind::MessageDeadLettered)
                .with_message(id.as_str())
                .with_attempt(attempts)
                .with_reason(reason),
        );
        warn!(id = id.as_str(), attempts, reason, "message dead-lettered");
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::policy::RetryPolicyConfig;
    use crate::store::{MemoryStore, RetryRecord, RetryStore, StoreError, TargetKey};

    fn harness(cfg: RetryPolicyConfig) -> (MessageBroker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryStore::new());
        let policy = Arc::new(RetryPolicyManager::with_clock(cfg, store, clock.clone()));
        (MessageBroker::new(policy, 64), clock)
    }

    fn config() -> RetryPolicyConfig {
        RetryPolicyConfig::from_minutes(30, 2, 20, 5).unwrap()
    }

    #[tokio::test]
    async fn submit_receive_ack_round_trip() {
        let (broker, _clock) = harness(config());
        let mut rx = broker.subscribe();

        broker.submit(Message::new("m-1", "payload")).await.unwrap();
        assert_eq!(broker.state("m-1").await, Some(MessageState::Pending));

        let msg = broker.try_receive().await.unwrap().unwrap();
        assert_eq!(msg.id, "m-1");
        assert_eq!(msg.payload, b"payload");
        assert_eq!(broker.state("m-1").await, Some(MessageState::Delivering));

        broker.ack("m-1").await.unwrap();
        assert_eq!(broker.state("m-1").await, None);

        let kinds: Vec<EventKind> = [rx.recv().await, rx.recv().await, rx.recv().await]
            .into_iter()
            .map(|ev| ev.unwrap().kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::MessageSubmitted,
                EventKind::DeliveryStarted,
                EventKind::MessageAcked
            ]
        );
    }

    #[tokio::test]
    async fn nack_requeues_at_next_allowed_at() {
        let (broker, clock) = harness(config());

        broker.submit(Message::new("m-1", "")).await.unwrap();
        broker.try_receive().await.unwrap().unwrap();

        let outcome = broker.nack("m-1").await.unwrap();
        let visible_at = match outcome {
            NackOutcome::Requeued { visible_at } => visible_at,
            other => panic!("expected requeue, got {other:?}"),
        };
        assert_eq!(visible_at, clock.now() + Duration::minutes(30));
        assert_eq!(broker.state("m-1").await, Some(MessageState::Pending));

        // Not visible before the cooldown elapses.
        clock.advance(Duration::minutes(29));
        assert!(broker.try_receive().await.unwrap().is_none());

        clock.advance(Duration::minutes(1));
        let msg = broker.try_receive().await.unwrap().unwrap();
        assert_eq!(msg.id, "m-1");
    }

    #[tokio::test]
    async fn exhausted_message_moves_to_dlq() {
        // Ceiling of 2: the second failure is terminal.
        let (broker, clock) = harness(RetryPolicyConfig::from_minutes(30, 1, 20, 2).unwrap());
        let mut rx = broker.subscribe();

        broker.submit(Message::new("m-1", "")).await.unwrap();
        broker.try_receive().await.unwrap().unwrap();
        assert!(matches!(
            broker.nack("m-1").await.unwrap(),
            NackOutcome::Requeued { .. }
        ));

        clock.advance(Duration::minutes(30));
        broker.try_receive().await.unwrap().unwrap();
        assert_eq!(broker.nack("m-1").await.unwrap(), NackOutcome::DeadLettered);
        assert_eq!(broker.state("m-1").await, Some(MessageState::DeadLettered));

        let dead = broker.dead_letters().await;
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].message.id, "m-1");
        assert_eq!(dead[0].attempts, 2);
        assert_eq!(&*dead[0].reason, "ceiling_reached");

        // The terminal event is surfaced, not swallowed.
        let mut saw_terminal = false;
        while let Ok(ev) = rx.try_recv() {
            if ev.is_terminal() {
                assert_eq!(ev.reason.as_deref(), Some("ceiling_reached"));
                saw_terminal = true;
            }
        }
        assert!(saw_terminal);
    }

    #[tokio::test]
    async fn ack_and_nack_require_an_in_flight_message() {
        let (broker, _clock) = harness(config());
        assert!(matches!(
            broker.ack("ghost").await.unwrap_err(),
            BrokerError::UnknownMessage { .. }
        ));
        assert!(matches!(
            broker.nack("ghost").await.unwrap_err(),
            BrokerError::UnknownMessage { .. }
        ));
    }

    #[tokio::test]
    async fn closed_broker_rejects_submit_and_receive() {
        let (broker, _clock) = harness(config());
        broker.submit(Message::new("m-1", "")).await.unwrap();
        let _ = broker.try_receive().await.unwrap().unwrap();

        broker.close();
        assert!(matches!(
            broker.submit(Message::new("m-2", "")).await.unwrap_err(),
            BrokerError::Closed
        ));
        assert!(matches!(
            broker.receive().await.unwrap_err(),
            BrokerError::Closed
        ));
        // In-flight deliveries can still drain.
        broker.ack("m-1").await.unwrap();
    }

    #[tokio::test]
    async fn receive_waits_for_submission() {
        let (broker, _clock) = harness(config());
        let broker = Arc::new(broker);

        let receiver = {
            let broker = broker.clone();
            tokio::spawn(async move { broker.receive().await })
        };
        tokio::task::yield_now().await;

        broker.submit(Message::new("m-1", "")).await.unwrap();
        let msg = receiver.await.unwrap().unwrap();
        assert_eq!(msg.id, "m-1");
    }

    struct DownStore;

    #[async_trait]
    impl RetryStore for DownStore {
        async fn get(&self, _key: &TargetKey) -> Result<Option<RetryRecord>, StoreError> {
            Err(StoreError::unavailable("backend down"))
        }
        async fn upsert(&self, _record: &RetryRecord) -> Result<(), StoreError> {
            Err(StoreError::unavailable("backend down"))
        }
        async fn delete(&self, _key: &TargetKey) -> Result<bool, StoreError> {
            Err(StoreError::unavailable("backend down"))
        }
    }

    #[tokio::test]
    async fn store_outage_dead_letters_instead_of_retrying_blind() {
        let policy = Arc::new(RetryPolicyManager::new(config(), Arc::new(DownStore)));
        let broker = MessageBroker::new(policy, 64);

        broker.submit(Message::new("m-1", "")).await.unwrap();
        broker.try_receive().await.unwrap().unwrap();

        assert_eq!(broker.nack("m-1").await.unwrap(), NackOutcome::DeadLettered);
        let dead = broker.dead_letters().await;
        assert_eq!(&*dead[0].reason, "store_unavailable");
    }

    struct CountingSubscriber {
        acked: Notify,
    }

    #[async_trait]
    impl Subscriber for CountingSubscriber {
        async fn on_event(&self, event: &Event) {
            if event.kind == EventKind::MessageAcked {
                self.acked.notify_one();
            }
        }
        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn attached_subscriber_observes_events() {
        let (broker, _clock) = harness(config());
        let sub = Arc::new(CountingSubscriber {
            acked: Notify::new(),
        });
        broker.attach_subscriber(sub.clone());
        tokio::task::yield_now().await;

        broker.submit(Message::new("m-1", "")).await.unwrap();
        broker.try_receive().await.unwrap().unwrap();
        broker.ack("m-1").await.unwrap();

        sub.acked.notified().await;
    }
}
