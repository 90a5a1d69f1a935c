//! # retrygate
//!
//! **retrygate** decides, for each unit of work that has failed, whether
//! another attempt is permitted, when it becomes permitted, and how that
//! decision is remembered across process restarts. A message broker wraps
//! the same cycle around a delivery queue, moving a failing message toward
//! a dead-letter state once its retry budget is exhausted.
//!
//! ## Architecture
//! ```text
//!        caller / worker                         consumers
//!              │                                     ▲
//!              ▼                                     │ deliver
//! ┌──────────────────────────┐  submit ┌─────────────┴────────────┐
//! │   RetryPolicyManager     │◄────────┤       MessageBroker      │
//! │  - can_retry             │ nack/ack│  - DelayQueue (pending)  │
//! │  - record_attempt        │────────►│  - in-flight map         │
//! │  - reset                 │         │  - dead-letter queue     │
//! └──────┬───────────────────┘         └──────┬───────────────────┘
//!        │ per-key lock                       │ publish
//!        ▼                                    ▼
//! ┌──────────────────────────┐         ┌──────────────────────────┐
//! │  RetryStore (trait)      │         │  Bus (broadcast events)  │
//! │  - MemoryStore           │         │   └► Subscriber fan-out  │
//! │  - FallbackStore         │         │       (LogWriter, ...)   │
//! │    (FailClosed /         │         └──────────────────────────┘
//! │     DegradeToMemory)     │
//! └──────────────────────────┘
//! ```
//!
//! ## Gating model
//! Two independently budgeted cooldown windows and one hard ceiling govern
//! each target:
//! - the **base window** paces ordinary retries (`base_wait` between
//!   attempts, before *and* after the ordinary budget is exhausted);
//! - the **early window** paces explicitly requested accelerated retries
//!   (`early_wait` between grants), without touching the base cadence;
//! - the **ceiling** (`max_retries`) terminates the target until an
//!   explicit reset.
//!
//! Each decision also names the context-enrichment hook the caller may
//! fire before the next attempt: *light* on a granted early retry, *heavy*
//! once ordinary retries are exhausted. Retrieval itself stays behind the
//! [`ContextProvider`] seam.
//!
//! ## Example
//! ```
//! use std::sync::Arc;
//! use retrygate::{
//!     broker::{Message, MessageBroker, NackOutcome},
//!     policy::{RetryPolicyConfig, RetryPolicyManager},
//!     store::MemoryStore,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RetryPolicyConfig::from_minutes(30, 2, 20, 5)?;
//! let policy = Arc::new(RetryPolicyManager::new(config, Arc::new(MemoryStore::new())));
//! let broker = MessageBroker::new(policy, 256);
//!
//! broker.submit(Message::new("order-17", "payload")).await?;
//! let msg = broker.try_receive().await?.expect("due immediately");
//!
//! // Delivery failed: the policy decides requeue-with-delay vs dead-letter.
//! match broker.nack(&msg.id).await? {
//!     NackOutcome::Requeued { visible_at } => {
//!         println!("retrying no earlier than {visible_at}");
//!     }
//!     NackOutcome::DeadLettered => println!("moved to DLQ"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Durability and outages
//! Retry state lives behind the [`store::RetryStore`] trait. What happens
//! when the durable backend is unreachable is a construction-time choice
//! ([`store::OutagePolicy`]): fail closed (default) or degrade to an
//! in-memory shadow. Never a silent runtime branch.

pub mod broker;
pub mod clock;
pub mod context;
pub mod error;
pub mod events;
pub mod policy;
pub mod store;
pub mod subscribers;

pub use broker::{DeadLetter, Message, MessageBroker, MessageState, NackOutcome};
pub use clock::{Clock, SystemClock};
pub use context::{ContextBundle, ContextItem, ContextProvider};
pub use error::{BrokerError, RetryError};
pub use events::{Bus, Event, EventKind};
pub use policy::{Decision, DenyReason, HookKind, RetryPolicyConfig, RetryPolicyManager, Window};
pub use store::{
    FallbackStore, MemoryStore, OutagePolicy, RetryRecord, RetryStore, StoreError, TargetKey,
};
pub use subscribers::{LogWriter, Subscriber};
