//! # Durable persistence boundary for retry records.
//!
//! The policy engine never talks to a database directly: it goes through the
//! [`RetryStore`] capability, keyed by [`TargetKey`]. Backends only need to
//! provide indexed `get`/`upsert`/`delete`; schema and migration concerns stay
//! on the backend's side of the seam.
//!
//! ## Contents
//! - [`RetryStore`] the async persistence trait
//! - [`RetryRecord`] the persisted per-target state
//! - [`MemoryStore`] concurrent in-process implementation (tests, store-less
//!   deployments, outage shadow)
//! - [`FallbackStore`] primary-plus-shadow wrapper with an explicit
//!   [`OutagePolicy`]
//!
//! ## Outage behavior
//! What happens when the durable backend is unreachable is a construction-time
//! choice, never a silent runtime branch:
//! - [`OutagePolicy::FailClosed`] (default): errors propagate; callers must
//!   treat them as "retry not allowed".
//! - [`OutagePolicy::DegradeToMemory`]: reads and writes are served from an
//!   in-memory shadow for the duration of the outage.

mod fallback;
mod memory;
mod record;

pub use fallback::{FallbackStore, OutagePolicy};
pub use memory::MemoryStore;
pub use record::{RetryRecord, TargetKey};

use async_trait::async_trait;
use thiserror::Error;

/// # Errors produced by a retry store backend.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation.
    #[error("store backend unavailable: {reason}")]
    Unavailable {
        /// Backend-supplied description of the outage.
        reason: String,
    },
}

impl StoreError {
    /// Convenience constructor for outage errors.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        StoreError::Unavailable {
            reason: reason.into(),
        }
    }
}

/// # Durable CRUD capability for [`RetryRecord`]s.
///
/// Implementations must support indexed lookup by [`TargetKey`] (O(1)-class
/// access for hundreds to low thousands of tracked targets) and must apply
/// `upsert` atomically — a record is never partially written.
///
/// The engine serializes read-decide-write spans per key above this trait,
/// so implementations do not need per-key locking of their own; they only
/// need to be safe for concurrent calls on distinct keys.
#[async_trait]
pub trait RetryStore: Send + Sync + 'static {
    /// Fetches the record for `key`, or `None` if the target is unseen.
    async fn get(&self, key: &TargetKey) -> Result<Option<RetryRecord>, StoreError>;

    /// Creates or replaces the record. Idempotent.
    async fn upsert(&self, record: &RetryRecord) -> Result<(), StoreError>;

    /// Removes the record. Returns `true` if one existed.
    ///
    /// The policy engine itself never calls this; it is available for
    /// store-level retention and for backends that implement reset by
    /// physical deletion.
    async fn delete(&self, key: &TargetKey) -> Result<bool, StoreError>;
}
