//! # Primary-plus-shadow store with explicit outage behavior.
//!
//! [`FallbackStore`] wraps a durable primary [`RetryStore`] and selects, at
//! construction time, what happens when the primary is unreachable:
//!
//! - [`OutagePolicy::FailClosed`]: the outage propagates as
//!   [`StoreError::Unavailable`]; the policy engine reports "not allowed".
//!   Safest default — no retry runs on state the backend cannot confirm.
//! - [`OutagePolicy::DegradeToMemory`]: reads and writes are served from an
//!   in-memory shadow for the duration of the outage, trading consistency
//!   for availability.
//!
//! The choice is part of the deployment's documented contract, never a
//! silent runtime branch. The first time an outage trips the degraded path
//! a warning is logged; recovery is logged when the primary answers again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::store::{MemoryStore, RetryRecord, RetryStore, StoreError, TargetKey};

/// Behavior of the engine when the durable backend is unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutagePolicy {
    /// Propagate the outage; callers treat it as "retry not allowed".
    #[default]
    FailClosed,
    /// Serve from an in-memory shadow until the backend recovers.
    DegradeToMemory,
}

impl OutagePolicy {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            OutagePolicy::FailClosed => "fail_closed",
            OutagePolicy::DegradeToMemory => "degrade_to_memory",
        }
    }
}

/// Wrapper that applies an [`OutagePolicy`] around a primary store.
pub struct FallbackStore {
    primary: Arc<dyn RetryStore>,
    shadow: MemoryStore,
    policy: OutagePolicy,
    degraded: AtomicBool,
}

impl FallbackStore {
    /// Wraps `primary` with the given outage policy.
    pub fn new(primary: Arc<dyn RetryStore>, policy: OutagePolicy) -> Self {
        Self {
            primary,
            shadow: MemoryStore::new(),
            policy,
            degraded: AtomicBool::new(false),
        }
    }

    /// True while requests are being served from the in-memory shadow.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    fn enter_degraded(&self, reason: &str) {
        if !self.degraded.swap(true, Ordering::AcqRel) {
            warn!(
                policy = self.policy.as_label(),
                reason, "retry store primary unreachable, serving from memory shadow"
            );
        }
    }

    fn leave_degraded(&self) {
        if self.degraded.swap(false, Ordering::AcqRel) {
            info!("retry store primary recovered, leaving memory shadow");
        }
    }
}

#[async_trait]
impl RetryStore for FallbackStore {
    async fn get(&self, key: &TargetKey) -> Result<Option<RetryRecord>, StoreError> {
        match self.primary.get(key).await {
            Ok(found) => {
                self.leave_degraded();
                Ok(found)
            }
            Err(StoreError::Unavailable { reason }) => match self.policy {
                OutagePolicy::FailClosed => Err(StoreError::Unavailable { reason }),
                OutagePolicy::DegradeToMemory => {
                    self.enter_degraded(&reason);
                    self.shadow.get(key).await
                }
            },
        }
    }

    async fn upsert(&self, record: &RetryRecord) -> Result<(), StoreError> {
        match self.primary.upsert(record).await {
            Ok(()) => {
                self.leave_degraded();
                Ok(())
            }
            Err(StoreError::Unavailable { reason }) => match self.policy {
                OutagePolicy::FailClosed => Err(StoreError::Unavailable { reason }),
                OutagePolicy::DegradeToMemory => {
                    self.enter_degraded(&reason);
                    self.shadow.upsert(record).await
                }
            },
        }
    }

    async fn delete(&self, key: &TargetKey) -> Result<bool, StoreError> {
        match self.primary.delete(key).await {
            Ok(existed) => {
                self.leave_degraded();
                Ok(existed)
            }
            Err(StoreError::Unavailable { reason }) => match self.policy {
                OutagePolicy::FailClosed => Err(StoreError::Unavailable { reason }),
                OutagePolicy::DegradeToMemory => {
                    self.enter_degraded(&reason);
                    self.shadow.delete(key).await
                }
            },
        }
    }
}
