//! # Persisted per-target retry state.
//!
//! One [`RetryRecord`] exists per [`TargetKey`] at any time. Records are
//! created lazily on first contact with a target, mutated on every policy
//! check and recorded attempt, and logically cleared by `reset`. The policy
//! engine never deletes them; retention is a store-level concern.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::RetryPolicyConfig;

/// Composite identity of a retryable unit of work.
///
/// `target_type` namespaces ids from independent subsystems (`"message"`,
/// `"entity"`, ...); the pair is unique together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetKey {
    /// Namespace of the target (e.g. `"message"`, `"entity"`).
    pub target_type: String,
    /// Identifier unique within the namespace.
    pub target_id: String,
}

impl TargetKey {
    /// Creates a key from its two components.
    pub fn new(target_type: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            target_id: target_id.into(),
        }
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.target_type, self.target_id)
    }
}

/// Durable retry state for one target.
///
/// The record carries a snapshot of the [`RetryPolicyConfig`] in force when
/// it was created; decisions for in-flight targets are always made against
/// the snapshot, so later config changes never retroactively alter behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryRecord {
    /// Identity of the tracked target.
    pub key: TargetKey,
    /// Total attempts recorded (success or failure) since the last reset.
    ///
    /// Monotonically non-decreasing between resets; clamped at the
    /// snapshot's `max_retries`.
    pub attempt_count: u32,
    /// Whether the early-override window has been consumed since it last
    /// became available.
    pub early_retry_used: bool,
    /// Time of the most recent recorded attempt.
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Time of the most recent successful attempt.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Instant before which no ordinary retry may be granted.
    pub next_allowed_at: Option<DateTime<Utc>>,
    /// Time of the most recent explicit-early grant.
    pub last_explicit_early_granted_at: Option<DateTime<Utc>>,
    /// Policy values in effect when this record was created.
    pub policy: RetryPolicyConfig,
}

impl RetryRecord {
    /// Creates a fresh record for an unseen target: zero attempts, no
    /// timestamps, early override available.
    pub fn fresh(key: TargetKey, policy: RetryPolicyConfig) -> Self {
        Self {
            key,
            attempt_count: 0,
            early_retry_used: false,
            last_attempt_at: None,
            last_success_at: None,
            next_allowed_at: None,
            last_explicit_early_granted_at: None,
            policy,
        }
    }

    /// True once the target has consumed its ordinary retry budget.
    ///
    /// Base-exhausted targets still retry on the base cadence until the
    /// ceiling; this only selects which context hook applies.
    pub fn base_exhausted(&self) -> bool {
        self.attempt_count >= self.policy.base_retries
    }

    /// True once the target has hit the absolute ceiling and is terminal
    /// under this record.
    pub fn ceiling_reached(&self) -> bool {
        self.attempt_count >= self.policy.max_retries
    }
}
