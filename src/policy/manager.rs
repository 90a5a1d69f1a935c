//! # RetryPolicyManager: the decision engine.
//!
//! Sole authority on whether a named target may be retried right now, and
//! the bookkeeper of attempt history. All state lives in a
//! [`RetryStore`]; the manager adds the gating logic and per-key
//! serialization on top.
//!
//! ## Decision flow
//! ```text
//! can_retry(type, id, explicit_early)
//!   ├─► load or lazily create RetryRecord        (under per-key lock)
//!   ├─► attempt_count >= max_retries?  → denied: ceiling_reached (terminal)
//!   ├─► explicit_early?
//!   │     ├─ early grant still cooling → denied: early_window_active
//!   │     └─ else                      → allowed (hook: light)
//!   └─► ordinary path
//!         ├─ now < next_allowed_at     → denied: window_not_elapsed
//!         ├─ base budget remaining     → allowed
//!         └─ base-exhausted, < ceiling → allowed (hook: heavy)
//! ```
//!
//! ## Rules
//! - Decisions are made against the **record's policy snapshot**, never the
//!   manager's live config; config changes do not retroactively alter
//!   in-flight targets.
//! - Every operation holds a per-key async lock across its read-decide-write
//!   span, so two callers racing on one target cannot both consume a
//!   single-slot budget.
//! - Expected denials are returned inside [`Decision`]; only store outages
//!   and misconfiguration surface as [`RetryError`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::RetryError;
use crate::policy::{Decision, DenyReason, HookKind, RetryPolicyConfig, Window};
use crate::store::{RetryRecord, RetryStore, TargetKey};

/// Decision engine and attempt bookkeeper for retryable targets.
pub struct RetryPolicyManager {
    config: RetryPolicyConfig,
    store: Arc<dyn RetryStore>,
    clock: Arc<dyn Clock>,
    /// Per-key locks serializing read-decide-write spans. Entries are never
    /// reaped; target cardinality is bounded (hundreds to low thousands).
    locks: Mutex<HashMap<TargetKey, Arc<Mutex<()>>>>,
}

impl RetryPolicyManager {
    /// Creates a manager over the given store, using the system clock.
    ///
    /// The store is injected rather than ambient so isolated instances can
    /// run side by side (tests, multi-tenant embedding).
    pub fn new(config: RetryPolicyConfig, store: Arc<dyn RetryStore>) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Creates a manager with an explicit time source.
    pub fn with_clock(
        config: RetryPolicyConfig,
        store: Arc<dyn RetryStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store,
            clock,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the configuration used for newly created records.
    pub fn config(&self) -> &RetryPolicyConfig {
        &self.config
    }

    /// Returns the manager's time source, so collaborators (the broker in
    /// particular) can share one clock for coherent window comparisons.
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Answers whether `target` may retry right now.
    ///
    /// Never consumes budget by itself: a granted decision is expected to be
    /// followed by [`record_attempt`](Self::record_attempt) once the attempt
    /// ran. The returned [`Decision`] carries the attempt count, the
    /// limiting timestamp, the producing window, and the applicable context
    /// hook.
    ///
    /// # Errors
    /// [`RetryError::StoreUnavailable`] when the store cannot answer and the
    /// deployment fails closed; callers must treat that as "not allowed".
    pub async fn can_retry(
        &self,
        target_type: &str,
        target_id: &str,
        explicit_early: bool,
    ) -> Result<Decision, RetryError> {
        let key = TargetKey::new(target_type, target_id);
        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;

        let mut record = self.load_or_create(&key).await?;
        let now = self.clock.now();
        let decision = self.decide(&mut record, now, explicit_early).await?;

        debug!(
            target = %key,
            verdict = decision.as_label(),
            window = decision.window.as_label(),
            attempts = decision.attempt_count,
            "retry decision"
        );
        Ok(decision)
    }

    /// Records the outcome of an attempt and recomputes the base cadence.
    ///
    /// - Increments `attempt_count` (clamped at the snapshot's ceiling).
    /// - Stamps `last_attempt_at` (and `last_success_at` on success).
    /// - Marks the early override consumed when `explicit_early_used`.
    /// - Sets `next_allowed_at = now + base_wait` regardless of path; the
    ///   base cadence governs subsequent ordinary retries either way.
    ///
    /// A success does **not** clear the budget unless the policy snapshot
    /// opted into `reset_on_success`; clearing history is otherwise an
    /// explicit caller decision via [`reset`](Self::reset).
    ///
    /// Returns the updated record.
    pub async fn record_attempt(
        &self,
        target_type: &str,
        target_id: &str,
        success: bool,
        explicit_early_used: bool,
    ) -> Result<RetryRecord, RetryError> {
        let key = TargetKey::new(target_type, target_id);
        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;

        let mut record = self.load_or_create(&key).await?;
        let now = self.clock.now();

        if success && record.policy.reset_on_success {
            let policy = record.policy.clone();
            record = RetryRecord::fresh(key.clone(), policy);
            record.last_success_at = Some(now);
        } else {
            record.attempt_count = (record.attempt_count + 1).min(record.policy.max_retries);
            record.last_attempt_at = Some(now);
            if success {
                record.last_success_at = Some(now);
            }
            if explicit_early_used {
                record.early_retry_used = true;
                record.last_explicit_early_granted_at = Some(now);
            }
            record.next_allowed_at = Some(now + record.policy.base_wait_chrono());
        }

        self.store.upsert(&record).await?;
        debug!(
            target = %key,
            attempts = record.attempt_count,
            success,
            explicit_early_used,
            "attempt recorded"
        );
        Ok(record)
    }

    /// Restores the full retry budget for a target.
    ///
    /// Clears the attempt count, all timestamps, and the early-override
    /// flag. The fresh record snapshots the manager's **current** config, so
    /// after a reset the target behaves exactly like a brand-new one.
    pub async fn reset(&self, target_type: &str, target_id: &str) -> Result<(), RetryError> {
        let key = TargetKey::new(target_type, target_id);
        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;

        let record = RetryRecord::fresh(key.clone(), self.config.clone());
        self.store.upsert(&record).await?;
        debug!(target = %key, "retry budget reset");
        Ok(())
    }

    /// Fetches the current record for inspection, if the target was seen.
    pub async fn record(
        &self,
        target_type: &str,
        target_id: &str,
    ) -> Result<Option<RetryRecord>, RetryError> {
        let key = TargetKey::new(target_type, target_id);
        Ok(self.store.get(&key).await?)
    }

    // ---------------------------
    // Internals
    // ---------------------------

    /// Evaluates the gating state machine for one record.
    ///
    /// May persist bookkeeping updates (an elapsed early window releases the
    /// `early_retry_used` flag), which is why it takes the record mutably.
    async fn decide(
        &self,
        record: &mut RetryRecord,
        now: DateTime<Utc>,
        explicit_early: bool,
    ) -> Result<Decision, RetryError> {
        if record.ceiling_reached() {
            return Ok(denied(record, Window::Ceiling, DenyReason::CeilingReached));
        }

        if explicit_early {
            if record.early_retry_used {
                if let Some(granted_at) = record.last_explicit_early_granted_at {
                    let until = granted_at + record.policy.early_wait_chrono();
                    if now < until {
                        return Ok(denied(
                            record,
                            Window::Early,
                            DenyReason::EarlyWindowActive { until },
                        ));
                    }
                }
                // Window elapsed: the override is eligible again.
                record.early_retry_used = false;
                self.store.upsert(record).await?;
            }
            return Ok(allowed(record, Window::Early, Some(HookKind::Light)));
        }

        // Ordinary path: base cadence governs both the pre- and
        // post-base-exhaustion phases, up to the ceiling.
        if let Some(next_allowed_at) = record.next_allowed_at {
            if now < next_allowed_at {
                return Ok(denied(
                    record,
                    Window::Base,
                    DenyReason::WindowNotElapsed {
                        until: next_allowed_at,
                    },
                ));
            }
        }

        let hook = if record.base_exhausted() {
            Some(HookKind::Heavy)
        } else {
            None
        };
        Ok(allowed(record, Window::Base, hook))
    }

    /// Loads the record, creating (and persisting) a fresh one on first
    /// contact. Runs under the per-key lock, so concurrent first contact
    /// cannot create two records.
    async fn load_or_create(&self, key: &TargetKey) -> Result<RetryRecord, RetryError> {
        if let Some(record) = self.store.get(key).await? {
            return Ok(record);
        }
        let record = RetryRecord::fresh(key.clone(), self.config.clone());
        self.store.upsert(&record).await?;
        debug!(target = %key, "retry record created");
        Ok(record)
    }

    /// Returns the lock guarding `key`, creating it on first use.
    async fn key_lock(&self, key: &TargetKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(key.clone()).or_default().clone()
    }
}

fn allowed(record: &RetryRecord, window: Window, hook: Option<HookKind>) -> Decision {
    Decision {
        allowed: true,
        window,
        attempt_count: record.attempt_count,
        next_allowed_at: record.next_allowed_at,
        deny: None,
        hook,
    }
}

fn denied(record: &RetryRecord, window: Window, reason: DenyReason) -> Decision {
    Decision {
        allowed: false,
        window,
        attempt_count: record.attempt_count,
        next_allowed_at: record.next_allowed_at,
        deny: Some(reason),
        hook: None,
    }
}
