//! # Retry gating: configuration, decisions, and the decision engine.
//!
//! This module groups the knobs that control **whether** a failed target may
//! run again and **when** it becomes eligible.
//!
//! ## Contents
//! - [`RetryPolicyConfig`] the validated window/budget configuration
//! - [`Decision`] the outcome of a policy check (allowed / denied + why)
//! - [`RetryPolicyManager`] the sole authority over retry eligibility
//!
//! ## Two windows, one ceiling
//! ```text
//! ordinary retry:  now >= last_attempt_at + base_wait      (base window)
//! explicit early:  now >= last_early_grant + early_wait    (early window)
//! always:          attempt_count < max_retries             (ceiling)
//! ```
//! The windows are budgeted independently: consuming one never resets the
//! other. The ceiling dominates both — once `attempt_count` reaches
//! `max_retries` the target is terminal until an explicit reset.

mod config;
mod decision;
mod manager;

pub use config::RetryPolicyConfig;
pub use decision::{Decision, DenyReason, HookKind, Window};
pub use manager::RetryPolicyManager;
