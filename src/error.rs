//! Error types used by the retry policy engine and the message broker.
//!
//! This module defines two main error enums:
//!
//! - [`RetryError`] — infrastructure and configuration failures raised by the
//!   policy engine.
//! - [`BrokerError`] — failures raised by the message broker.
//!
//! Expected policy outcomes (ceiling reached, cooldown still running) are
//! **not** errors: they are returned as part of a
//! [`Decision`](crate::policy::Decision). Only conditions that indicate a
//! misconfiguration or an infrastructure problem surface through these enums.
//!
//! Both types provide `as_label` helpers for logging/metrics.

use thiserror::Error;

/// # Errors produced by the retry policy engine.
///
/// These represent infrastructure or configuration failures, not normal
/// policy outcomes. A denied retry is reported through
/// [`Decision`](crate::policy::Decision), never through this enum.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RetryError {
    /// Construction-time validation of a policy configuration failed.
    ///
    /// Raised immediately by [`RetryPolicyConfig`](crate::policy::RetryPolicyConfig)
    /// constructors, never deferred to first use.
    #[error("invalid retry policy: {message}")]
    InvalidConfig {
        /// Description of the violated constraint.
        message: String,
    },

    /// The durable retry store is unreachable.
    ///
    /// Under [`OutagePolicy::FailClosed`](crate::store::OutagePolicy::FailClosed)
    /// this propagates to the caller, who must treat it as "retry not allowed".
    #[error("retry store unavailable: {reason}")]
    StoreUnavailable {
        /// Backend-supplied description of the outage.
        reason: String,
    },
}

impl RetryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use retrygate::RetryError;
    ///
    /// let err = RetryError::InvalidConfig { message: "base_wait must be positive".into() };
    /// assert_eq!(err.as_label(), "invalid_config");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RetryError::InvalidConfig { .. } => "invalid_config",
            RetryError::StoreUnavailable { .. } => "store_unavailable",
        }
    }
}

impl From<crate::store::StoreError> for RetryError {
    fn from(err: crate::store::StoreError) -> Self {
        match err {
            crate::store::StoreError::Unavailable { reason } => {
                RetryError::StoreUnavailable { reason }
            }
        }
    }
}

/// # Errors produced by the message broker.
///
/// These represent misuse of the broker API or a closed broker, not
/// delivery failures (a failed delivery is reported via `nack` and drives
/// the retry/DLQ state machine).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BrokerError {
    /// The referenced message is not currently in flight.
    ///
    /// Returned by `ack`/`nack` when the id was never submitted, was already
    /// acknowledged, or was dead-lettered.
    #[error("message not in flight: {id}")]
    UnknownMessage {
        /// Message id supplied by the caller.
        id: String,
    },

    /// The broker has been shut down and no longer accepts or hands out work.
    #[error("broker is closed")]
    Closed,

    /// The retry policy engine failed while the broker was routing a failure.
    #[error("retry policy error: {0}")]
    Policy(#[from] RetryError),
}

impl BrokerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BrokerError::UnknownMessage { .. } => "unknown_message",
            BrokerError::Closed => "broker_closed",
            BrokerError::Policy(_) => "policy_error",
        }
    }
}
