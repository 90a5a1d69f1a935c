//! # Retry policy configuration.
//!
//! [`RetryPolicyConfig`] bundles the two cooldown windows, the ordinary
//! retry budget, and the hard ceiling. Construction validates every
//! constraint up front ([`RetryError::InvalidConfig`]); an invalid
//! configuration never reaches first use.
//!
//! The same type doubles as the per-record policy snapshot: a
//! [`RetryRecord`](crate::store::RetryRecord) embeds the config in force at
//! creation time so later changes do not retroactively alter in-flight
//! targets.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RetryError;

/// Validated retry gating configuration.
///
/// ## Field semantics
/// - `base_wait`: cooldown between ordinary retries (positive)
/// - `base_retries`: ordinary retries permitted before the target counts as
///   base-exhausted (may be zero)
/// - `early_wait`: cooldown between explicit early retries, budgeted
///   independently of `base_wait` (positive)
/// - `max_retries`: absolute attempt ceiling (positive, `> base_retries`)
/// - `reset_on_success`: whether a successful attempt clears the budget
///   automatically; defaults to `false` so history survives transient
///   successes and clearing stays an explicit caller decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicyConfig {
    /// Cooldown between ordinary retries.
    pub base_wait: Duration,
    /// Ordinary retries permitted before base exhaustion.
    pub base_retries: u32,
    /// Cooldown between explicit early retries.
    pub early_wait: Duration,
    /// Absolute ceiling on total attempts.
    pub max_retries: u32,
    /// Clear the budget automatically on a successful attempt.
    #[serde(default)]
    pub reset_on_success: bool,
}

impl RetryPolicyConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    /// [`RetryError::InvalidConfig`] when a window is zero, `max_retries`
    /// is zero, or `base_retries >= max_retries` (which would make the
    /// base-exhausted branch unreachable).
    pub fn new(
        base_wait: Duration,
        base_retries: u32,
        early_wait: Duration,
        max_retries: u32,
    ) -> Result<Self, RetryError> {
        let cfg = Self {
            base_wait,
            base_retries,
            early_wait,
            max_retries,
            reset_on_success: false,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Creates a validated configuration from minute-based windows.
    ///
    /// # Example
    /// ```
    /// use retrygate::policy::RetryPolicyConfig;
    ///
    /// let cfg = RetryPolicyConfig::from_minutes(30, 2, 20, 5).unwrap();
    /// assert_eq!(cfg.base_retries, 2);
    /// assert_eq!(cfg.base_wait.as_secs(), 30 * 60);
    /// ```
    pub fn from_minutes(
        base_wait_minutes: u64,
        base_retries: u32,
        early_wait_minutes: u64,
        max_retries: u32,
    ) -> Result<Self, RetryError> {
        Self::new(
            Duration::from_secs(base_wait_minutes * 60),
            base_retries,
            Duration::from_secs(early_wait_minutes * 60),
            max_retries,
        )
    }

    /// Returns a copy with `reset_on_success` set.
    pub fn with_reset_on_success(mut self, reset: bool) -> Self {
        self.reset_on_success = reset;
        self
    }

    /// Base cooldown as a `chrono` duration for timestamp arithmetic.
    pub(crate) fn base_wait_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.base_wait).unwrap_or(chrono::Duration::MAX)
    }

    /// Early cooldown as a `chrono` duration for timestamp arithmetic.
    pub(crate) fn early_wait_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.early_wait).unwrap_or(chrono::Duration::MAX)
    }

    fn validate(&self) -> Result<(), RetryError> {
        if self.base_wait.is_zero() {
            return Err(invalid("base_wait must be positive"));
        }
        if self.early_wait.is_zero() {
            return Err(invalid("early_wait must be positive"));
        }
        if self.max_retries == 0 {
            return Err(invalid("max_retries must be positive"));
        }
        if self.base_retries >= self.max_retries {
            return Err(invalid(format!(
                "base_retries ({}) must be less than max_retries ({})",
                self.base_retries, self.max_retries
            )));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> RetryError {
    RetryError::InvalidConfig {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_config() {
        let cfg = RetryPolicyConfig::from_minutes(30, 2, 20, 5).unwrap();
        assert_eq!(cfg.max_retries, 5);
        assert!(!cfg.reset_on_success);
    }

    #[test]
    fn accepts_zero_base_retries() {
        // Zero ordinary retries is legal: every retry is then base-exhausted
        // cadence up to the ceiling.
        assert!(RetryPolicyConfig::from_minutes(30, 0, 20, 1).is_ok());
    }

    #[test]
    fn rejects_zero_base_wait() {
        let err = RetryPolicyConfig::new(Duration::ZERO, 2, Duration::from_secs(60), 5)
            .unwrap_err();
        assert_eq!(err.as_label(), "invalid_config");
        assert!(err.to_string().contains("base_wait"));
    }

    #[test]
    fn rejects_zero_early_wait() {
        let err = RetryPolicyConfig::new(Duration::from_secs(60), 2, Duration::ZERO, 5)
            .unwrap_err();
        assert!(err.to_string().contains("early_wait"));
    }

    #[test]
    fn rejects_zero_max_retries() {
        let err = RetryPolicyConfig::from_minutes(30, 0, 20, 0).unwrap_err();
        assert!(err.to_string().contains("max_retries"));
    }

    #[test]
    fn rejects_base_retries_at_or_above_ceiling() {
        assert!(RetryPolicyConfig::from_minutes(30, 5, 20, 5).is_err());
        assert!(RetryPolicyConfig::from_minutes(30, 6, 20, 5).is_err());
    }

    #[test]
    fn reset_on_success_builder() {
        let cfg = RetryPolicyConfig::from_minutes(30, 2, 20, 5)
            .unwrap()
            .with_reset_on_success(true);
        assert!(cfg.reset_on_success);
    }
}
