//! # Policy decisions.
//!
//! A [`Decision`] is the full answer to "may this target retry right now":
//! the verdict, which window produced it, the limiting timestamp, and which
//! context-enrichment hook (if any) the caller should fire before the next
//! attempt. Denials are expected, frequent outcomes — they are data on the
//! decision, never errors.

use chrono::{DateTime, Utc};

/// Which window produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Ordinary retry cadence (`base_wait` between attempts).
    Base,
    /// Explicit early-override path (`early_wait` between grants).
    Early,
    /// Absolute attempt ceiling; terminal under the current record.
    Ceiling,
}

impl Window {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Window::Base => "base",
            Window::Early => "early",
            Window::Ceiling => "ceiling",
        }
    }
}

/// Why a retry was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// `attempt_count` reached `max_retries`; terminal until reset.
    CeilingReached,
    /// The base cooldown has not elapsed; safe to re-check at `until`.
    WindowNotElapsed {
        /// Earliest instant at which an ordinary retry may be granted.
        until: DateTime<Utc>,
    },
    /// A prior early grant's cooldown is still running; re-check at `until`.
    EarlyWindowActive {
        /// Earliest instant at which another early grant may be issued.
        until: DateTime<Utc>,
    },
}

impl DenyReason {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DenyReason::CeilingReached => "ceiling_reached",
            DenyReason::WindowNotElapsed { .. } => "window_not_elapsed",
            DenyReason::EarlyWindowActive { .. } => "early_window_active",
        }
    }
}

/// Which context-enrichment hook applies to the next attempt.
///
/// Firing the hook is the caller's responsibility and never blocks the
/// policy decision; see [`ContextProvider`](crate::context::ContextProvider).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// Fired on a granted explicit early retry: fetch a small amount of
    /// supporting context under a relaxed relevance threshold.
    Light,
    /// Fired when base retries are exhausted but the ceiling is not yet
    /// reached: fetch more context under an even more relaxed threshold and
    /// tag the next attempt as revised.
    Heavy,
}

impl HookKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HookKind::Light => "light",
            HookKind::Heavy => "heavy",
        }
    }
}

/// Outcome of a [`can_retry`](crate::policy::RetryPolicyManager::can_retry)
/// check.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Whether a retry is permitted right now.
    pub allowed: bool,
    /// Window that produced the verdict.
    pub window: Window,
    /// Attempt count at decision time.
    pub attempt_count: u32,
    /// Limiting timestamp for the base cadence, if any attempt was recorded.
    pub next_allowed_at: Option<DateTime<Utc>>,
    /// Present iff `allowed` is false.
    pub deny: Option<DenyReason>,
    /// Context hook the caller should fire before the next attempt, if any.
    pub hook: Option<HookKind>,
}

impl Decision {
    /// True when the target is permanently done under its current record:
    /// the ceiling was reached and only an explicit reset can revive it.
    pub fn is_terminal(&self) -> bool {
        matches!(self.deny, Some(DenyReason::CeilingReached))
    }

    /// Short stable label describing the verdict, for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match &self.deny {
            None => "allowed",
            Some(reason) => reason.as_label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_only_on_ceiling() {
        let denied = Decision {
            allowed: false,
            window: Window::Base,
            attempt_count: 1,
            next_allowed_at: Some(Utc::now()),
            deny: Some(DenyReason::WindowNotElapsed { until: Utc::now() }),
            hook: None,
        };
        assert!(!denied.is_terminal());
        assert_eq!(denied.as_label(), "window_not_elapsed");

        let terminal = Decision {
            deny: Some(DenyReason::CeilingReached),
            window: Window::Ceiling,
            ..denied
        };
        assert!(terminal.is_terminal());
        assert_eq!(terminal.as_label(), "ceiling_reached");
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(Window::Base.as_label(), "base");
        assert_eq!(Window::Early.as_label(), "early");
        assert_eq!(Window::Ceiling.as_label(), "ceiling");
        assert_eq!(HookKind::Light.as_label(), "light");
        assert_eq!(HookKind::Heavy.as_label(), "heavy");
    }
}
