//! # Time source abstraction.
//!
//! Every window comparison in the crate (`now >= next_allowed_at`, early
//! window elapsed, queue visibility) goes through an injected [`Clock`]
//! rather than calling `Utc::now()` directly. This keeps the decision logic
//! deterministic under test: a [`ManualClock`] can be advanced to an exact
//! window boundary.
//!
//! Production code uses [`SystemClock`].

use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests and simulations.
///
/// Starts at a fixed epoch so window arithmetic in tests is reproducible.
///
/// # Example
/// ```
/// use retrygate::clock::{Clock, ManualClock};
/// use chrono::Duration;
///
/// let clock = ManualClock::default();
/// let t0 = clock.now();
/// clock.advance(Duration::minutes(30));
/// assert_eq!(clock.now() - t0, Duration::minutes(30));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock starting at the given instant.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }

    /// Sets the clock to an absolute instant.
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap() = at;
    }
}

impl Default for ManualClock {
    /// Starts at 2024-01-01T00:00:00Z.
    fn default() -> Self {
        Self::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
