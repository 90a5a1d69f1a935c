//! # Event subscribers.
//!
//! The [`Subscriber`] trait is the extension point for plugging observers
//! into the broker's event stream (logging, metrics, alerting). The broker
//! drives each attached subscriber from a dedicated listener task fed by the
//! [`Bus`](crate::events::Bus), so a slow subscriber never blocks delivery.
//!
//! [`LogWriter`] is the built-in implementation: it renders every event
//! through `tracing`.

mod log;
mod subscriber;

pub use log::LogWriter;
pub use subscriber::Subscriber;
