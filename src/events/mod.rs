//! # Delivery lifecycle events emitted by the message broker.
//!
//! ## Contents
//! - [`Event`] / [`EventKind`] the event payload and its classification
//! - [`Bus`] broadcast channel the broker publishes on
//!
//! Terminal outcomes (dead-lettering in particular) are surfaced here as
//! user-visible events rather than swallowed; the forensic payload carries
//! the final policy verdict.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
