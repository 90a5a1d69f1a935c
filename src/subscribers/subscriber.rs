//! # Core subscriber trait.

use async_trait::async_trait;

use crate::events::Event;

/// Contract for broker event observers.
///
/// Called from a dedicated listener task per attached subscriber.
/// Implementations may be slow (I/O, batching) without blocking the broker,
/// but should avoid blocking the async runtime itself (prefer async I/O).
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use retrygate::events::Event;
/// use retrygate::subscribers::Subscriber;
///
/// struct Audit;
///
/// #[async_trait]
/// impl Subscriber for Audit {
///     async fn on_event(&self, event: &Event) {
///         // write audit record...
///         let _ = event.seq;
///     }
///
///     fn name(&self) -> &'static str {
///         "audit"
///     }
/// }
/// ```
#[async_trait]
pub trait Subscriber: Send + Sync + 'static {
    /// Handles a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
