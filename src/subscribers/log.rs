//! # Tracing-backed logging subscriber.
//!
//! [`LogWriter`] renders every broker event through `tracing`. Terminal
//! outcomes (dead-lettering) log at `warn`, routine lifecycle at `info`.
//!
//! ## Output shape
//! ```text
//! INFO  message_submitted id=m-1
//! INFO  delivery_started id=m-1 attempt=1
//! INFO  retry_scheduled id=m-1 attempt=1 delay_ms=1800000
//! WARN  message_dead_lettered id=m-1 attempt=5 reason="ceiling_reached"
//! ```

use async_trait::async_trait;
use tracing::{info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscriber;

/// Built-in subscriber that logs broker events via `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

#[async_trait]
impl Subscriber for LogWriter {
    async fn on_event(&self, event: &Event) {
        let id = event.message.as_deref().unwrap_or("-");
        match event.kind {
            EventKind::MessageSubmitted => {
                info!(id, "message_submitted");
            }
            EventKind::DeliveryStarted => {
                info!(id, attempt = event.attempt, "delivery_started");
            }
            EventKind::MessageAcked => {
                info!(id, attempt = event.attempt, "message_acked");
            }
            EventKind::RetryScheduled => {
                info!(
                    id,
                    attempt = event.attempt,
                    delay_ms = event.delay_ms,
                    "retry_scheduled"
                );
            }
            EventKind::MessageDeadLettered => {
                warn!(
                    id,
                    attempt = event.attempt,
                    reason = event.reason.as_deref(),
                    "message_dead_lettered"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
