//! Drives a message through failing deliveries until it dead-letters.
//!
//! Run with: `cargo run --example broker_dlq`

use std::sync::Arc;
use std::time::Duration;

use retrygate::{
    broker::{Message, MessageBroker, NackOutcome},
    policy::{RetryPolicyConfig, RetryPolicyManager},
    store::MemoryStore,
    subscribers::LogWriter,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Tight windows so the demo finishes quickly: 1s cooldown, 1 ordinary
    // retry, ceiling of 3 attempts.
    let config = RetryPolicyConfig::new(
        Duration::from_secs(1),
        1,
        Duration::from_secs(1),
        3,
    )?;
    let policy = Arc::new(RetryPolicyManager::new(config, Arc::new(MemoryStore::new())));
    let broker = MessageBroker::new(policy, 256);
    broker.attach_subscriber(Arc::new(LogWriter));

    broker.submit(Message::new("order-17", "flaky work")).await?;

    loop {
        let msg = broker.receive().await?;
        // Every delivery "fails" in this demo.
        match broker.nack(&msg.id).await? {
            NackOutcome::Requeued { visible_at } => {
                println!("requeued, visible again at {visible_at}");
            }
            NackOutcome::DeadLettered => break,
        }
    }

    for dead in broker.dead_letters().await {
        println!(
            "dead letter: id={} attempts={} reason={}",
            dead.message.id, dead.attempts, dead.reason
        );
    }
    broker.close();
    Ok(())
}
