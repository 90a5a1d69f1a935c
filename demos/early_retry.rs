//! Shows the explicit early-retry override and the context hooks.
//!
//! Run with: `cargo run --example early_retry`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use retrygate::{
    context::{fetch_for_hook, ContextItem, ContextProvider},
    policy::{RetryPolicyConfig, RetryPolicyManager},
    store::{MemoryStore, TargetKey},
};

struct DemoProvider;

#[async_trait]
impl ContextProvider for DemoProvider {
    async fn fetch_light(&self, target: &TargetKey) -> Vec<ContextItem> {
        vec![ContextItem::new(format!("hint for {target}"), 0.8)]
    }

    async fn fetch_heavy(&self, target: &TargetKey) -> Vec<ContextItem> {
        vec![
            ContextItem::new(format!("background on {target}"), 0.7),
            ContextItem::new("related incident report", 0.55),
            ContextItem::new("reframing suggestion", 0.45),
        ]
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let config = RetryPolicyConfig::new(
        Duration::from_secs(60),
        2,
        Duration::from_secs(30),
        5,
    )?;
    let policy = RetryPolicyManager::new(config, Arc::new(MemoryStore::new()));
    let provider = DemoProvider;
    let target = TargetKey::new("entity", "abc");

    // Two ordinary failures exhaust the base budget.
    for _ in 0..2 {
        policy.record_attempt("entity", "abc", false, false).await?;
    }

    // The base window has not elapsed, but an explicit early retry is open.
    let ordinary = policy.can_retry("entity", "abc", false).await?;
    println!("ordinary: {} ({})", ordinary.allowed, ordinary.as_label());

    let early = policy.can_retry("entity", "abc", true).await?;
    println!("early:    {} ({})", early.allowed, early.as_label());

    if let Some(hook) = early.hook {
        let bundle = fetch_for_hook(&provider, hook, &target).await;
        println!(
            "hook={} revised={} items={}",
            hook.as_label(),
            bundle.is_revised(),
            bundle.items.len()
        );
        policy.record_attempt("entity", "abc", false, true).await?;
    }

    // Back-to-back early requests are paced by the early window.
    let again = policy.can_retry("entity", "abc", true).await?;
    println!("again:    {} ({})", again.allowed, again.as_label());
    Ok(())
}
