//! # Context enrichment boundary (interface only).
//!
//! A retrieval subsystem may attach supporting material to a retry attempt.
//! The policy engine never performs retrieval itself — it only reports, via
//! [`Decision::hook`](crate::policy::Decision), which hook applies:
//!
//! - [`HookKind::Light`] on a granted explicit early retry: up to
//!   [`LIGHT_MAX_ITEMS`] item at relevance ≥ [`LIGHT_THRESHOLD`].
//! - [`HookKind::Heavy`] once base retries are exhausted (ceiling not yet
//!   reached): up to [`HEAVY_MAX_ITEMS`] items at relevance ≥
//!   [`HEAVY_THRESHOLD`], with the resulting bundle tagged so downstream
//!   consumers can tell a revised attempt from a normal one.
//!
//! Invoking the hook is the caller's business and never blocks the policy
//! decision. Providers return an empty result on no-match rather than
//! failing.

use async_trait::async_trait;

use crate::policy::HookKind;
use crate::store::TargetKey;

/// Item cap for the light hook.
pub const LIGHT_MAX_ITEMS: usize = 1;
/// Relevance threshold for the light hook.
pub const LIGHT_THRESHOLD: f32 = 0.5;
/// Item cap for the heavy hook.
pub const HEAVY_MAX_ITEMS: usize = 3;
/// Relevance threshold for the heavy hook.
pub const HEAVY_THRESHOLD: f32 = 0.4;

/// One piece of retrieved supporting material.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextItem {
    /// The retrieved content.
    pub content: String,
    /// Relevance score in `[0, 1]`.
    pub score: f32,
}

impl ContextItem {
    /// Creates an item from content and score.
    pub fn new(content: impl Into<String>, score: f32) -> Self {
        Self {
            content: content.into(),
            score,
        }
    }
}

/// Context attached to the next attempt, tagged with the hook that fetched
/// it.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextBundle {
    /// Retrieved items, capped and threshold-filtered per the hook.
    pub items: Vec<ContextItem>,
    /// Which hook produced this bundle.
    pub hook: HookKind,
}

impl ContextBundle {
    /// True when the bundle came from the heavy (post-exhaustion) hook,
    /// marking the next attempt as a revised one for downstream consumers.
    pub fn is_revised(&self) -> bool {
        matches!(self.hook, HookKind::Heavy)
    }
}

/// # Retrieval capability for context enrichment.
///
/// External collaborator; implementations fetch supporting material for a
/// target. Both calls return zero items on no-match rather than failing.
#[async_trait]
pub trait ContextProvider: Send + Sync + 'static {
    /// Fetches a small amount of context for an early retry.
    async fn fetch_light(&self, target: &TargetKey) -> Vec<ContextItem>;

    /// Fetches broader context for a post-exhaustion retry.
    async fn fetch_heavy(&self, target: &TargetKey) -> Vec<ContextItem>;
}

/// Runs the hook a [`Decision`](crate::policy::Decision) selected and shapes
/// the result: items below the hook's relevance threshold are dropped and
/// the rest truncated to the hook's cap.
pub async fn fetch_for_hook(
    provider: &dyn ContextProvider,
    hook: HookKind,
    target: &TargetKey,
) -> ContextBundle {
    let (raw, threshold, cap) = match hook {
        HookKind::Light => (
            provider.fetch_light(target).await,
            LIGHT_THRESHOLD,
            LIGHT_MAX_ITEMS,
        ),
        HookKind::Heavy => (
            provider.fetch_heavy(target).await,
            HEAVY_THRESHOLD,
            HEAVY_MAX_ITEMS,
        ),
    };

    let mut items: Vec<ContextItem> = raw.into_iter().filter(|i| i.score >= threshold).collect();
    items.truncate(cap);
    ContextBundle { items, hook }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider {
        items: Vec<ContextItem>,
    }

    #[async_trait]
    impl ContextProvider for FixedProvider {
        async fn fetch_light(&self, _target: &TargetKey) -> Vec<ContextItem> {
            self.items.clone()
        }

        async fn fetch_heavy(&self, _target: &TargetKey) -> Vec<ContextItem> {
            self.items.clone()
        }
    }

    fn target() -> TargetKey {
        TargetKey::new("entity", "abc")
    }

    #[tokio::test]
    async fn light_hook_caps_at_one_item() {
        let provider = FixedProvider {
            items: vec![
                ContextItem::new("a", 0.9),
                ContextItem::new("b", 0.8),
            ],
        };
        let bundle = fetch_for_hook(&provider, HookKind::Light, &target()).await;
        assert_eq!(bundle.items.len(), 1);
        assert!(!bundle.is_revised());
    }

    #[tokio::test]
    async fn heavy_hook_caps_at_three_and_tags_revised() {
        let provider = FixedProvider {
            items: vec![
                ContextItem::new("a", 0.9),
                ContextItem::new("b", 0.8),
                ContextItem::new("c", 0.7),
                ContextItem::new("d", 0.6),
            ],
        };
        let bundle = fetch_for_hook(&provider, HookKind::Heavy, &target()).await;
        assert_eq!(bundle.items.len(), 3);
        assert!(bundle.is_revised());
    }

    #[tokio::test]
    async fn thresholds_drop_irrelevant_items() {
        let provider = FixedProvider {
            items: vec![
                ContextItem::new("relevant", 0.45),
                ContextItem::new("noise", 0.1),
            ],
        };
        // 0.45 clears the heavy threshold (0.4) but not the light one (0.5).
        let heavy = fetch_for_hook(&provider, HookKind::Heavy, &target()).await;
        assert_eq!(heavy.items.len(), 1);
        let light = fetch_for_hook(&provider, HookKind::Light, &target()).await;
        assert!(light.items.is_empty());
    }

    #[tokio::test]
    async fn no_match_yields_empty_bundle() {
        let provider = FixedProvider { items: vec![] };
        let bundle = fetch_for_hook(&provider, HookKind::Heavy, &target()).await;
        assert!(bundle.items.is_empty());
    }
}
