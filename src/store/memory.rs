//! # In-memory retry store.
//!
//! [`MemoryStore`] provides the full [`RetryStore`] contract without
//! durability. It backs tests, deployments that run without a persistence
//! backend, and the outage shadow inside
//! [`FallbackStore`](crate::store::FallbackStore).
//!
//! A single `RwLock<HashMap>` guards the table. Target cardinality is low
//! (hundreds to low thousands), and the engine already serializes
//! read-decide-write spans per key above the store, so a coarse lock is
//! sufficient here.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::store::{RetryRecord, RetryStore, StoreError, TargetKey};

/// Concurrent in-process implementation of [`RetryStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<TargetKey, RetryRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of tracked targets.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true if no targets are tracked.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Drops every record.
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}

#[async_trait]
impl RetryStore for MemoryStore {
    async fn get(&self, key: &TargetKey) -> Result<Option<RetryRecord>, StoreError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn upsert(&self, record: &RetryRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, key: &TargetKey) -> Result<bool, StoreError> {
        Ok(self.records.write().await.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::policy::RetryPolicyConfig;

    fn record(id: &str) -> RetryRecord {
        RetryRecord::fresh(
            TargetKey::new("entity", id),
            RetryPolicyConfig::from_minutes(30, 2, 20, 5).unwrap(),
        )
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = MemoryStore::new();
        let mut rec = record("abc");
        rec.attempt_count = 4;
        rec.early_retry_used = true;

        store.upsert(&rec).await.unwrap();
        let loaded = store.get(&rec.key).await.unwrap().unwrap();
        assert_eq!(loaded, rec);
    }

    #[tokio::test]
    async fn get_unseen_is_none() {
        let store = MemoryStore::new();
        let got = store.get(&TargetKey::new("entity", "nope")).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let store = MemoryStore::new();
        let rec = record("abc");
        store.upsert(&rec).await.unwrap();
        store.upsert(&rec).await.unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = MemoryStore::new();
        let rec = record("abc");
        store.upsert(&rec).await.unwrap();
        assert!(store.delete(&rec.key).await.unwrap());
        assert!(!store.delete(&rec.key).await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_upserts_on_distinct_keys_do_not_lose_records() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.upsert(&record(&format!("t-{i}"))).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.len().await, 32);
    }
}
