//! In-process store backed by a `HashMap`.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use super::{Store, StoreConfig, StoreError};
use crate::cache::CachedEntry;

/// Name reported by a freshly created [`MemoryStore`].
pub const MEMORY_STORE_NAME: &str = "In-Memory Store";

/// A [`Store`] keeping entries in a map behind one reader/writer lock.
///
/// Reads share the lock; writes and deletes take it exclusively. The map is
/// unbounded and never evicts: an entry lives until it is overwritten, deleted
/// by the cache's deferred expiry, or invalidated.
#[derive(Debug)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, CachedEntry>>,
    config: RwLock<StoreConfig>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config: RwLock::new(StoreConfig::new(MEMORY_STORE_NAME)),
        }
    }

    /// Number of entries held, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn store(&self, key: &str, payload: Bytes) -> Result<(), StoreError> {
        let entry = CachedEntry::new(payload);
        self.entries.write().insert(key.to_owned(), entry);
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<CachedEntry>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn config(&self) -> StoreConfig {
        self.config.read().clone()
    }

    fn set_config(&self, config: StoreConfig) {
        *self.config.write() = config;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn store_then_retrieve_returns_exact_bytes() {
        let store = MemoryStore::new();
        let payload = Bytes::from_static(b"\x00{\"name\":\"test\"}\xff");

        store.store("k", payload.clone()).await.unwrap();
        let entry = store.retrieve("k").await.unwrap().unwrap();

        assert_eq!(entry.payload(), &payload);
        assert!(entry.is_fresh(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn missing_key_is_not_an_error() {
        let store = MemoryStore::new();
        assert!(store.retrieve("absent").await.unwrap().is_none());
        store.delete("absent").await.unwrap();
    }

    #[tokio::test]
    async fn write_replaces_entry_and_restamps_it() {
        let store = MemoryStore::new();
        store.store("k", Bytes::from_static(b"old")).await.unwrap();
        let first = store.retrieve("k").await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        store.store("k", Bytes::from_static(b"new")).await.unwrap();
        let second = store.retrieve("k").await.unwrap().unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(second.payload().as_ref(), b"new");
        assert!(second.created_at() > first.created_at());
    }

    #[tokio::test]
    async fn stale_entries_stay_until_deleted() {
        let store = MemoryStore::new();
        store.store("k", Bytes::from_static(b"v")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let entry = store.retrieve("k").await.unwrap().unwrap();
        assert!(!entry.is_fresh(Duration::from_millis(10)));

        store.delete("k").await.unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn config_is_descriptive_and_mutable() {
        let store = MemoryStore::new();
        assert_eq!(store.config().name, MEMORY_STORE_NAME);

        store.set_config(StoreConfig::new("sessions"));
        assert_eq!(store.config(), StoreConfig::new("sessions"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_access_to_one_key() {
        let store = Arc::new(MemoryStore::new());
        let mut tasks = Vec::new();

        for worker in 0..16u8 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                for round in 0..200u32 {
                    match round % 3 {
                        0 => store.store("shared", Bytes::from(vec![worker; 64])).await.unwrap(),
                        1 => {
                            if let Some(entry) = store.retrieve("shared").await.unwrap() {
                                let first = entry.payload()[0];
                                assert!(entry.payload().iter().all(|b| *b == first));
                            }
                        }
                        _ => store.delete("shared").await.unwrap(),
                    }
                }
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }
        assert!(store.len() <= 1);
    }
}
