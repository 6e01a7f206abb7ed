//! Process-local cache store backed by `DashMap`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::ports::{CacheKey, CacheStore, CacheStoreError};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    stored_at: Instant,
}

/// In-memory cache store with a fixed time-to-live per entry.
#[derive(Debug)]
pub struct MemoryCacheStore {
    entries: DashMap<String, Entry>,
    ttl: Duration,
}

impl MemoryCacheStore {
    /// Create an empty store whose entries expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheStoreError> {
        let expired = match self.entries.get(key.as_str()) {
            Some(entry) if entry.stored_at.elapsed() <= self.ttl => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key.as_str());
        }
        Ok(None)
    }

    async fn put(&self, key: &CacheKey, value: String) -> Result<(), CacheStoreError> {
        self.entries.insert(
            key.as_str().to_owned(),
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), CacheStoreError> {
        self.entries.remove(key.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn key(raw: &str) -> CacheKey {
        CacheKey::new(raw).expect("valid key")
    }

    #[rstest]
    #[tokio::test]
    async fn stores_and_removes_entries() {
        let store = MemoryCacheStore::new(Duration::from_secs(60));
        store
            .put(&key("user_id:1"), "{}".to_owned())
            .await
            .expect("put");

        assert_eq!(
            store.get(&key("user_id:1")).await.expect("get").as_deref(),
            Some("{}")
        );

        store.remove(&key("user_id:1")).await.expect("remove");
        assert!(store.get(&key("user_id:1")).await.expect("get").is_none());
        assert!(store.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn expired_entries_read_as_misses() {
        let store = MemoryCacheStore::new(Duration::ZERO);
        store
            .put(&key("user_id:1"), "{}".to_owned())
            .await
            .expect("put");
        std::thread::sleep(Duration::from_millis(2));

        assert!(store.get(&key("user_id:1")).await.expect("get").is_none());
        assert_eq!(store.len(), 0);
    }
}
