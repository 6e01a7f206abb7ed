//! Port interface for the shared key/value cache.
use async_trait::async_trait;

use super::{CacheKey, define_port_error};

define_port_error! {
    /// Errors surfaced by the caching adapter.
    pub enum CacheStoreError {
        /// Cache backend is unavailable or timing out.
        Backend { message: String } => "cache backend failure: {message}",
    }
}

/// Keyed storage of serialised lookup outcomes.
///
/// Entries never expire on their own; callers invalidate after mutations.
/// Concurrent writers to the same key race and the last write wins.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read the raw entry stored under `key`.
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheStoreError>;

    /// Store `value` under `key`, replacing any previous entry.
    async fn put(&self, key: &CacheKey, value: String) -> Result<(), CacheStoreError>;

    /// Remove the entry stored under `key`, if any.
    async fn remove(&self, key: &CacheKey) -> Result<(), CacheStoreError>;
}
