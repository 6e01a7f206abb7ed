//! Cache-through lookups of operation outcomes.
//!
//! [`CachedLookup::get_or_compute`] wraps a fetch with a keyed cache. Both
//! successful values and business errors are cached, so a repeated lookup of
//! a missing record is answered without touching the repository until the key
//! is invalidated. Internal errors are never cached since they describe a
//! transient adapter fault rather than the state of the record.
//!
//! Cache backend failures never fail a lookup: reads degrade to a miss and
//! writes are dropped, each with a warning.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ports::{CacheKey, CacheStore};
use super::{Error, ErrorCode, OperationResult};

/// Whether a lookup may be answered from the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Freshness {
    /// Use a cached outcome when one exists.
    #[default]
    AllowCached,
    /// Always recompute, then refresh the cached outcome.
    RequireFresh,
}

#[derive(Deserialize)]
#[serde(tag = "outcome", content = "payload", rename_all = "snake_case")]
enum CachedOutcome<T> {
    Value(T),
    Error(Error),
}

#[derive(Serialize)]
#[serde(tag = "outcome", content = "payload", rename_all = "snake_case")]
enum CachedOutcomeRef<'a, T> {
    Value(&'a T),
    Error(&'a Error),
}

impl<T> From<CachedOutcome<T>> for OperationResult<T> {
    fn from(value: CachedOutcome<T>) -> Self {
        match value {
            CachedOutcome::Value(value) => Ok(value),
            CachedOutcome::Error(error) => Err(error),
        }
    }
}

/// Cache-through wrapper shared by the domain services.
#[derive(Clone)]
pub struct CachedLookup {
    store: Arc<dyn CacheStore>,
}

impl CachedLookup {
    /// Wrap a cache store.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Return the cached outcome for `key`, or run `compute` and cache its
    /// outcome.
    ///
    /// Two concurrent misses may both compute; the last write wins.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &CacheKey,
        freshness: Freshness,
        compute: F,
    ) -> OperationResult<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = OperationResult<T>> + Send,
    {
        if freshness == Freshness::AllowCached {
            if let Some(outcome) = self.read::<T>(key).await {
                return outcome;
            }
        }
        let outcome = compute().await;
        self.write(key, &outcome).await;
        outcome
    }

    /// Drop the cached outcome for `key`.
    pub async fn invalidate(&self, key: &CacheKey) {
        if let Err(error) = self.store.remove(key).await {
            warn!(%error, key = %key, "cache invalidation failed");
        }
    }

    /// Drop the cached outcomes for every key in `keys`.
    pub async fn invalidate_all<I>(&self, keys: I)
    where
        I: IntoIterator<Item = CacheKey> + Send,
        I::IntoIter: Send,
    {
        for key in keys {
            self.invalidate(&key).await;
        }
    }

    async fn read<T>(&self, key: &CacheKey) -> Option<OperationResult<T>>
    where
        T: DeserializeOwned,
    {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<CachedOutcome<T>>(&raw) {
                Ok(outcome) => Some(outcome.into()),
                Err(error) => {
                    warn!(%error, key = %key, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(error) => {
                warn!(%error, key = %key, "cache read failed; recomputing");
                None
            }
        }
    }

    async fn write<T>(&self, key: &CacheKey, outcome: &OperationResult<T>)
    where
        T: Serialize + Sync,
    {
        let entry = match outcome {
            Ok(value) => CachedOutcomeRef::Value(value),
            Err(error) if error.code() == ErrorCode::InternalError => return,
            Err(error) => CachedOutcomeRef::Error(error),
        };
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(%error, key = %key, "cache entry serialisation failed");
                return;
            }
        };
        if let Err(error) = self.store.put(key, raw).await {
            warn!(%error, key = %key, "cache write failed");
        }
    }
}
