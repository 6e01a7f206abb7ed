//! Cache store adapters.
//!
//! [`MemoryCacheStore`] keeps entries in a process-local map and suits single
//! instance deployments and tests. [`RedisCacheStore`] shares entries across
//! instances through a pooled Redis connection.

mod memory;
mod redis;

pub use memory::MemoryCacheStore;
pub use redis::{RedisCacheStore, RedisCacheStoreError};
