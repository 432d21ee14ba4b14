//! Memory Tier
//!
//! Shared handle around a [`MemoryCache`] holding JSON values.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use crate::cache::{MemoryCache, MemoryCacheConfig, MemoryStats};
use crate::clock::Clock;
use crate::tier::{CacheTier, TierName};

/// The `memory` tier of a [`CacheManager`](crate::CacheManager).
#[derive(Debug)]
pub struct MemoryTier {
    cache: Mutex<MemoryCache<Value>>,
}

impl MemoryTier {
    pub fn new(config: MemoryCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: Mutex::new(MemoryCache::new(config, clock)),
        }
    }

    /// Snapshot of the tier's contents.
    pub fn stats(&self) -> MemoryStats {
        self.cache.lock().stats()
    }

    /// Removes all stale entries, returning how many were removed.
    pub fn cleanup(&self) -> usize {
        self.cache.lock().cleanup()
    }

    /// Number of stored entries, including stale ones not yet purged.
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    pub fn config(&self) -> MemoryCacheConfig {
        self.cache.lock().config()
    }
}

impl CacheTier for MemoryTier {
    fn name(&self) -> TierName {
        TierName::Memory
    }

    fn set_value(&self, key: &str, value: Value, ttl: Option<Duration>) {
        self.cache.lock().set(key, value, ttl);
    }

    fn get_value(&self, key: &str) -> Option<Value> {
        self.cache.lock().get(key)
    }

    fn has(&self, key: &str) -> bool {
        self.cache.lock().has(key)
    }

    fn delete(&self, key: &str) -> bool {
        self.cache.lock().delete(key)
    }

    fn clear(&self) {
        self.cache.lock().clear();
    }
}
