//! Memory Cache Module
//!
//! Bounded in-process cache combining HashMap storage with TTL expiration
//! and a configurable eviction strategy.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::cache::{utf16_len, CacheEntry, EvictionStrategy, MemoryStats};
use crate::clock::{duration_ms, Clock};

/// Default lifetime of memory-tier entries (5 minutes).
pub const DEFAULT_MEMORY_TTL: Duration = Duration::from_secs(5 * 60);

/// Default entry bound of a standalone memory cache.
pub const DEFAULT_MAX_SIZE: usize = 100;

// == Memory Cache Config ==
/// Construction parameters for a [`MemoryCache`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryCacheConfig {
    /// Lifetime applied when `set` is called without a TTL
    pub ttl: Duration,
    /// Maximum number of stored entries (at least 1)
    pub max_size: usize,
    /// Victim selection policy
    pub strategy: EvictionStrategy,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_MEMORY_TTL,
            max_size: DEFAULT_MAX_SIZE,
            strategy: EvictionStrategy::Lru,
        }
    }
}

// == Memory Cache ==
/// Size-bounded key/value store with TTL and pluggable eviction.
#[derive(Debug)]
pub struct MemoryCache<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Next insertion-order position
    next_sequence: u64,
    /// Default TTL in milliseconds
    default_ttl: u64,
    /// Maximum number of entries allowed
    max_size: usize,
    strategy: EvictionStrategy,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> MemoryCache<V> {
    // == Constructor ==
    /// Creates an empty cache.
    ///
    /// A `max_size` of 0 is raised to 1 so that a write can always land.
    pub fn new(config: MemoryCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            next_sequence: 0,
            default_ttl: duration_ms(config.ttl),
            max_size: config.max_size.max(1),
            strategy: config.strategy,
            clock,
        }
    }

    /// Returns the configuration the cache is running with.
    pub fn config(&self) -> MemoryCacheConfig {
        MemoryCacheConfig {
            ttl: Duration::from_millis(self.default_ttl),
            max_size: self.max_size,
            strategy: self.strategy,
        }
    }

    // == Set ==
    /// Stores a value, replacing any existing entry for the key.
    ///
    /// If the key is new and the cache is full, exactly one entry is evicted
    /// first. Overwrites never evict. The entry's timestamp and access stats
    /// are reset.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `data` - The value to store
    /// * `ttl` - Optional lifetime (uses the cache default if None)
    pub fn set(&mut self, key: impl Into<String>, data: V, ttl: Option<Duration>) {
        let key = key.into();
        let now = self.clock.now_ms();

        // An overwrite keeps the key's place in insertion order
        let sequence = match self.entries.get(&key) {
            Some(existing) => existing.sequence,
            None => {
                if self.entries.len() >= self.max_size {
                    self.evict();
                }
                let sequence = self.next_sequence;
                self.next_sequence += 1;
                sequence
            }
        };

        let ttl = ttl.map_or(self.default_ttl, duration_ms);
        self.entries
            .insert(key, CacheEntry::new(data, ttl, now, sequence));
    }

    // == Get ==
    /// Retrieves a live value and records the read.
    ///
    /// A stale entry is removed and reported as absent without touching its
    /// access stats.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        let entry = self.entries.get_mut(key)?;

        if entry.is_expired(now) {
            self.entries.remove(key);
            return None;
        }

        entry.touch(now);
        Some(entry.data.clone())
    }

    // == Has ==
    /// Checks liveness without recording a read. Removes a stale entry.
    pub fn has(&mut self, key: &str) -> bool {
        let now = self.clock.now_ms();
        match self.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                self.entries.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    // == Delete ==
    /// Removes an entry, returning whether it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // == Cleanup ==
    /// Removes all stale entries.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&mut self) -> usize {
        let now = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    // == Length ==
    /// Returns the number of stored entries, including stale ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes the strategy's victim.
    fn evict(&mut self) {
        if let Some(victim) = self.strategy.select_victim(&self.entries) {
            self.entries.remove(&victim);
            debug!(key = %victim, strategy = %self.strategy, "evicted memory cache entry");
        }
    }
}

impl<V: Clone + Serialize> MemoryCache<V> {
    // == Stats ==
    /// Returns a snapshot of the cache's contents.
    ///
    /// This is observational: stale entries are counted, not removed.
    pub fn stats(&self) -> MemoryStats {
        let now = self.clock.now_ms();
        let mut stats = MemoryStats::new();

        for (key, entry) in &self.entries {
            let json_len = serde_json::to_string(&entry.data)
                .map(|json| utf16_len(&json))
                .unwrap_or(0);
            stats.record_entry(key, json_len, entry.access_count, entry.is_expired(now));
        }

        stats.finish()
    }
}
