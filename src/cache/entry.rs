//! Cache Entry Module
//!
//! Defines the unit stored per key in every tier, and its serialized shape
//! in the persistent tiers.

use serde::{Deserialize, Serialize};

// == Staleness ==
/// An entry written at `timestamp` with lifetime `ttl` is stale once more
/// than `ttl` milliseconds have elapsed. Exactly `ttl` elapsed is still live.
pub fn is_stale(timestamp: u64, ttl: u64, now: u64) -> bool {
    now.saturating_sub(timestamp) > ttl
}

// == Cache Entry ==
/// A single memory-tier entry with its value and access metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    /// The stored value
    pub data: T,
    /// Write time (Unix milliseconds), never changed by reads
    pub timestamp: u64,
    /// Lifetime in milliseconds
    pub ttl: u64,
    /// Number of successful reads since the write
    pub access_count: u64,
    /// Time of the most recent successful read (Unix milliseconds)
    pub last_accessed: u64,
    /// Position of the key in insertion order
    pub sequence: u64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a fresh entry written at `now`.
    ///
    /// # Arguments
    /// * `data` - The value to store
    /// * `ttl` - Lifetime in milliseconds
    /// * `now` - Write time in Unix milliseconds
    /// * `sequence` - Insertion-order position of the key
    pub fn new(data: T, ttl: u64, now: u64, sequence: u64) -> Self {
        Self {
            data,
            timestamp: now,
            ttl,
            access_count: 0,
            last_accessed: now,
            sequence,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry is stale at `now`.
    pub fn is_expired(&self, now: u64) -> bool {
        is_stale(self.timestamp, self.ttl, now)
    }

    // == Touch ==
    /// Records a successful read at `now`.
    pub fn touch(&mut self, now: u64) {
        self.access_count += 1;
        self.last_accessed = now;
    }
}

// == Stored Entry ==
/// The JSON document written to a storage area by the persistent tiers:
/// `{"data": ..., "timestamp": ..., "ttl": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry<T> {
    pub data: T,
    pub timestamp: u64,
    pub ttl: u64,
}

impl<T> StoredEntry<T> {
    pub fn new(data: T, ttl: u64, now: u64) -> Self {
        Self {
            data,
            timestamp: now,
            ttl,
        }
    }

    pub fn is_expired(&self, now: u64) -> bool {
        is_stale(self.timestamp, self.ttl, now)
    }
}
