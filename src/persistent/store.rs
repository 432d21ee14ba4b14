//! Persistent Cache Module
//!
//! TTL-aware cache that stores each entry as a JSON document in a
//! [`StorageArea`], under a key prefix shared by all entries of the tier.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::cache::{is_stale, StoredEntry};
use crate::clock::{duration_ms, Clock};
use crate::persistent::StorageArea;
use crate::tier::{CacheTier, TierName};

/// Prefix put in front of every key written by a persistent tier.
pub const DEFAULT_KEY_PREFIX: &str = "obdoc_cache_";

/// Default lifetime of persistent entries (24 hours).
pub const DEFAULT_PERSISTENT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// == Persistent Kind ==
/// Which storage area a persistent tier targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersistentKind {
    /// Long-lived area; failed writes are retried once after a cleanup
    Local,
    /// Area scoped to the running session; failed writes are dropped
    Session,
}

impl fmt::Display for PersistentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistentKind::Local => f.write_str("local"),
            PersistentKind::Session => f.write_str("session"),
        }
    }
}

// == Persistent Cache Config ==
#[derive(Debug, Clone, PartialEq)]
pub struct PersistentCacheConfig {
    /// Prefix separating this tier's keys from unrelated keys in the area
    pub prefix: String,
    /// Lifetime applied when `set` is called without a TTL
    pub ttl: Duration,
}

impl Default for PersistentCacheConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            ttl: DEFAULT_PERSISTENT_TTL,
        }
    }
}

/// Expiry fields of a stored document; `data` is not needed to judge staleness.
#[derive(Deserialize)]
struct EntryHeader {
    timestamp: u64,
    ttl: u64,
}

// == Persistent Cache ==
/// Cache tier serialized into a string storage area.
///
/// Every operation is best-effort: storage failures are logged and degrade
/// to a miss or a dropped write, never to an error for the caller.
#[derive(Debug)]
pub struct PersistentCache {
    kind: PersistentKind,
    storage: Arc<dyn StorageArea>,
    prefix: String,
    /// Default TTL in milliseconds
    default_ttl: u64,
    clock: Arc<dyn Clock>,
}

impl PersistentCache {
    // == Constructors ==
    /// Builds a tier over a long-lived area.
    pub fn local(
        storage: Arc<dyn StorageArea>,
        config: PersistentCacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(PersistentKind::Local, storage, config, clock)
    }

    /// Builds a tier over a session-scoped area.
    pub fn session(
        storage: Arc<dyn StorageArea>,
        config: PersistentCacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(PersistentKind::Session, storage, config, clock)
    }

    fn new(
        kind: PersistentKind,
        storage: Arc<dyn StorageArea>,
        config: PersistentCacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            kind,
            storage,
            prefix: config.prefix,
            default_ttl: duration_ms(config.ttl),
            clock,
        }
    }

    pub fn kind(&self) -> PersistentKind {
        self.kind
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The area this tier writes into.
    pub fn storage(&self) -> &Arc<dyn StorageArea> {
        &self.storage
    }

    /// Whether writes can actually land anywhere.
    pub fn is_available(&self) -> bool {
        self.storage.is_available()
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn prefixed_keys(&self) -> Vec<String> {
        self.storage
            .keys()
            .into_iter()
            .filter(|key| key.starts_with(&self.prefix))
            .collect()
    }

    // == Set ==
    /// Serializes `data` and writes it under the prefixed key.
    ///
    /// # Arguments
    /// * `key` - The key to store, without prefix
    /// * `data` - The value to store
    /// * `ttl` - Optional lifetime (uses the tier default if None)
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, data: &T, ttl: Option<Duration>) {
        let ttl = ttl.map_or(self.default_ttl, duration_ms);
        let entry = StoredEntry::new(data, ttl, self.clock.now_ms());

        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(err) => {
                error!(tier = %self.kind, key, error = %err, "cannot serialize cache entry");
                return;
            }
        };

        self.write(key, &raw);
    }

    fn write(&self, key: &str, raw: &str) {
        let storage_key = self.storage_key(key);
        let Err(err) = self.storage.set(&storage_key, raw) else {
            return;
        };

        match self.kind {
            PersistentKind::Local => {
                warn!(tier = %self.kind, key, error = %err, "storage write failed, cleaning up and retrying");
                self.cleanup();
                if let Err(err) = self.storage.set(&storage_key, raw) {
                    error!(tier = %self.kind, key, error = %err, "storage write failed after cleanup, entry dropped");
                }
            }
            PersistentKind::Session => {
                warn!(tier = %self.kind, key, error = %err, "storage write failed, entry dropped");
            }
        }
    }

    // == Get ==
    /// Reads the live value stored under `key` as raw JSON.
    ///
    /// A corrupted document reads as a miss and is left for `cleanup()`;
    /// a stale one is removed.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        let storage_key = self.storage_key(key);
        let raw = self.storage.get(&storage_key)?;

        let entry: StoredEntry<Value> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                debug!(tier = %self.kind, key, error = %err, "ignoring corrupted cache entry");
                return None;
            }
        };

        if entry.is_expired(self.clock.now_ms()) {
            self.remove_raw(&storage_key);
            return None;
        }

        Some(entry.data)
    }

    /// Reads the live value stored under `key` as a `T`.
    ///
    /// A value that does not deserialize into `T` reads as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key)?;
        serde_json::from_value(value)
            .map_err(|err| debug!(tier = %self.kind, key, error = %err, "cached value has unexpected shape"))
            .ok()
    }

    // == Has ==
    pub fn has(&self, key: &str) -> bool {
        self.get_value(key).is_some()
    }

    // == Delete ==
    /// Removes the entry for `key`, returning whether one was stored.
    pub fn delete(&self, key: &str) -> bool {
        self.remove_raw(&self.storage_key(key))
    }

    fn remove_raw(&self, storage_key: &str) -> bool {
        self.storage.remove(storage_key).unwrap_or_else(|err| {
            warn!(tier = %self.kind, key = storage_key, error = %err, "storage remove failed");
            false
        })
    }

    // == Clear ==
    /// Removes every key carrying this tier's prefix. Other keys are untouched.
    pub fn clear(&self) {
        for storage_key in self.prefixed_keys() {
            self.remove_raw(&storage_key);
        }
    }

    // == Cleanup ==
    /// Removes every prefixed entry that is stale or cannot be parsed.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_ms();
        let mut removed = 0;

        for storage_key in self.prefixed_keys() {
            // The key may have vanished since it was listed
            let Some(raw) = self.storage.get(&storage_key) else {
                continue;
            };

            let purge = match serde_json::from_str::<EntryHeader>(&raw) {
                Ok(header) => is_stale(header.timestamp, header.ttl, now),
                Err(_) => true,
            };

            if purge && self.remove_raw(&storage_key) {
                removed += 1;
            }
        }

        removed
    }

    // == Keys ==
    /// Lists the unprefixed keys of every stored entry, live or not.
    pub fn keys(&self) -> Vec<String> {
        self.prefixed_keys()
            .into_iter()
            .map(|key| key[self.prefix.len()..].to_string())
            .collect()
    }
}

impl CacheTier for PersistentCache {
    fn name(&self) -> TierName {
        match self.kind {
            PersistentKind::Local => TierName::Local,
            PersistentKind::Session => TierName::Session,
        }
    }

    fn set_value(&self, key: &str, value: Value, ttl: Option<Duration>) {
        PersistentCache::set(self, key, &value, ttl);
    }

    fn get_value(&self, key: &str) -> Option<Value> {
        PersistentCache::get_value(self, key)
    }

    fn has(&self, key: &str) -> bool {
        PersistentCache::has(self, key)
    }

    fn delete(&self, key: &str) -> bool {
        PersistentCache::delete(self, key)
    }

    fn clear(&self) {
        PersistentCache::clear(self);
    }
}
