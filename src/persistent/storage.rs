//! Storage Area Module
//!
//! Keyed string stores that the persistent tiers serialize into. The area is
//! picked once, when a tier is built:
//! - [`NoopStorage`] when no storage is available
//! - [`SessionStorage`] for data scoped to the running process
//! - [`FileStorage`] for data persisted to disk across runs

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::utf16_len;
use crate::error::{StorageError, StorageResult};

// == Storage Area Trait ==
/// A string key/value area shared with code outside the cache.
///
/// Entries may vanish or change between two calls; callers must not assume
/// a key seen in `keys()` is still readable.
pub trait StorageArea: Send + Sync + fmt::Debug {
    /// Reads the raw value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Writes `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`, returning whether it was present.
    fn remove(&self, key: &str) -> StorageResult<bool>;

    /// Lists every key currently in the area.
    fn keys(&self) -> Vec<String>;

    /// Whether the area is backed by real storage.
    fn is_available(&self) -> bool {
        true
    }
}

// == No-op Storage ==
/// Stands in when the execution context has no storage.
///
/// Reads find nothing and writes are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStorage;

impl StorageArea for NoopStorage {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> StorageResult<bool> {
        Ok(false)
    }

    fn keys(&self) -> Vec<String> {
        Vec::new()
    }

    fn is_available(&self) -> bool {
        false
    }
}

// == String Map ==
/// Item map with browser-style quota accounting: every key and value costs
/// two bytes per UTF-16 code unit.
#[derive(Debug, Default)]
struct StringMap {
    items: HashMap<String, String>,
    quota: Option<usize>,
}

impl StringMap {
    fn item_size(key: &str, value: &str) -> usize {
        2 * (utf16_len(key) + utf16_len(value))
    }

    fn used_bytes(&self) -> usize {
        self.items
            .iter()
            .map(|(key, value)| Self::item_size(key, value))
            .sum()
    }

    /// Inserts the item if it fits, returning the value it replaced.
    fn insert(&mut self, key: &str, value: &str) -> StorageResult<Option<String>> {
        if let Some(quota) = self.quota {
            let replaced = self
                .items
                .get(key)
                .map_or(0, |old| Self::item_size(key, old));
            let required = self.used_bytes() - replaced + Self::item_size(key, value);
            if required > quota {
                return Err(StorageError::QuotaExceeded { required, quota });
            }
        }
        Ok(self.items.insert(key.to_string(), value.to_string()))
    }
}

// == Session Storage ==
/// In-process area that lives as long as the value holding it.
#[derive(Debug, Default)]
pub struct SessionStorage {
    map: Mutex<StringMap>,
}

impl SessionStorage {
    /// Creates an empty area without a quota.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty area holding at most `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            map: Mutex::new(StringMap {
                items: HashMap::new(),
                quota: Some(quota),
            }),
        }
    }

    /// Bytes currently charged against the quota.
    pub fn used_bytes(&self) -> usize {
        self.map.lock().used_bytes()
    }
}

impl StorageArea for SessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().items.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.map.lock().insert(key, value).map(|_| ())
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        Ok(self.map.lock().items.remove(key).is_some())
    }

    fn keys(&self) -> Vec<String> {
        self.map.lock().items.keys().cloned().collect()
    }
}

// == File Storage ==
/// Area persisted as a JSON object in `<dir>/<name>.json`.
///
/// The whole map is loaded on open and rewritten on every mutation through a
/// temporary file and a rename, so a crash leaves either the old or the new
/// file in place.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    map: Mutex<StringMap>,
}

impl FileStorage {
    // == Constructor ==
    /// Opens (or creates) the area named `name` under `dir`.
    ///
    /// # Arguments
    /// * `dir` - Directory holding the backing file, created if missing
    /// * `name` - File stem of the backing file
    /// * `quota` - Optional byte quota
    pub fn open(dir: impl AsRef<Path>, name: &str, quota: Option<usize>) -> StorageResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{name}.json"));

        let items = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            HashMap::new()
        };
        debug!(path = %path.display(), items = items.len(), "opened file storage");

        Ok(Self {
            path,
            map: Mutex::new(StringMap { items, quota }),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, map: &StringMap) -> StorageResult<()> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&map.items)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StorageArea for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().items.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut map = self.map.lock();
        let previous = map.insert(key, value)?;

        if let Err(err) = self.persist(&map) {
            // Keep memory in step with what is on disk
            match previous {
                Some(old) => map.items.insert(key.to_string(), old),
                None => map.items.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        let mut map = self.map.lock();
        let Some(previous) = map.items.remove(key) else {
            return Ok(false);
        };

        if let Err(err) = self.persist(&map) {
            map.items.insert(key.to_string(), previous);
            return Err(err);
        }
        Ok(true)
    }

    fn keys(&self) -> Vec<String> {
        self.map.lock().items.keys().cloned().collect()
    }
}
