//! Multilayer Tier
//!
//! Read-through / write-through view over the memory and local tiers.
//! Local is the backing store; memory holds recently touched keys for at
//! most [`MEMORY_RESIDENCY_CAP`].

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::manager::MemoryTier;
use crate::persistent::PersistentCache;
use crate::tier::{CacheTier, TierName};

/// Longest lifetime a multilayer write or promotion gives the memory copy.
pub const MEMORY_RESIDENCY_CAP: Duration = Duration::from_secs(5 * 60);

/// The `multilayer` tier. Owns no entries of its own.
#[derive(Debug, Clone)]
pub struct MultilayerTier {
    memory: Arc<MemoryTier>,
    local: Arc<PersistentCache>,
}

impl MultilayerTier {
    pub fn new(memory: Arc<MemoryTier>, local: Arc<PersistentCache>) -> Self {
        Self { memory, local }
    }
}

impl CacheTier for MultilayerTier {
    fn name(&self) -> TierName {
        TierName::Multilayer
    }

    /// Writes memory (lifetime capped) then local (lifetime as requested).
    fn set_value(&self, key: &str, value: Value, ttl: Option<Duration>) {
        let memory_ttl = ttl.unwrap_or(MEMORY_RESIDENCY_CAP).min(MEMORY_RESIDENCY_CAP);
        self.memory.set_value(key, value.clone(), Some(memory_ttl));
        self.local.set_value(key, value, ttl);
    }

    /// Memory first; on a memory miss a local hit is copied into memory
    /// before it is returned.
    fn get_value(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.memory.get_value(key) {
            return Some(value);
        }

        let value = self.local.get_value(key)?;
        self.memory
            .set_value(key, value.clone(), Some(MEMORY_RESIDENCY_CAP));
        debug!(key, "promoted local entry into memory");
        Some(value)
    }

    /// Checks both tiers without promoting.
    fn has(&self, key: &str) -> bool {
        self.memory.has(key) || self.local.has(key)
    }

    fn delete(&self, key: &str) -> bool {
        let in_memory = self.memory.delete(key);
        let in_local = self.local.delete(key);
        in_memory || in_local
    }

    fn clear(&self) {
        self.memory.clear();
        self.local.clear();
    }
}
