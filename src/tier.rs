//! Tier Interface
//!
//! The operations every cache tier exposes, independent of where the tier
//! keeps its entries. Values cross the interface as JSON; [`CacheTierExt`]
//! adds typed access on top.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::CacheError;

// == Tier Name ==
/// Name of an addressable tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierName {
    #[default]
    Memory,
    Local,
    Session,
    /// Memory in front of local, with promotion on read
    Multilayer,
}

impl TierName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierName::Memory => "memory",
            TierName::Local => "local",
            TierName::Session => "session",
            TierName::Multilayer => "multilayer",
        }
    }
}

impl fmt::Display for TierName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TierName {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(TierName::Memory),
            "local" => Ok(TierName::Local),
            "session" => Ok(TierName::Session),
            "multilayer" => Ok(TierName::Multilayer),
            _ => Err(CacheError::UnknownTier(s.to_string())),
        }
    }
}

// == Cache Tier Trait ==
/// Operations shared by all tiers. None of them fail: problems underneath
/// degrade to a miss or a dropped write.
pub trait CacheTier: Send + Sync + fmt::Debug {
    /// Which tier this is.
    fn name(&self) -> TierName;

    /// Stores `value` under `key`; `None` uses the tier's default lifetime.
    fn set_value(&self, key: &str, value: Value, ttl: Option<Duration>);

    /// Returns the live value under `key`.
    fn get_value(&self, key: &str) -> Option<Value>;

    /// Whether a live value is stored under `key`.
    fn has(&self, key: &str) -> bool;

    /// Removes `key`, returning whether it was stored.
    fn delete(&self, key: &str) -> bool;

    /// Removes every entry owned by the tier.
    fn clear(&self);
}

// == Typed Access ==
/// Typed `set`/`get` for any [`CacheTier`], including `dyn CacheTier`.
pub trait CacheTierExt: CacheTier {
    /// Serializes `data` and stores it. A value that cannot be represented
    /// as JSON is logged and not stored.
    fn set<T: Serialize + ?Sized>(&self, key: &str, data: &T, ttl: Option<Duration>) {
        match serde_json::to_value(data) {
            Ok(value) => self.set_value(key, value, ttl),
            Err(err) => error!(tier = %self.name(), key, error = %err, "cannot serialize cache value"),
        }
    }

    /// Reads the value under `key` as a `T`; a value of another shape is a miss.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key)?;
        match serde_json::from_value(value) {
            Ok(data) => Some(data),
            Err(err) => {
                debug!(tier = %self.name(), key, error = %err, "cached value has unexpected shape");
                None
            }
        }
    }
}

impl<C: CacheTier + ?Sized> CacheTierExt for C {}
