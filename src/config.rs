//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::{EvictionStrategy, MemoryCacheConfig};
use crate::persistent::{PersistentCacheConfig, DEFAULT_KEY_PREFIX};

/// Shortest interval handed to the cleanup task.
const MIN_CLEANUP_INTERVAL_SECS: u64 = 1;

/// Cache manager configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Maximum number of entries the memory tier can hold
    pub memory_max_size: usize,
    /// Default memory-tier TTL in milliseconds
    pub memory_ttl_ms: u64,
    /// Memory-tier eviction strategy
    pub memory_strategy: EvictionStrategy,
    /// Default TTL in milliseconds for the local and session tiers
    pub persistent_ttl_ms: u64,
    /// Prefix of every key written to a storage area
    pub key_prefix: String,
    /// Background cleanup interval in seconds
    pub cleanup_interval_secs: u64,
    /// Directory of the local tier's backing file; None leaves the tier unavailable
    pub storage_dir: Option<PathBuf>,
    /// Byte quota applied to each storage area; None means unbounded
    pub storage_quota_bytes: Option<usize>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MEMORY_MAX_SIZE` - Memory tier entry bound (default: 200)
    /// - `CACHE_MEMORY_TTL_MS` - Memory tier TTL in ms (default: 300000)
    /// - `CACHE_MEMORY_STRATEGY` - LRU, LFU or FIFO (default: LRU)
    /// - `CACHE_PERSISTENT_TTL_MS` - Local/session TTL in ms (default: 86400000)
    /// - `CACHE_KEY_PREFIX` - Storage key prefix (default: obdoc_cache_)
    /// - `CACHE_CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 600)
    /// - `CACHE_STORAGE_DIR` - Local tier directory (default: unset)
    /// - `CACHE_STORAGE_QUOTA` - Per-area quota in bytes (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            memory_max_size: parse_var("CACHE_MEMORY_MAX_SIZE").unwrap_or(defaults.memory_max_size),
            memory_ttl_ms: parse_var("CACHE_MEMORY_TTL_MS").unwrap_or(defaults.memory_ttl_ms),
            memory_strategy: parse_var("CACHE_MEMORY_STRATEGY")
                .unwrap_or(defaults.memory_strategy),
            persistent_ttl_ms: parse_var("CACHE_PERSISTENT_TTL_MS")
                .unwrap_or(defaults.persistent_ttl_ms),
            key_prefix: env::var("CACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            cleanup_interval_secs: parse_var("CACHE_CLEANUP_INTERVAL")
                .unwrap_or(defaults.cleanup_interval_secs),
            storage_dir: env::var_os("CACHE_STORAGE_DIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            storage_quota_bytes: parse_var("CACHE_STORAGE_QUOTA"),
        }
    }

    /// Parameters of the memory tier.
    pub fn memory_config(&self) -> MemoryCacheConfig {
        MemoryCacheConfig {
            ttl: Duration::from_millis(self.memory_ttl_ms),
            max_size: self.memory_max_size,
            strategy: self.memory_strategy,
        }
    }

    /// Parameters shared by the local and session tiers.
    pub fn persistent_config(&self) -> PersistentCacheConfig {
        PersistentCacheConfig {
            prefix: self.key_prefix.clone(),
            ttl: Duration::from_millis(self.persistent_ttl_ms),
        }
    }

    /// Time between background sweeps, never shorter than one second.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(MIN_CLEANUP_INTERVAL_SECS))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_max_size: 200,
            memory_ttl_ms: 5 * 60 * 1000,
            memory_strategy: EvictionStrategy::Lru,
            persistent_ttl_ms: 24 * 60 * 60 * 1000,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            cleanup_interval_secs: 10 * 60,
            storage_dir: None,
            storage_quota_bytes: None,
        }
    }
}

/// Reads and parses an environment variable, ignoring unset or malformed values.
fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.memory_max_size, 200);
        assert_eq!(config.memory_ttl_ms, 300_000);
        assert_eq!(config.memory_strategy, EvictionStrategy::Lru);
        assert_eq!(config.persistent_ttl_ms, 86_400_000);
        assert_eq!(config.key_prefix, "obdoc_cache_");
        assert_eq!(config.cleanup_interval(), Duration::from_secs(600));
        assert!(config.storage_dir.is_none());
        assert!(config.storage_quota_bytes.is_none());
    }

    #[test]
    fn test_config_derived_tier_configs() {
        let config = Config::default();

        let memory = config.memory_config();
        assert_eq!(memory.max_size, 200);
        assert_eq!(memory.ttl, Duration::from_secs(300));

        let persistent = config.persistent_config();
        assert_eq!(persistent.prefix, "obdoc_cache_");
        assert_eq!(persistent.ttl, Duration::from_secs(86_400));
    }

    #[test]
    fn test_zero_cleanup_interval_is_raised() {
        let config = Config {
            cleanup_interval_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.cleanup_interval(), Duration::from_secs(1));
    }

    // Single test touching the process environment, so parallel tests never race on it
    #[test]
    fn test_config_from_env() {
        let vars = [
            "CACHE_MEMORY_MAX_SIZE",
            "CACHE_MEMORY_TTL_MS",
            "CACHE_MEMORY_STRATEGY",
            "CACHE_PERSISTENT_TTL_MS",
            "CACHE_KEY_PREFIX",
            "CACHE_CLEANUP_INTERVAL",
            "CACHE_STORAGE_DIR",
            "CACHE_STORAGE_QUOTA",
        ];
        for var in vars {
            env::remove_var(var);
        }
        assert_eq!(Config::from_env(), Config::default());

        env::set_var("CACHE_MEMORY_MAX_SIZE", "50");
        env::set_var("CACHE_MEMORY_STRATEGY", "lfu");
        env::set_var("CACHE_KEY_PREFIX", "app_");
        env::set_var("CACHE_CLEANUP_INTERVAL", "not-a-number");
        env::set_var("CACHE_STORAGE_DIR", "/tmp/tiercache");
        env::set_var("CACHE_STORAGE_QUOTA", "5242880");

        let config = Config::from_env();
        assert_eq!(config.memory_max_size, 50);
        assert_eq!(config.memory_strategy, EvictionStrategy::Lfu);
        assert_eq!(config.key_prefix, "app_");
        assert_eq!(config.cleanup_interval_secs, 600, "malformed values fall back");
        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/tiercache")));
        assert_eq!(config.storage_quota_bytes, Some(5_242_880));

        for var in vars {
            env::remove_var(var);
        }
    }
}
