//! Tiercache - A multi-tier cache with memory, local and session tiers
//!
//! Provides a bounded in-memory cache with TTL expiration and LRU/LFU/FIFO
//! eviction, two persistent key/value tiers, a read-through multilayer view,
//! and helpers for memoizing async functions.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod fetch;
pub mod manager;
pub mod persistent;
pub mod tasks;
pub mod tier;

pub use cache::{EvictionStrategy, MemoryCache, MemoryCacheConfig, MemoryStats};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{CacheError, StorageError};
pub use fetch::{get_or_fetch, memoize, CacheBinding, FetchOptions, FetchState, Memoized};
pub use manager::{CacheManager, MemoryTier, MultilayerTier};
pub use persistent::{PersistentCache, PersistentKind, StorageArea};
pub use tasks::spawn_cleanup_task;
pub use tier::{CacheTier, CacheTierExt, TierName};
