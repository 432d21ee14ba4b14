//! Cache Module
//!
//! Provides the in-process memory tier: TTL expiration, bounded size and
//! LRU / LFU / FIFO eviction.

mod entry;
mod eviction;
mod memory;
mod stats;


// Re-export public types
pub use entry::{is_stale, CacheEntry, StoredEntry};
pub use eviction::EvictionStrategy;
pub use memory::{MemoryCache, MemoryCacheConfig, DEFAULT_MAX_SIZE, DEFAULT_MEMORY_TTL};
pub use stats::{utf16_len, MemoryStats, ENTRY_OVERHEAD_BYTES};
