//! Error types for the cache subsystem
//!
//! Cache reads and writes never fail from the caller's point of view; these
//! types cover the storage areas underneath the persistent tiers and the
//! parsing of configuration values.

use thiserror::Error;

// == Storage Error Enum ==
/// Failure reported by a storage area backing a persistent tier.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The write would push the area past its byte quota
    #[error("Storage quota exceeded: {required} bytes required, quota is {quota} bytes")]
    QuotaExceeded { required: usize, quota: usize },

    /// The backing file could not be read or written
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file holds something other than a string map
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == Cache Error Enum ==
/// Unified error type for fallible construction and parsing.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Tier name is not one of memory, local, session, multilayer
    #[error("Unknown cache tier: {0}")]
    UnknownTier(String),

    /// Eviction strategy is not one of LRU, LFU, FIFO
    #[error("Unknown eviction strategy: {0}")]
    UnknownStrategy(String),

    /// A storage area could not be opened
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// == Result Type Aliases ==
/// Convenience Result type for the cache subsystem.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Result type returned by storage areas.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
