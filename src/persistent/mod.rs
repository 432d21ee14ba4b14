//! Persistent Tier Module
//!
//! TTL-aware tiers serialized into string storage areas.

mod storage;
mod store;

pub use storage::{FileStorage, NoopStorage, SessionStorage, StorageArea};
pub use store::{
    PersistentCache, PersistentCacheConfig, PersistentKind, DEFAULT_KEY_PREFIX,
    DEFAULT_PERSISTENT_TTL,
};
