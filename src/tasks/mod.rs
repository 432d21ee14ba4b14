//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache manager is alive.
//!
//! # Tasks
//! - TTL Cleanup: Purges stale memory and local entries at a configured interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
