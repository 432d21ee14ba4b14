//! TTL Cleanup Task
//!
//! Background task that periodically purges stale entries from the memory
//! and local tiers.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::manager::MemoryTier;
use crate::persistent::PersistentCache;

/// Spawns a background task that periodically cleans up stale entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between sweeps of the memory tier and the local tier. Session storage is
/// left to expire lazily.
///
/// # Arguments
/// * `memory` - Shared memory tier
/// * `local` - Shared local tier
/// * `interval` - Time between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which must be aborted when the owner
/// of the tiers shuts down.
///
/// # Example
/// ```ignore
/// let handle = spawn_cleanup_task(memory.clone(), local.clone(), Duration::from_secs(600));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task(
    memory: Arc<MemoryTier>,
    local: Arc<PersistentCache>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} ms",
            interval.as_millis()
        );

        loop {
            tokio::time::sleep(interval).await;

            let from_memory = memory.cleanup();
            let from_local = local.cleanup();

            if from_memory + from_local > 0 {
                info!(
                    "TTL cleanup: removed {} memory and {} local entries",
                    from_memory, from_local
                );
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
