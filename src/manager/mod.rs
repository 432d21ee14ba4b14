//! Cache Manager Module
//!
//! Composes the memory, local and session tiers, plus the multilayer view
//! over memory and local, and owns the background cleanup task.

mod memory_tier;
mod multilayer;

pub use memory_tier::MemoryTier;
pub use multilayer::{MultilayerTier, MEMORY_RESIDENCY_CAP};

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::{system_clock, Clock};
use crate::config::Config;
use crate::error::Result;
use crate::persistent::{FileStorage, NoopStorage, PersistentCache, SessionStorage, StorageArea};
use crate::tasks::spawn_cleanup_task;
use crate::tier::{CacheTier, TierName};

/// File stem of the local tier's backing file.
pub const LOCAL_AREA_NAME: &str = "local_storage";

fn session_storage(config: &Config) -> Arc<dyn StorageArea> {
    match config.storage_quota_bytes {
        Some(quota) => Arc::new(SessionStorage::with_quota(quota)),
        None => Arc::new(SessionStorage::new()),
    }
}

// == Cache Manager ==
/// Single entry point to every tier.
///
/// Construct one per application (or per test) and share it; there is no
/// global instance.
#[derive(Debug)]
pub struct CacheManager {
    memory: Arc<MemoryTier>,
    local: Arc<PersistentCache>,
    session: Arc<PersistentCache>,
    multilayer: Arc<MultilayerTier>,
    cleanup_interval: Duration,
    cleanup_task: Mutex<Option<JoinHandle<()>>>,
}

impl CacheManager {
    // == Constructors ==
    /// Builds the tiers described by `config`.
    ///
    /// The local tier is backed by a file under `config.storage_dir`. Without
    /// a directory the local tier runs over [`NoopStorage`]. A directory whose
    /// backing file cannot be opened or parsed is an error.
    pub fn try_new(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let local_storage: Arc<dyn StorageArea> = match &config.storage_dir {
            Some(dir) => Arc::new(FileStorage::open(
                dir,
                LOCAL_AREA_NAME,
                config.storage_quota_bytes,
            )?),
            None => Arc::new(NoopStorage),
        };

        Ok(Self::with_storage(
            config,
            local_storage,
            session_storage(config),
            clock,
        ))
    }

    /// Like [`try_new`](Self::try_new), but a local file that cannot be
    /// opened leaves the local tier unavailable instead of failing.
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> Self {
        match Self::try_new(config, clock.clone()) {
            Ok(manager) => manager,
            Err(err) => {
                warn!(error = %err, "local storage unavailable, local tier disabled");
                Self::with_storage(config, Arc::new(NoopStorage), session_storage(config), clock)
            }
        }
    }

    /// Builds the tiers over explicitly supplied storage areas.
    pub fn with_storage(
        config: &Config,
        local_storage: Arc<dyn StorageArea>,
        session_storage: Arc<dyn StorageArea>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let memory = Arc::new(MemoryTier::new(config.memory_config(), clock.clone()));
        let local = Arc::new(PersistentCache::local(
            local_storage,
            config.persistent_config(),
            clock.clone(),
        ));
        let session = Arc::new(PersistentCache::session(
            session_storage,
            config.persistent_config(),
            clock,
        ));
        let multilayer = Arc::new(MultilayerTier::new(memory.clone(), local.clone()));

        info!(
            memory_max_size = config.memory_max_size,
            strategy = %config.memory_strategy,
            local_available = local.is_available(),
            "cache manager initialized"
        );

        Self {
            memory,
            local,
            session,
            multilayer,
            cleanup_interval: config.cleanup_interval(),
            cleanup_task: Mutex::new(None),
        }
    }

    /// Builds the tiers on the system clock and starts background cleanup.
    pub fn start(config: &Config) -> Self {
        let manager = Self::new(config, system_clock());
        manager.start_cleanup();
        manager
    }

    // == Tier Access ==
    pub fn memory(&self) -> &Arc<MemoryTier> {
        &self.memory
    }

    pub fn local(&self) -> &Arc<PersistentCache> {
        &self.local
    }

    pub fn session(&self) -> &Arc<PersistentCache> {
        &self.session
    }

    pub fn multilayer(&self) -> &Arc<MultilayerTier> {
        &self.multilayer
    }

    /// Selects a tier by name.
    pub fn tier(&self, name: TierName) -> Arc<dyn CacheTier> {
        match name {
            TierName::Memory => self.memory.clone(),
            TierName::Local => self.local.clone(),
            TierName::Session => self.session.clone(),
            TierName::Multilayer => self.multilayer.clone(),
        }
    }

    // == Cleanup ==
    /// Purges stale entries from the memory and local tiers now.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&self) -> usize {
        self.memory.cleanup() + self.local.cleanup()
    }

    /// Starts the periodic cleanup task.
    ///
    /// Does nothing, and returns false, outside a tokio runtime or when the
    /// task is already running.
    pub fn start_cleanup(&self) -> bool {
        let mut task = self.cleanup_task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            debug!("no async runtime, background cleanup not started");
            return false;
        }

        *task = Some(spawn_cleanup_task(
            self.memory.clone(),
            self.local.clone(),
            self.cleanup_interval,
        ));
        true
    }

    pub fn is_cleanup_running(&self) -> bool {
        self.cleanup_task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // == Shutdown ==
    /// Stops the cleanup task. Tiers stay usable.
    pub fn shutdown(&self) {
        if let Some(handle) = self.cleanup_task.lock().take() {
            handle.abort();
            info!("cache cleanup task stopped");
        }
    }
}

impl Drop for CacheManager {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup_task.get_mut().take() {
            handle.abort();
        }
    }
}
