//! Fetch Binding
//!
//! Cache-or-fetch access to a single key, either as a one-shot call
//! ([`get_or_fetch`]) or as a long-lived binding that publishes its state to
//! subscribers ([`CacheBinding`]).

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::manager::CacheManager;
use crate::tier::{CacheTier, CacheTierExt, TierName};

// == One-shot ==
/// Returns the cached value for `key`, or runs `fetcher` and caches its result.
///
/// A fetch error is returned as is and leaves the tier untouched.
pub async fn get_or_fetch<T, F, Fut>(
    tier: &dyn CacheTier,
    key: &str,
    fetcher: F,
    ttl: Option<Duration>,
) -> anyhow::Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    if let Some(cached) = tier.get::<T>(key) {
        return Ok(cached);
    }

    let value = fetcher().await?;
    tier.set(key, &value, ttl);
    Ok(value)
}

// == Fetch State ==
/// What a [`CacheBinding`] currently knows about its key.
#[derive(Debug, Clone)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub loading: bool,
    /// Error of the most recent fetch, cleared by the next success
    pub error: Option<Arc<anyhow::Error>>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

// == Fetch Options ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Lifetime of fetched values (tier default if None)
    pub ttl: Option<Duration>,
    /// Tier the binding reads and writes
    pub tier: TierName,
    /// A disabled binding does not load
    pub enabled: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            tier: TierName::Memory,
            enabled: true,
        }
    }
}

// == Cache Binding ==
/// Binds one key of one tier to a fetcher.
///
/// Every state change is published on a watch channel; callers observe it
/// through [`CacheBinding::subscribe`] or read it with [`CacheBinding::state`].
pub struct CacheBinding<T, F> {
    key: String,
    tier: Arc<dyn CacheTier>,
    fetcher: F,
    ttl: Option<Duration>,
    enabled: AtomicBool,
    state: watch::Sender<FetchState<T>>,
}

impl<T, F, Fut> CacheBinding<T, F>
where
    T: Serialize + DeserializeOwned + Clone,
    F: Fn() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    // == Constructor ==
    /// Creates an idle binding. Nothing is read or fetched until [`load`](Self::load).
    pub fn new(
        manager: &CacheManager,
        key: impl Into<String>,
        fetcher: F,
        options: FetchOptions,
    ) -> Self {
        Self::with_tier(manager.tier(options.tier), key, fetcher, options)
    }

    /// Creates an idle binding over an explicit tier. `options.tier` is ignored.
    pub fn with_tier(
        tier: Arc<dyn CacheTier>,
        key: impl Into<String>,
        fetcher: F,
        options: FetchOptions,
    ) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        Self {
            key: key.into(),
            tier,
            fetcher,
            ttl: options.ttl,
            enabled: AtomicBool::new(options.enabled),
            state,
        }
    }

    // == Load ==
    /// Publishes the cached value if there is one, otherwise fetches.
    ///
    /// Does nothing while the binding is disabled.
    pub async fn load(&self) {
        if !self.is_enabled() {
            return;
        }

        match self.tier.get::<T>(&self.key) {
            Some(cached) => self.state.send_modify(|state| {
                state.data = Some(cached);
                state.loading = false;
                state.error = None;
            }),
            None => self.fetch().await,
        }
    }

    // == Refetch ==
    /// Runs the fetcher without consulting the tier and stores the result.
    pub async fn refetch(&self) {
        self.fetch().await;
    }

    // == Invalidate ==
    /// Deletes the key from the tier, then refetches.
    pub async fn invalidate(&self) {
        self.tier.delete(&self.key);
        self.fetch().await;
    }

    // == Enabled ==
    /// Enables or disables the binding. Enabling a disabled binding loads it.
    pub async fn set_enabled(&self, enabled: bool) {
        let was_enabled = self.enabled.swap(enabled, Ordering::SeqCst);
        if enabled && !was_enabled {
            self.load().await;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    // == State ==
    /// Snapshot of the current state.
    pub fn state(&self) -> FetchState<T> {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.state.subscribe()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn fetch(&self) {
        self.state.send_modify(|state| state.loading = true);

        match (self.fetcher)().await {
            Ok(value) => {
                self.tier.set(&self.key, &value, self.ttl);
                self.state.send_modify(|state| {
                    state.data = Some(value);
                    state.loading = false;
                    state.error = None;
                });
                debug!(key = %self.key, tier = %self.tier.name(), "fetched and cached");
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "fetch failed");
                self.state.send_modify(|state| {
                    state.loading = false;
                    state.error = Some(Arc::new(err));
                });
            }
        }
    }
}

impl<T, F> fmt::Debug for CacheBinding<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBinding")
            .field("key", &self.key)
            .field("tier", &self.tier.name())
            .field("ttl", &self.ttl)
            .field("enabled", &self.enabled.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Config;
    use crate::persistent::SessionStorage;
    use anyhow::anyhow;
    use std::sync::atomic::AtomicUsize;
    use tokio_test::{assert_err, assert_ok};

    fn manager() -> CacheManager {
        CacheManager::with_storage(
            &Config::default(),
            Arc::new(SessionStorage::new()),
            Arc::new(SessionStorage::new()),
            Arc::new(ManualClock::new(1_700_000_000_000)),
        )
    }

    fn counting_fetcher(
        calls: &Arc<AtomicUsize>,
        value: &'static str,
    ) -> impl Fn() -> std::future::Ready<anyhow::Result<String>> {
        let calls = calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(value.to_string()))
        }
    }

    #[tokio::test]
    async fn test_get_or_fetch_populates_then_hits() {
        let manager = manager();
        let tier = manager.tier(TierName::Memory);
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(&calls, "fresh");

        let first: String = assert_ok!(get_or_fetch(tier.as_ref(), "k", &fetcher, None).await);
        let second: String = assert_ok!(get_or_fetch(tier.as_ref(), "k", &fetcher, None).await);

        assert_eq!(first, "fresh");
        assert_eq!(second, "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_fetch_error_caches_nothing() {
        let manager = manager();
        let tier = manager.tier(TierName::Session);

        let result = get_or_fetch(tier.as_ref(), "k", || async { Err::<String, _>(anyhow!("offline")) }, None).await;

        let err = assert_err!(result);
        assert_eq!(err.to_string(), "offline");
        assert!(!tier.has("k"));
    }

    #[tokio::test]
    async fn test_load_fetches_on_miss() {
        let manager = manager();
        let calls = Arc::new(AtomicUsize::new(0));
        let binding = CacheBinding::new(
            &manager,
            "user",
            counting_fetcher(&calls, "alice"),
            FetchOptions::default(),
        );

        binding.load().await;

        let state = binding.state();
        assert_eq!(state.data.as_deref(), Some("alice"));
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(manager.memory().get::<String>("user").as_deref(), Some("alice"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_prefers_cached_value() {
        let manager = manager();
        manager.local().set("user", &"cached", None);
        let calls = Arc::new(AtomicUsize::new(0));
        let binding = CacheBinding::new(
            &manager,
            "user",
            counting_fetcher(&calls, "fetched"),
            FetchOptions {
                tier: TierName::Local,
                ..FetchOptions::default()
            },
        );
        let receiver = binding.subscribe();

        binding.load().await;

        assert_eq!(receiver.borrow().data.as_deref(), Some("cached"));
        assert!(!receiver.borrow().loading);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refetch_bypasses_cache() {
        let manager = manager();
        manager.memory().set("user", &"stale", None);
        let calls = Arc::new(AtomicUsize::new(0));
        let binding = CacheBinding::new(
            &manager,
            "user",
            counting_fetcher(&calls, "fresh"),
            FetchOptions::default(),
        );

        binding.refetch().await;

        assert_eq!(binding.state().data.as_deref(), Some("fresh"));
        assert_eq!(manager.memory().get::<String>("user").as_deref(), Some("fresh"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_deletes_then_refetches() {
        let manager = manager();
        manager.memory().set("user", &"stale", None);
        let binding = CacheBinding::new(
            &manager,
            "user",
            || async { Err::<String, _>(anyhow!("offline")) },
            FetchOptions::default(),
        );

        binding.invalidate().await;

        assert!(!manager.memory().has("user"));
        let state = binding.state();
        assert!(state.data.is_none());
        assert_eq!(state.error.map(|err| err.to_string()).as_deref(), Some("offline"));
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_data() {
        let manager = manager();
        let fail = Arc::new(AtomicBool::new(false));
        let toggle = fail.clone();
        let binding = CacheBinding::new(
            &manager,
            "report",
            move || {
                let fail = toggle.load(Ordering::SeqCst);
                async move {
                    if fail {
                        Err(anyhow!("timeout"))
                    } else {
                        Ok(42u32)
                    }
                }
            },
            FetchOptions::default(),
        );

        binding.load().await;
        fail.store(true, Ordering::SeqCst);
        binding.refetch().await;

        let state = binding.state();
        assert_eq!(state.data, Some(42));
        assert!(state.error.is_some());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_disabled_binding_loads_when_enabled() {
        let manager = manager();
        let calls = Arc::new(AtomicUsize::new(0));
        let binding = CacheBinding::new(
            &manager,
            "user",
            counting_fetcher(&calls, "alice"),
            FetchOptions {
                enabled: false,
                ..FetchOptions::default()
            },
        );

        binding.load().await;
        assert!(binding.state().data.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        binding.set_enabled(true).await;
        assert_eq!(binding.state().data.as_deref(), Some("alice"));

        // already enabled, no second load
        binding.set_enabled(true).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_subscriber_sees_changes() {
        let manager = manager();
        let calls = Arc::new(AtomicUsize::new(0));
        let binding = CacheBinding::new(
            &manager,
            "user",
            counting_fetcher(&calls, "alice"),
            FetchOptions::default(),
        );
        let mut receiver = binding.subscribe();
        assert!(!receiver.has_changed().unwrap());

        binding.load().await;

        assert!(receiver.has_changed().unwrap());
        assert_eq!(receiver.borrow_and_update().data.as_deref(), Some("alice"));
    }
}
