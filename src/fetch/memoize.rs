//! Memoization Wrapper
//!
//! Wraps an async function so repeated calls with equivalent arguments are
//! answered from a tier.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::tier::{CacheTier, CacheTierExt};

/// An async function whose results are cached under a key derived from its
/// arguments.
pub struct Memoized<F, K> {
    func: F,
    key_fn: K,
    ttl: Option<Duration>,
    tier: Arc<dyn CacheTier>,
}

/// Wraps `func` so its results are cached in `tier`.
///
/// # Arguments
/// * `func` - The async function to wrap
/// * `key_fn` - Derives the cache key from the call arguments
/// * `ttl` - Lifetime of cached results (tier default if None)
/// * `tier` - Where results are stored
///
/// # Example
/// ```ignore
/// let lookup = memoize(
///     |id: u32| async move { load_document(id).await },
///     |id: &u32| format!("doc:{id}"),
///     Some(Duration::from_secs(60)),
///     manager.tier(TierName::Multilayer),
/// );
/// let doc = lookup.call(7).await?;
/// ```
pub fn memoize<F, K>(
    func: F,
    key_fn: K,
    ttl: Option<Duration>,
    tier: Arc<dyn CacheTier>,
) -> Memoized<F, K> {
    Memoized {
        func,
        key_fn,
        ttl,
        tier,
    }
}

impl<F, K> Memoized<F, K> {
    /// Calls the wrapped function, or returns the cached result for the key
    /// `args` map to.
    ///
    /// A miss writes the tier exactly once; a hit writes nothing. An `Err`
    /// from the wrapped function is returned unchanged and not cached.
    pub async fn call<A, Fut, T, E>(&self, args: A) -> Result<T, E>
    where
        K: Fn(&A) -> String,
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize + DeserializeOwned,
    {
        let key = (self.key_fn)(&args);
        if let Some(cached) = self.tier.get::<T>(&key) {
            debug!(key = %key, tier = %self.tier.name(), "memoized call served from cache");
            return Ok(cached);
        }

        let value = (self.func)(args).await?;
        self.tier.set(&key, &value, self.ttl);
        Ok(value)
    }

    pub fn tier(&self) -> &Arc<dyn CacheTier> {
        &self.tier
    }
}

impl<F, K> fmt::Debug for Memoized<F, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("ttl", &self.ttl)
            .field("tier", &self.tier.name())
            .finish_non_exhaustive()
    }
}
