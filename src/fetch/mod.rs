//! Fetch Module
//!
//! Helpers that sit between callers and the tiers: a memoizing wrapper for
//! async functions and a cache-or-fetch binding with observable state.

mod binding;
mod memoize;

pub use binding::{get_or_fetch, CacheBinding, FetchOptions, FetchState};
pub use memoize::{memoize, Memoized};
