//! A small thread-safe multi-tier cache.
//!
//! Values live in an ordered stack of tiers: one or more bounded in-memory
//! tiers in front of a terminal backing tier. Writes go through to the
//! backing tier; reads probe the tiers fastest first and promote values
//! upward once a key is accessed often enough.
//!
//! ## Quick Reference
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Cache`] | The `set`/`get` contract callers program against |
//! | [`CacheLayer`] | The contract each tier implements |
//! | [`MemoryLayer`] | Segmented, LRU-evicting in-memory tier |
//! | [`DirectoryLayer`] | One-file-per-key persistent tier |
//! | [`MultiTierCache`] | Tier composition with frequency-gated promotion |
//!
//! ## Example
//!
//! ```rust
//! use tiered_cache::config::{DirectoryLayerConfig, MemoryLayerConfig};
//! use tiered_cache::{Cache, DirectoryLayer, MemoryLayer, MultiTierCache};
//! use core::num::NonZeroUsize;
//!
//! let dir = std::env::temp_dir().join("tiered_cache_doc_example");
//! let backing = DirectoryLayer::open(DirectoryLayerConfig::new("disk", &dir)).unwrap();
//! let l1 = MemoryLayer::init(MemoryLayerConfig::new("l1", NonZeroUsize::new(100).unwrap()));
//! let l2 = MemoryLayer::init(MemoryLayerConfig::new("l2", NonZeroUsize::new(10_000).unwrap()));
//!
//! let cache = MultiTierCache::with_thresholds(
//!     vec![Box::new(l1), Box::new(l2)],
//!     Box::new(backing),
//!     vec![5, 2],
//! )
//! .unwrap();
//!
//! cache.set("user:42", "alice").unwrap();
//! assert_eq!(cache.get("user:42").unwrap().as_deref(), Some("alice"));
//! # let _ = std::fs::remove_dir_all(&dir);
//! ```
//!
//! ## Concurrency
//!
//! Every type here is `Send + Sync`; share a cache by reference across
//! scoped threads or wrap it in an `Arc`.

pub mod config;
pub mod directory;
pub mod error;
pub mod layer;
pub mod memory;
pub mod metrics;
pub mod multi_tier;

pub use directory::DirectoryLayer;
pub use error::{CacheError, Result};
pub use layer::CacheLayer;
pub use memory::MemoryLayer;
pub use metrics::{CacheMetrics, TierMetrics};
pub use multi_tier::MultiTierCache;

/// The key/value contract a cache offers to its callers.
///
/// `get` returns `Ok(None)` on a miss; an error means the lookup itself
/// failed. Implementations must tolerate concurrent callers.
pub trait Cache: Send + Sync {
    /// Stores `value` under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Looks `key` up.
    fn get(&self, key: &str) -> Result<Option<String>>;
}

impl<C: Cache + ?Sized> Cache for std::sync::Arc<C> {
    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }
}
