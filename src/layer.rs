//! The tier contract shared by every storage layer.

use crate::error::Result;

/// One storage tier inside a [`MultiTierCache`](crate::MultiTierCache).
///
/// Implementations must be safe to call from many threads at once; the
/// multi-tier cache never wraps a tier in its own lock.
pub trait CacheLayer: Send + Sync {
    /// Short name used in metrics keys and error messages.
    fn name(&self) -> &str;

    /// Returns the stored value, or `None` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Returns `true` if a value was present.
    fn remove(&self, key: &str) -> Result<bool>;

    /// Number of entries currently held by the tier.
    fn len(&self) -> usize;

    /// Entries dropped to make room since the tier was created. Tiers
    /// without a capacity bound never evict.
    fn evictions(&self) -> u64 {
        0
    }

    /// Returns `true` if the tier holds nothing.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
