//! Segmented In-Memory Tier
//!
//! A thread-safe, capacity-bounded tier using lock striping. Keys are
//! partitioned across independent segments, each an LRU map behind its own
//! `parking_lot::Mutex`, so operations on different segments never contend.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        MemoryLayer                           │
//! │                                                              │
//! │  hash(key) % N  ──▶  Segment Selection                       │
//! │                                                              │
//! │  ┌────────────┐ ┌────────────┐     ┌────────────┐            │
//! │  │ Segment 0  │ │ Segment 1  │ ... │ Segment N-1│            │
//! │  │ Mutex<Lru> │ │ Mutex<Lru> │     │ Mutex<Lru> │            │
//! │  └────────────┘ └────────────┘     └────────────┘            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! LRU ordering is per segment, not global. An entry can be evicted from one
//! segment while another segment still holds older entries.
//!
//! `get` takes the segment lock exclusively because an LRU read reorders the
//! recency list, so a `Mutex` is used rather than an `RwLock`.

use core::hash::BuildHasher;
use core::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::DefaultHashBuilder;
use lru::LruCache;
use parking_lot::Mutex;

use crate::config::MemoryLayerConfig;
use crate::error::Result;
use crate::layer::CacheLayer;

/// A segmented, LRU-evicting in-memory tier.
///
/// # Example
///
/// ```
/// use tiered_cache::config::MemoryLayerConfig;
/// use tiered_cache::{CacheLayer, MemoryLayer};
/// use core::num::NonZeroUsize;
///
/// let layer = MemoryLayer::init(MemoryLayerConfig::new("l1", NonZeroUsize::new(100).unwrap()));
/// layer.set("key", "value").unwrap();
/// assert_eq!(layer.get("key").unwrap().as_deref(), Some("value"));
/// ```
pub struct MemoryLayer {
    name: String,
    segments: Box<[Mutex<LruCache<String, String>>]>,
    hash_builder: DefaultHashBuilder,
    evictions: AtomicU64,
}

impl MemoryLayer {
    /// Creates a memory tier from its configuration.
    pub fn init(config: MemoryLayerConfig) -> Self {
        let segment_count = config.segments.max(1);
        let segment_capacity = config.capacity.get() / segment_count;
        let segment_cap = NonZeroUsize::new(segment_capacity.max(1)).unwrap_or(NonZeroUsize::MIN);

        let segments: Vec<_> = (0..segment_count)
            .map(|_| Mutex::new(LruCache::new(segment_cap)))
            .collect();

        Self {
            name: config.name,
            segments: segments.into_boxed_slice(),
            hash_builder: DefaultHashBuilder::default(),
            evictions: AtomicU64::new(0),
        }
    }

    #[inline]
    fn segment_index(&self, key: &str) -> usize {
        (self.hash_builder.hash_one(key) as usize) % self.segments.len()
    }

    /// Returns the total capacity across all segments.
    pub fn capacity(&self) -> usize {
        self.segments.iter().map(|s| s.lock().cap().get()).sum()
    }

    /// Returns the number of segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

impl CacheLayer for MemoryLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let idx = self.segment_index(key);
        let mut segment = self.segments[idx].lock();
        Ok(segment.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let idx = self.segment_index(key);
        let displaced = {
            let mut segment = self.segments[idx].lock();
            segment.push(key.to_owned(), value.to_owned())
        };
        // push() hands back the old pair on replace as well as on eviction
        if matches!(displaced, Some((old_key, _)) if old_key != key) {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let idx = self.segment_index(key);
        let mut segment = self.segments[idx].lock();
        Ok(segment.pop(key).is_some())
    }

    /// Acquires each segment lock in turn, so the count can be slightly
    /// stale under concurrent writes.
    fn len(&self) -> usize {
        self.segments.iter().map(|s| s.lock().len()).sum()
    }

    fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

impl core::fmt::Debug for MemoryLayer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryLayer")
            .field("name", &self.name)
            .field("segments", &self.segments.len())
            .field("evictions", &self.evictions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(capacity: usize, segments: usize) -> MemoryLayer {
        MemoryLayer::init(
            MemoryLayerConfig::new("test", NonZeroUsize::new(capacity).unwrap())
                .with_segments(segments),
        )
    }

    #[test]
    fn test_set_get_remove() {
        let layer = layer(10, 2);
        assert_eq!(layer.get("a").unwrap(), None);

        layer.set("a", "1").unwrap();
        assert_eq!(layer.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(layer.len(), 1);

        layer.set("a", "2").unwrap();
        assert_eq!(layer.get("a").unwrap().as_deref(), Some("2"));
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.evictions(), 0);

        assert!(layer.remove("a").unwrap());
        assert!(!layer.remove("a").unwrap());
        assert!(layer.is_empty());
    }

    #[test]
    fn test_single_segment_evicts_lru() {
        let layer = layer(2, 1);
        layer.set("a", "1").unwrap();
        layer.set("b", "2").unwrap();
        layer.get("a").unwrap();
        layer.set("c", "3").unwrap();

        assert_eq!(layer.get("b").unwrap(), None);
        assert_eq!(layer.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(layer.get("c").unwrap().as_deref(), Some("3"));
        assert_eq!(layer.evictions(), 1);
    }

    #[test]
    fn test_capacity_split_across_segments() {
        let layer = layer(16, 4);
        assert_eq!(layer.segment_count(), 4);
        assert_eq!(layer.capacity(), 16);

        for i in 0..100 {
            layer.set(&format!("key{i}"), "v").unwrap();
        }
        assert!(layer.len() <= 16);
    }

    #[test]
    fn test_small_capacity_keeps_one_slot_per_segment() {
        let layer = layer(2, 8);
        assert_eq!(layer.capacity(), 8);
    }
}
