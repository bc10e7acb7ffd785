//! Multi-Tier Cache
//!
//! Composes an ordered list of upper tiers (fastest first) over a terminal
//! backing tier.
//!
//! ```text
//!   get(key)                          set(key, value)
//!      │                                   │
//!      ▼                                   ▼
//!  ┌────────┐ hit ──────────────▶ ok   ┌─────────┐
//!  │ tier 0 │                          │ backing │  write-through
//!  └───┬────┘                          └────┬────┘
//!      │ miss                               ▼
//!  ┌───▼────┐ hit ─▶ promote? ──▶ ok   ┌────────┐
//!  │ tier 1 │                          │ tier 0 │  fill
//!  └───┬────┘                          └────┬────┘
//!      │ miss                               ▼
//!  ┌───▼─────┐ hit ─▶ promote? ─▶ ok   tiers 1.. invalidated
//!  │ backing │
//!  └───┬─────┘
//!      ▼ miss ─▶ None
//! ```
//!
//! Every hit bumps the key's access frequency. A value found below tier 0
//! is copied into each tier above it whose promotion threshold the
//! frequency has reached. Without thresholds every lower-tier hit promotes.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::error::{CacheError, Result};
use crate::layer::CacheLayer;
use crate::metrics::{CacheMetrics, TierMetrics};
use crate::Cache;

/// A cache made of several [`CacheLayer`]s over a terminal tier.
///
/// # Example
///
/// ```
/// use tiered_cache::config::MemoryLayerConfig;
/// use tiered_cache::{Cache, CacheLayer, MemoryLayer, MultiTierCache};
/// use core::num::NonZeroUsize;
///
/// let l1 = MemoryLayer::init(MemoryLayerConfig::new("l1", NonZeroUsize::new(10).unwrap()));
/// let backing = MemoryLayer::init(MemoryLayerConfig::new("backing", NonZeroUsize::new(1000).unwrap()));
/// let cache = MultiTierCache::new(vec![Box::new(l1)], Box::new(backing));
///
/// cache.set("key", "value").unwrap();
/// assert_eq!(cache.get("key").unwrap().as_deref(), Some("value"));
/// ```
pub struct MultiTierCache {
    layers: Vec<Box<dyn CacheLayer>>,
    backing: Box<dyn CacheLayer>,
    thresholds: Option<Vec<u64>>,
    frequencies: Mutex<HashMap<String, u64>>,
    metrics: TierMetrics,
}

impl MultiTierCache {
    /// Creates a cache that promotes on every lower-tier hit.
    pub fn new(layers: Vec<Box<dyn CacheLayer>>, backing: Box<dyn CacheLayer>) -> Self {
        let metrics = TierMetrics::new(layers.len());
        Self {
            layers,
            backing,
            thresholds: None,
            frequencies: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    /// Creates a cache with one promotion threshold per upper tier.
    ///
    /// `thresholds[i]` is the access frequency a key must reach before a
    /// value found below tier `i` is copied into it.
    pub fn with_thresholds(
        layers: Vec<Box<dyn CacheLayer>>,
        backing: Box<dyn CacheLayer>,
        thresholds: Vec<u64>,
    ) -> Result<Self> {
        if thresholds.len() != layers.len() {
            return Err(CacheError::Config(format!(
                "expected {} promotion thresholds, got {}",
                layers.len(),
                thresholds.len()
            )));
        }

        let mut cache = Self::new(layers, backing);
        cache.thresholds = Some(thresholds);
        Ok(cache)
    }

    /// Number of upper tiers.
    pub fn tier_count(&self) -> usize {
        self.layers.len()
    }

    /// Upper tier names in probe order.
    pub fn tier_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|layer| layer.name())
    }

    /// The raw counters.
    pub fn tier_metrics(&self) -> &TierMetrics {
        &self.metrics
    }

    /// Entries held by upper tier `tier`, or `None` if out of range.
    pub fn tier_len(&self, tier: usize) -> Option<usize> {
        self.layers.get(tier).map(|layer| layer.len())
    }

    /// Entries held by the backing tier.
    pub fn backing_len(&self) -> usize {
        self.backing.len()
    }

    fn bump_frequency(&self, key: &str) -> u64 {
        let mut frequencies = self.frequencies.lock();
        let count = frequencies.entry_ref(key).or_insert(0);
        *count += 1;
        *count
    }

    fn threshold(&self, tier: usize) -> u64 {
        self.thresholds
            .as_ref()
            .and_then(|t| t.get(tier).copied())
            .unwrap_or(0)
    }

    /// Copies `value` into every tier above `found_at` whose threshold
    /// `frequency` has reached.
    fn promote(&self, key: &str, value: &str, found_at: usize, frequency: u64) -> Result<()> {
        for (tier, layer) in self.layers.iter().enumerate().take(found_at) {
            if frequency >= self.threshold(tier) {
                layer.set(key, value)?;
                self.metrics.record_promotion();
            }
        }
        Ok(())
    }
}

impl Cache for MultiTierCache {
    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.backing.set(key, value)?;

        if let Some((first, rest)) = self.layers.split_first() {
            first.set(key, value)?;
            // lower copies would shadow the new value once tier 0 evicts it
            for layer in rest {
                layer.remove(key)?;
            }
        }

        self.metrics.record_set();
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        for (tier, layer) in self.layers.iter().enumerate() {
            if let Some(value) = layer.get(key)? {
                self.metrics.record_tier_hit(tier);
                let frequency = self.bump_frequency(key);
                if tier > 0 {
                    self.promote(key, &value, tier, frequency)?;
                }
                return Ok(Some(value));
            }
        }

        match self.backing.get(key)? {
            Some(value) => {
                self.metrics.record_backing_hit();
                let frequency = self.bump_frequency(key);
                self.promote(key, &value, self.layers.len(), frequency)?;
                Ok(Some(value))
            }
            None => {
                self.metrics.record_miss();
                Ok(None)
            }
        }
    }
}

impl CacheMetrics for MultiTierCache {
    fn metrics(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.metrics.to_btreemap(self.tier_names());
        for layer in &self.layers {
            metrics.insert(format!("tier.{}.evictions", layer.name()), layer.evictions() as f64);
        }
        metrics.insert(format!("backing.{}.entries", self.backing.name()), self.backing.len() as f64);
        metrics
    }
}

impl core::fmt::Debug for MultiTierCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MultiTierCache")
            .field("tiers", &self.tier_names().collect::<Vec<_>>())
            .field("backing", &self.backing.name())
            .field("thresholds", &self.thresholds)
            .finish()
    }
}
