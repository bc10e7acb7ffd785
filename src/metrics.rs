//! Multi-Tier Cache Metrics
//!
//! Lock-free counters updated on the hot path and a BTreeMap snapshot for
//! reporting. BTreeMap keeps metric keys in a deterministic order, which
//! keeps printed and exported output stable between runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for anything that can report its metrics as name/value pairs.
pub trait CacheMetrics {
    /// Returns all metrics in deterministic key order.
    fn metrics(&self) -> BTreeMap<String, f64>;
}

/// Counters for one [`MultiTierCache`](crate::MultiTierCache).
#[derive(Debug)]
pub struct TierMetrics {
    tier_hits: Box<[AtomicU64]>,
    backing_hits: AtomicU64,
    misses: AtomicU64,
    promotions: AtomicU64,
    sets: AtomicU64,
}

impl TierMetrics {
    /// Creates zeroed counters for `tiers` upper tiers.
    pub fn new(tiers: usize) -> Self {
        Self {
            tier_hits: (0..tiers).map(|_| AtomicU64::new(0)).collect(),
            backing_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            promotions: AtomicU64::new(0),
            sets: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_tier_hit(&self, tier: usize) {
        if let Some(counter) = self.tier_hits.get(tier) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn record_backing_hit(&self) {
        self.backing_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_promotion(&self) {
        self.promotions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    /// Hits served by upper tier `tier`.
    pub fn tier_hits(&self, tier: usize) -> u64 {
        self.tier_hits
            .get(tier)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Hits served by the terminal tier.
    pub fn backing_hits(&self) -> u64 {
        self.backing_hits.load(Ordering::Relaxed)
    }

    /// Lookups that found nothing in any tier.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Values copied into an upper tier after a lower-tier hit.
    pub fn promotions(&self) -> u64 {
        self.promotions.load(Ordering::Relaxed)
    }

    /// Successful writes.
    pub fn sets(&self) -> u64 {
        self.sets.load(Ordering::Relaxed)
    }

    /// Total lookups (hits in any tier plus misses).
    pub fn requests(&self) -> u64 {
        let upper: u64 = (0..self.tier_hits.len()).map(|t| self.tier_hits(t)).sum();
        upper + self.backing_hits() + self.misses()
    }

    /// Hit rate between 0.0 and 1.0, or 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let requests = self.requests();
        if requests > 0 {
            (requests - self.misses()) as f64 / requests as f64
        } else {
            0.0
        }
    }

    /// Snapshot keyed by metric name, tier counters prefixed with the tier name.
    pub fn to_btreemap<'a>(&self, tier_names: impl Iterator<Item = &'a str>) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        for (idx, name) in tier_names.enumerate() {
            metrics.insert(format!("tier.{name}.hits"), self.tier_hits(idx) as f64);
        }
        metrics.insert("backing_hits".to_string(), self.backing_hits() as f64);
        metrics.insert("misses".to_string(), self.misses() as f64);
        metrics.insert("promotions".to_string(), self.promotions() as f64);
        metrics.insert("requests".to_string(), self.requests() as f64);
        metrics.insert("sets".to_string(), self.sets() as f64);
        metrics.insert("hit_rate".to_string(), self.hit_rate());

        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_metrics_have_zero_hit_rate() {
        let metrics = TierMetrics::new(2);
        assert_eq!(metrics.requests(), 0);
        assert_eq!(metrics.hit_rate(), 0.0);
    }

    #[test]
    fn test_counters_and_snapshot() {
        let metrics = TierMetrics::new(2);
        metrics.record_tier_hit(0);
        metrics.record_tier_hit(1);
        metrics.record_backing_hit();
        metrics.record_miss();
        metrics.record_promotion();
        metrics.record_set();
        // out of range tiers are ignored
        metrics.record_tier_hit(7);

        assert_eq!(metrics.requests(), 4);
        assert!((metrics.hit_rate() - 0.75).abs() < f64::EPSILON);

        let snapshot = metrics.to_btreemap(["l1", "l2"].into_iter());
        assert_eq!(snapshot["tier.l1.hits"], 1.0);
        assert_eq!(snapshot["tier.l2.hits"], 1.0);
        assert_eq!(snapshot["backing_hits"], 1.0);
        assert_eq!(snapshot["misses"], 1.0);
        assert_eq!(snapshot["promotions"], 1.0);
        assert_eq!(snapshot["sets"], 1.0);
    }
}
