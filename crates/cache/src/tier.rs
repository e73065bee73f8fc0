//! The multi-tier cache itself: hot → warm → storage, with versioned
//! entries and distributed invalidation (§4.3).

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use vgdb_core::NodeId;

use crate::entry::CacheEntry;
use crate::hot::HotCache;
use crate::invalidation::{InvalidationBus, InvalidationMessage, NullInvalidationBus};
use crate::warm::WarmCache;

/// Running hit/miss counters used by [`MultiTierCache::auto_tune`].
#[derive(Debug, Default)]
pub struct TierStats {
    pub hot_hits: AtomicU64,
    pub warm_hits: AtomicU64,
    pub misses: AtomicU64,
}

impl TierStats {
    /// Hot-tier hit rate over all lookups observed so far, or `0.0` before
    /// the first lookup.
    pub fn hot_hit_rate(&self) -> f64 {
        let hot = self.hot_hits.load(Ordering::Relaxed) as f64;
        let total = hot
            + self.warm_hits.load(Ordering::Relaxed) as f64
            + self.misses.load(Ordering::Relaxed) as f64;
        if total == 0.0 {
            0.0
        } else {
            hot / total
        }
    }
}

/// Hot → warm → storage cache, the engine's read path in front of the
/// storage adapter (§4.3).
pub struct MultiTierCache<K, V> {
    hot: HotCache<K, V>,
    warm: WarmCache<K, V>,
    bus: Box<dyn InvalidationBus>,
    self_node: NodeId,
    stats: TierStats,
    hot_capacity_floor: usize,
    hot_capacity_ceiling: usize,
}

impl<K: Eq + Hash + Clone + Ord + ToString, V: Clone> MultiTierCache<K, V> {
    pub fn new(hot_capacity: usize, eviction_threshold: f64, warm_ttl_us: u64, self_node: NodeId) -> Self {
        Self {
            hot: HotCache::new(hot_capacity, eviction_threshold),
            warm: WarmCache::new(warm_ttl_us),
            bus: Box::new(NullInvalidationBus),
            self_node,
            stats: TierStats::default(),
            hot_capacity_floor: hot_capacity / 4,
            hot_capacity_ceiling: hot_capacity * 4,
        }
    }

    /// Replace the invalidation transport (defaults to a no-op bus).
    pub fn with_bus(mut self, bus: Box<dyn InvalidationBus>) -> Self {
        self.bus = bus;
        self
    }

    pub fn stats(&self) -> &TierStats {
        &self.stats
    }

    /// Look up `key`. On a hot or warm hit, promotes the entry toward the
    /// hot tier. On a full miss, calls `load_from_storage` and seeds both
    /// tiers with the result.
    pub fn get_or_load(
        &mut self,
        key: &K,
        now: u64,
        load_from_storage: impl FnOnce() -> Option<(V, u64)>,
    ) -> Option<V> {
        if let Some(entry) = self.hot.get(key) {
            self.stats.hot_hits.fetch_add(1, Ordering::Relaxed);
            return Some(entry.value);
        }

        if let Some(entry) = self.warm.get(key, now) {
            self.stats.warm_hits.fetch_add(1, Ordering::Relaxed);
            self.hot.put(key.clone(), entry.clone());
            return Some(entry.value);
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        let (value, version) = load_from_storage()?;
        let entry = CacheEntry::new(value.clone(), version, now);
        self.hot.put(key.clone(), entry.clone());
        self.warm.put(key.clone(), entry);
        Some(value)
    }

    /// Drop `key` from both local tiers and, if `broadcast` is true,
    /// publish an invalidation message so peers drop their copy too.
    pub fn invalidate(&mut self, key: &K, version: u64, now: u64, broadcast: bool) {
        self.hot.remove(key);
        self.warm.remove(key);
        if broadcast {
            self.bus.publish(InvalidationMessage::new(key.to_string(), version, self.self_node.clone(), now));
        }
    }

    /// Apply an invalidation message received from a peer.
    pub fn apply_invalidation(&mut self, key: &K) {
        self.hot.remove(key);
        self.warm.remove(key);
    }

    /// Drop every warm entry expired as of `now`.
    pub fn sweep_expired(&mut self, now: u64) -> usize {
        self.warm.sweep_expired(now)
    }

    /// Recommend (and apply) a new hot-tier capacity from the observed hit
    /// rate: a low hot-hit-rate with many warm promotions suggests the hot
    /// tier is too small; a very high rate with room to spare is left
    /// alone (§4.3 "auto-tune").
    pub fn auto_tune(&mut self, current_capacity: usize) -> usize {
        let rate = self.stats.hot_hit_rate();
        let target = if rate < 0.5 && self.warm.len() > self.hot.len() {
            (current_capacity * 2).min(self.hot_capacity_ceiling)
        } else if rate > 0.95 {
            (current_capacity / 2).max(self.hot_capacity_floor)
        } else {
            current_capacity
        };
        if target != current_capacity {
            self.hot = HotCache::new(target, 0.9);
        }
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit_after_load() {
        let mut cache: MultiTierCache<String, i32> =
            MultiTierCache::new(10, 0.9, 1000, NodeId("n1".into()));
        let loaded = cache.get_or_load(&"a".to_string(), 0, || Some((42, 1)));
        assert_eq!(loaded, Some(42));
        assert_eq!(cache.stats().misses.load(Ordering::Relaxed), 1);

        let hit = cache.get_or_load(&"a".to_string(), 1, || panic!("should not reload"));
        assert_eq!(hit, Some(42));
        assert_eq!(cache.stats().hot_hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn invalidate_forces_reload() {
        let mut cache: MultiTierCache<String, i32> =
            MultiTierCache::new(10, 0.9, 1000, NodeId("n1".into()));
        cache.get_or_load(&"a".to_string(), 0, || Some((1, 1)));
        cache.invalidate(&"a".to_string(), 2, 5, false);
        let reloaded = cache.get_or_load(&"a".to_string(), 5, || Some((2, 2)));
        assert_eq!(reloaded, Some(2));
    }
}
