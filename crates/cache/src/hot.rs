//! Hot cache tier: a small bounded, in-process cache with LRU-plus-
//! frequency eviction (§4.3 "Hot tier").
//!
//! Unlike the warm tier's fixed TTL, the hot tier has no expiry — it is
//! bounded purely by size, evicting the entries with the lowest combined
//! recency/frequency score once occupancy crosses
//! `eviction_threshold * capacity`.

use std::collections::HashMap;
use std::hash::Hash;

use crate::entry::CacheEntry;

struct Slot<V> {
    entry: CacheEntry<V>,
    last_access: u64,
}

/// Bounded hot cache tier.
pub struct HotCache<K, V> {
    capacity: usize,
    eviction_threshold: f64,
    map: HashMap<K, Slot<V>>,
    clock: u64,
}

impl<K: Eq + Hash + Clone, V: Clone> HotCache<K, V> {
    pub fn new(capacity: usize, eviction_threshold: f64) -> Self {
        Self { capacity, eviction_threshold, map: HashMap::new(), clock: 0 }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Look up `key`, bumping its recency/frequency score on a hit.
    pub fn get(&mut self, key: &K) -> Option<CacheEntry<V>> {
        let tick = self.tick();
        if let Some(slot) = self.map.get_mut(key) {
            slot.entry.hits += 1;
            slot.last_access = tick;
            Some(slot.entry.clone())
        } else {
            None
        }
    }

    /// Insert or overwrite `key`, evicting if occupancy now exceeds the
    /// configured threshold.
    pub fn put(&mut self, key: K, entry: CacheEntry<V>) {
        let tick = self.tick();
        self.map.insert(key, Slot { entry, last_access: tick });
        if self.map.len() as f64 > (self.capacity as f64) * self.eviction_threshold {
            self.evict_to_capacity();
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<CacheEntry<V>> {
        self.map.remove(key).map(|s| s.entry)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Evict entries with the lowest `(hits, last_access)` score until
    /// occupancy is back at or under `capacity`.
    fn evict_to_capacity(&mut self) {
        if self.map.len() <= self.capacity {
            return;
        }
        let mut scored: Vec<(K, u64, u64)> = self
            .map
            .iter()
            .map(|(k, s)| (k.clone(), s.entry.hits, s.last_access))
            .collect();
        scored.sort_by_key(|(_, hits, last_access)| (*hits, *last_access));

        let excess = self.map.len() - self.capacity;
        for (key, _, _) in scored.into_iter().take(excess) {
            self.map.remove(&key);
        }
    }
}
