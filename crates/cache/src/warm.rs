//! Warm cache tier: TTL-bounded, evicted purely by expiry rather than
//! size (§4.3 "Warm tier"). A `BTreeMap<expiry, Keys>` lets
//! `sweep_expired` do a single range scan instead of walking every
//! entry.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;

use crate::entry::CacheEntry;

/// Bounded-by-TTL warm cache tier.
pub struct WarmCache<K, V> {
    ttl_us: u64,
    values: HashMap<K, CacheEntry<V>>,
    expiry_index: BTreeMap<u64, HashSet<K>>,
}

impl<K: Eq + Hash + Clone + Ord, V: Clone> WarmCache<K, V> {
    pub fn new(ttl_us: u64) -> Self {
        Self { ttl_us, values: HashMap::new(), expiry_index: BTreeMap::new() }
    }

    fn expiry_of(&self, cached_at: u64) -> u64 {
        cached_at + self.ttl_us
    }

    pub fn put(&mut self, key: K, entry: CacheEntry<V>) {
        let expiry = self.expiry_of(entry.cached_at);
        if let Some(old) = self.values.remove(&key) {
            self.remove_from_index(&key, self.expiry_of(old.cached_at));
        }
        self.expiry_index.entry(expiry).or_default().insert(key.clone());
        self.values.insert(key, entry);
    }

    /// Look up `key`, returning `None` (and dropping the stale entry) if
    /// it has expired as of `now`.
    pub fn get(&mut self, key: &K, now: u64) -> Option<CacheEntry<V>> {
        let entry = self.values.get(key)?;
        if self.expiry_of(entry.cached_at) <= now {
            self.remove(key);
            return None;
        }
        Some(entry.clone())
    }

    pub fn remove(&mut self, key: &K) -> Option<CacheEntry<V>> {
        let entry = self.values.remove(key)?;
        self.remove_from_index(key, self.expiry_of(entry.cached_at));
        Some(entry)
    }

    fn remove_from_index(&mut self, key: &K, expiry: u64) {
        if let Some(keys) = self.expiry_index.get_mut(&expiry) {
            keys.remove(key);
            if keys.is_empty() {
                self.expiry_index.remove(&expiry);
            }
        }
    }

    /// Evict every entry expired as of `now`. Returns the number removed.
    pub fn sweep_expired(&mut self, now: u64) -> usize {
        let expired_buckets: Vec<u64> = self.expiry_index.range(..=now).map(|(ts, _)| *ts).collect();
        let mut removed = 0;
        for ts in expired_buckets {
            if let Some(keys) = self.expiry_index.remove(&ts) {
                for key in keys {
                    self.values.remove(&key);
                    removed += 1;
                }
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_value_before_expiry() {
        let mut cache: WarmCache<String, i32> = WarmCache::new(1000);
        cache.put("a".into(), CacheEntry::new(1, 1, 0));
        assert_eq!(cache.get(&"a".to_string(), 500).unwrap().value, 1);
    }

    #[test]
    fn get_evicts_expired_entry() {
        let mut cache: WarmCache<String, i32> = WarmCache::new(1000);
        cache.put("a".into(), CacheEntry::new(1, 1, 0));
        assert!(cache.get(&"a".to_string(), 1500).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn sweep_expired_removes_all_past_entries() {
        let mut cache: WarmCache<u32, u32> = WarmCache::new(100);
        for i in 0..5 {
            cache.put(i, CacheEntry::new(i, 1, i as u64 * 10));
        }
        let removed = cache.sweep_expired(120);
        assert_eq!(removed, 5);
        assert!(cache.is_empty());
    }
}
