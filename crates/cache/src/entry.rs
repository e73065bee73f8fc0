//! Versioned cache entries.

/// A cached value tagged with the version it was read at, so a stale
/// write racing a cache fill can be detected by the caller (§4.3
/// "versioned entries").
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub version: u64,
    /// Microseconds since epoch this entry was written into the cache.
    pub cached_at: u64,
    /// Access count since insertion, used by the hot tier's frequency
    /// boost on top of plain recency.
    pub hits: u64,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, version: u64, cached_at: u64) -> Self {
        Self { value, version, cached_at, hits: 0 }
    }
}
