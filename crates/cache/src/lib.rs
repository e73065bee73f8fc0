//! Multi-tier (hot/warm/storage) cache with versioned entries and
//! distributed invalidation (§4.3).

pub mod entry;
pub mod hot;
pub mod invalidation;
pub mod tier;
pub mod warm;

pub use entry::CacheEntry;
pub use hot::HotCache;
pub use invalidation::{InvalidationBus, InvalidationMessage, NullInvalidationBus};
pub use tier::{MultiTierCache, TierStats};
pub use warm::WarmCache;
