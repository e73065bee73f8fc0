//! Storage status snapshot (§4.2 `getStorageStatus`).

use serde::{Deserialize, Serialize};
use vgdb_core::ShardId;

/// Point-in-time counters surfaced by `getStorageStatus` and `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StorageStatus {
    pub shard: ShardId,
    pub noun_count: u64,
    pub tombstoned_nouns: u64,
    pub verb_count: u64,
    pub tombstoned_verbs: u64,
    pub hnsw_size: u64,
    pub last_seq: u64,
}
