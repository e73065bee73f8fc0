//! Shard partitioners (§4.4 "Partitioning").
//!
//! The hash partitioner is the default: `shard = hash(id) mod shardCount`,
//! fixed for the lifetime of the cluster. The affinity partitioner lets
//! related nouns (e.g. all nouns created by the same verb-traversal
//! neighborhood) land on the same shard, trading balance for fewer
//! cross-shard graph hops — opt-in per collection.

use vgdb_core::{NounId, ShardId};

/// Assigns a noun to a shard.
pub trait Partitioner: Send + Sync {
    fn shard_for(&self, id: &NounId, shard_count: u32) -> ShardId;
}

/// Default partitioner: `shard = hash(id) mod shardCount` (§3 Shard
/// invariant — stable for the id's lifetime regardless of cluster size
/// changes between reads).
#[derive(Debug, Clone, Copy, Default)]
pub struct HashPartitioner;

impl Partitioner for HashPartitioner {
    fn shard_for(&self, id: &NounId, shard_count: u32) -> ShardId {
        ShardId::of_noun(id, shard_count)
    }
}

/// Affinity partitioner: nouns sharing an affinity key (e.g. a tenant id,
/// or the first noun in a connected subgraph) are hashed by that key
/// instead of by their own id, so they co-locate on one shard.
#[derive(Debug, Clone, Copy, Default)]
pub struct AffinityPartitioner;

impl AffinityPartitioner {
    /// Shard for a group of nouns sharing `affinity_key`.
    pub fn shard_for_key(&self, affinity_key: &NounId, shard_count: u32) -> ShardId {
        ShardId::of_noun(affinity_key, shard_count)
    }
}

impl Partitioner for AffinityPartitioner {
    fn shard_for(&self, id: &NounId, shard_count: u32) -> ShardId {
        // With no affinity group supplied, falls back to the id itself —
        // callers that want co-location must call `shard_for_key`.
        self.shard_for_key(id, shard_count)
    }
}
