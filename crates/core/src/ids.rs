//! Identity types: NounId, VerbId, ShardId, NodeId.
//!
//! Newtype-wrapped rather than passing raw `Uuid`/`String` around the
//! crate boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of a noun (vectorized entity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NounId(Uuid);

impl NounId {
    /// Create a new random noun id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a noun id from its string representation.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Raw bytes, used by the shard hash function.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for NounId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NounId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of a verb (typed directed edge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VerbId(Uuid);

impl VerbId {
    /// Create a new random verb id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a verb id from its string representation.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for VerbId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VerbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical shard identity, e.g. `shard-003`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardId(pub u32);

impl ShardId {
    /// `hash(id) mod shardCount` — the pure function fixing a noun's shard
    /// for the lifetime of the cluster (§3 Shard invariant).
    pub fn of_noun(id: &NounId, shard_count: u32) -> Self {
        Self(fnv1a64(id.as_bytes()) as u32 % shard_count.max(1))
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shard-{:03}", self.0)
    }
}

/// FNV-1a 64-bit hash, deterministic across processes and versions (§8
/// round-trip law: `getPartition(id)` must be stable across processes).
pub(crate) fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Identity of a cluster node (also used as the service/writer tag).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_of_noun_is_stable() {
        let id = NounId::new();
        let a = ShardId::of_noun(&id, 16);
        let b = ShardId::of_noun(&id, 16);
        assert_eq!(a, b);
    }

    #[test]
    fn shard_of_noun_bounded_by_count() {
        for _ in 0..100 {
            let id = NounId::new();
            let shard = ShardId::of_noun(&id, 8);
            assert!(shard.0 < 8);
        }
    }

    #[test]
    fn noun_id_round_trips_through_string() {
        let id = NounId::new();
        let parsed = NounId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }
}
