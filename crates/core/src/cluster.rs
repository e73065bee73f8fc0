//! Cluster config and node info (§3).

use crate::enums::InstanceRole;
use crate::ids::{NodeId, ShardId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A node's consensus role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusRole {
    Candidate,
    Follower,
    Leader,
}

/// Capacity advertised by a node for shard-balancing decisions (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeCapacity {
    /// Logical CPU count.
    pub cpu: u32,
    /// Available memory, megabytes.
    pub memory_mb: u64,
}

/// Per-node operational statistics, reported on the `/health` endpoint
/// and used by the leader's balancing heuristic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStats {
    pub nouns: u64,
    pub verbs: u64,
    pub queries: u64,
    pub latency_ms: f64,
}

/// `{id, endpoint, hostname, started, lastSeen, role, shards[], capacity,
/// stats}` (§3 "Node info").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: NodeId,
    pub endpoint: String,
    pub hostname: String,
    /// Microseconds since epoch.
    pub started: u64,
    /// Microseconds since epoch, refreshed by any valid heartbeat/message.
    pub last_seen: u64,
    pub role: ConsensusRole,
    pub instance_role: InstanceRole,
    pub shards: Vec<ShardId>,
    pub capacity: NodeCapacity,
    pub stats: NodeStats,
}

impl NodeInfo {
    /// A node is "alive" iff `now − lastSeen < nodeTimeout` (§3).
    pub fn is_alive(&self, now: u64, node_timeout_us: u64) -> bool {
        now.saturating_sub(self.last_seen) < node_timeout_us
    }
}

/// `shardId -> [primary, ...replicas]` (§3 "Cluster config").
pub type ShardAssignments = BTreeMap<ShardId, Vec<NodeId>>;

/// Cluster-wide shard layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardLayout {
    pub count: u32,
    pub assignments: ShardAssignments,
}

/// Free-form cluster-wide settings (replication factor, node timeout,
/// etc.) kept as a small typed struct rather than an open map, so every
/// setting consulted by the engine is visible at the type level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSettings {
    pub replication_factor: u32,
    pub node_timeout_us: u64,
    pub election_timeout_min_us: u64,
    pub election_timeout_max_us: u64,
    pub heartbeat_interval_us: u64,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            replication_factor: 1,
            node_timeout_us: 30_000_000,
            election_timeout_min_us: 150_000,
            election_timeout_max_us: 300_000,
            heartbeat_interval_us: 30_000,
        }
    }
}

/// `{version, updated, leader, nodes, shards, settings}` — the single
/// JSON document in shared storage that is the cluster's source of truth
/// (§3 "Cluster config").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Monotonically increasing; any mutation increments this (§8
    /// quantified invariant).
    pub version: u64,
    /// Microseconds since epoch of the last mutation.
    pub updated: u64,
    pub leader: Option<NodeId>,
    pub nodes: BTreeMap<NodeId, NodeInfo>,
    pub shards: ShardLayout,
    pub settings: ClusterSettings,
}

impl ClusterConfig {
    /// A brand-new single-node cluster, written by the first node to
    /// observe an absent `_cluster/config.json` (§4.5 "Storage-based
    /// discovery (bootstrap)").
    pub fn bootstrap(self_node: NodeInfo, shard_count: u32, now: u64) -> Self {
        let mut nodes = BTreeMap::new();
        let leader = Some(self_node.id.clone());
        nodes.insert(self_node.id.clone(), self_node);
        Self {
            version: 1,
            updated: now,
            leader,
            nodes,
            shards: ShardLayout {
                count: shard_count,
                assignments: BTreeMap::new(),
            },
            settings: ClusterSettings::default(),
        }
    }

    /// Apply a mutation through `f`, bumping `version` and `updated`.
    ///
    /// Every caller that wants to change the config must go through this
    /// so the §8 invariant `new.version = old.version + 1` cannot be
    /// violated by a stray direct field write.
    pub fn mutate(&mut self, now: u64, f: impl FnOnce(&mut Self)) {
        f(self);
        self.version += 1;
        self.updated = now.max(self.updated);
    }
}
