//! Storage-based cluster discovery and bootstrap (§4.5 "Storage-based
//! discovery (bootstrap)").
//!
//! There is no gossip or multicast: every node agrees on the cluster by
//! reading and conditionally writing a single blob, `_cluster/config.json`,
//! through the shared [`StorageAdapter`]. The first node to observe it
//! absent bootstraps a brand-new single-node cluster; every other node
//! just reads and joins.

use tracing::{info, warn};
use vgdb_core::cluster::{ClusterConfig, NodeInfo};
use vgdb_core::{Error, Result};
use vgdb_storage::StorageAdapter;

const CLUSTER_CONFIG_KEY: &str = "_cluster/config.json";

/// Load the current cluster config, or bootstrap one if none exists yet.
pub fn load_or_bootstrap(
    storage: &dyn StorageAdapter,
    self_node: NodeInfo,
    shard_count: u32,
    now: u64,
) -> Result<ClusterConfig> {
    match storage.get_blob(CLUSTER_CONFIG_KEY)? {
        Some(bytes) => {
            let config: ClusterConfig = serde_json::from_slice(&bytes)
                .map_err(|e| Error::StorageFailure(format!("cluster config decode: {e}")))?;
            info!(nodes = config.nodes.len(), "joined existing cluster");
            Ok(config)
        }
        None => {
            let config = ClusterConfig::bootstrap(self_node.clone(), shard_count, now);
            write_config(storage, &config)?;
            info!(node = %self_node.id, "bootstrapped new cluster");
            Ok(config)
        }
    }
}

/// Persist `config` back to shared storage. Callers are expected to have
/// bumped `config.version`/`config.updated` before calling this; there is
/// no compare-and-swap at the storage layer, so the leader alone should
/// perform writes in normal operation.
pub fn write_config(storage: &dyn StorageAdapter, config: &ClusterConfig) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(config).map_err(|e| Error::StorageFailure(format!("cluster config decode: {e}")))?;
    storage.put_blob(CLUSTER_CONFIG_KEY, &bytes)
}

/// Merge `self_node` into `config`, refreshing its `last_seen` and bumping
/// the config version. Returns `false` (no change) if nothing but the
/// timestamp moved and the caller may skip the write.
pub fn upsert_node(config: &mut ClusterConfig, self_node: NodeInfo, now: u64) -> bool {
    let changed = match config.nodes.get(&self_node.id) {
        Some(existing) => existing.endpoint != self_node.endpoint || existing.role != self_node.role,
        None => true,
    };
    config.nodes.insert(self_node.id.clone(), self_node);
    config.updated = now;
    if changed {
        config.version += 1;
    }
    changed
}

/// Drop nodes whose `last_seen` has exceeded `node_timeout_us`. Returns the
/// ids removed.
pub fn reap_dead_nodes(config: &mut ClusterConfig, now: u64) -> Vec<vgdb_core::NodeId> {
    let timeout = config.settings.node_timeout_us;
    let dead: Vec<_> = config
        .nodes
        .values()
        .filter(|n| !n.is_alive(now, timeout))
        .map(|n| n.id.clone())
        .collect();
    for id in &dead {
        warn!(node = %id, "reaping dead node from cluster config");
        config.nodes.remove(id);
    }
    if !dead.is_empty() {
        config.version += 1;
        config.updated = now;
    }
    dead
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgdb_core::cluster::{NodeCapacity, NodeStats};
    use vgdb_core::{ConsensusRole, InstanceRole, NodeId};
    use vgdb_storage::MemoryAdapter;

    fn node(id: &str, now: u64) -> NodeInfo {
        NodeInfo {
            id: NodeId(id.to_string()),
            endpoint: format!("http://{id}:8080"),
            hostname: id.to_string(),
            started: now,
            last_seen: now,
            role: ConsensusRole::Follower,
            instance_role: InstanceRole::Hybrid,
            shards: Vec::new(),
            capacity: NodeCapacity { cpu: 4, memory_mb: 1024 },
            stats: NodeStats::default(),
        }
    }

    #[test]
    fn first_node_bootstraps_and_second_joins() {
        let storage = MemoryAdapter::new();
        let a = load_or_bootstrap(&storage, node("a", 0), 4, 0).unwrap();
        assert_eq!(a.nodes.len(), 1);
        assert_eq!(a.leader, Some(NodeId("a".into())));

        let b = load_or_bootstrap(&storage, node("b", 10), 4, 10).unwrap();
        assert_eq!(b.version, a.version);
        assert_eq!(b.nodes.len(), 1);
    }

    #[test]
    fn upsert_adds_new_node_and_bumps_version() {
        let mut config = ClusterConfig::bootstrap(node("a", 0), 4, 0);
        let before = config.version;
        let changed = upsert_node(&mut config, node("b", 5), 5);
        assert!(changed);
        assert_eq!(config.version, before + 1);
        assert_eq!(config.nodes.len(), 2);
    }

    #[test]
    fn reap_removes_nodes_past_timeout() {
        let mut config = ClusterConfig::bootstrap(node("a", 0), 4, 0);
        upsert_node(&mut config, node("b", 0), 0);
        let dead = reap_dead_nodes(&mut config, config.settings.node_timeout_us + 100);
        assert_eq!(dead.len(), 2);
        assert!(config.nodes.is_empty());
    }
}
