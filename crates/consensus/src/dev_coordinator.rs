//! "Lowest-id-wins" simplified coordinator (§9 Design Notes, REDESIGN
//! FLAGS).
//!
//! Gated behind `EngineConfig.dev_simple_coordinator`: skips the election
//! protocol in [`crate::election`] entirely and deterministically names
//! the node with the lexicographically smallest [`NodeId`] among the
//! known live nodes as leader. Never the default in a real deployment —
//! it has no term, no heartbeat timeout recovery, and no split-brain
//! protection beyond "everyone reads the same storage blob".

use vgdb_core::cluster::ClusterConfig;
use vgdb_core::NodeId;

/// Recompute the leader for a bootstrap/dev-mode cluster: the smallest id
/// among nodes alive as of `now`. Returns `None` if no node is alive.
pub fn elect_lowest_id(config: &ClusterConfig, now: u64) -> Option<NodeId> {
    config
        .nodes
        .values()
        .filter(|n| n.is_alive(now, config.settings.node_timeout_us))
        .map(|n| n.id.clone())
        .min()
}

/// Apply [`elect_lowest_id`] to `config`, bumping `version`/`updated` only
/// if the leader actually changed.
pub fn refresh_leader(config: &mut ClusterConfig, now: u64) -> bool {
    let next = elect_lowest_id(config, now);
    if next == config.leader {
        return false;
    }
    config.leader = next;
    config.version += 1;
    config.updated = now;
    true
}
