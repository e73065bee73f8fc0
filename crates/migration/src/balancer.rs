//! Leader-only shard rebalancing (§3 "Shard assignment").
//!
//! On node join or departure the leader computes a balanced target
//! assignment — at most `ceil(shardCount / activeNodes)` shards per node,
//! respecting `replicationFactor` — and proposes a migration for each
//! shard whose primary changed. This module only computes the *target*;
//! actually carrying out a migration is [`crate::protocol::MigrationDriver`]'s
//! job.

use std::collections::BTreeMap;
use vgdb_core::{NodeId, ShardAssignments, ShardId};

/// Compute a balanced `shardId -> [primary, replicas...]` assignment
/// across `active_nodes`, round-robin by shard index so the distribution
/// stays stable (and close to unchanged) across small membership deltas.
pub fn balanced_assignment(
    shard_count: u32,
    active_nodes: &[NodeId],
    replication_factor: u32,
) -> ShardAssignments {
    let mut assignments = BTreeMap::new();
    if active_nodes.is_empty() {
        return assignments;
    }
    let replicas = (replication_factor as usize).min(active_nodes.len()).max(1);
    for shard_index in 0..shard_count {
        let mut holders = Vec::with_capacity(replicas);
        for r in 0..replicas {
            let node_index = (shard_index as usize + r) % active_nodes.len();
            holders.push(active_nodes[node_index].clone());
        }
        assignments.insert(ShardId(shard_index), holders);
    }
    assignments
}

/// Diff the current assignment against a freshly computed target,
/// returning `(shard, from, to)` triples for every shard whose primary
/// changed. Shards whose primary is unchanged are skipped even if a
/// replica position moved — only primary changes trigger a migration.
pub fn primary_changes(
    current: &ShardAssignments,
    target: &ShardAssignments,
) -> Vec<(ShardId, NodeId, NodeId)> {
    let mut changes = Vec::new();
    for (shard, target_holders) in target {
        let Some(to_node) = target_holders.first() else { continue };
        match current.get(shard).and_then(|h| h.first()) {
            Some(from_node) if from_node != to_node => {
                changes.push((*shard, from_node.clone(), to_node.clone()));
            }
            None => {
                // Newly introduced shard: nothing to migrate away from.
            }
            _ => {}
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_assignment_covers_every_shard() {
        let nodes = vec![NodeId("a".into()), NodeId("b".into()), NodeId("c".into())];
        let assignment = balanced_assignment(6, &nodes, 1);
        assert_eq!(assignment.len(), 6);
        for holders in assignment.values() {
            assert_eq!(holders.len(), 1);
        }
    }

    #[test]
    fn replication_factor_is_capped_by_active_node_count() {
        let nodes = vec![NodeId("a".into()), NodeId("b".into())];
        let assignment = balanced_assignment(2, &nodes, 5);
        for holders in assignment.values() {
            assert_eq!(holders.len(), 2);
        }
    }

    #[test]
    fn primary_changes_detects_moved_shards_only() {
        let mut current = BTreeMap::new();
        current.insert(ShardId(0), vec![NodeId("a".into())]);
        current.insert(ShardId(1), vec![NodeId("b".into())]);

        let mut target = BTreeMap::new();
        target.insert(ShardId(0), vec![NodeId("a".into())]);
        target.insert(ShardId(1), vec![NodeId("c".into())]);

        let changes = primary_changes(&current, &target);
        assert_eq!(changes, vec![(ShardId(1), NodeId("b".into()), NodeId("c".into()))]);
    }
}
