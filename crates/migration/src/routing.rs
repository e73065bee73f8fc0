//! Write-forwarding and read-routing during an in-flight migration
//! (§4.6 "Concurrent writes during migration").

use std::collections::BTreeMap;
use vgdb_core::{NodeId, ShardId};

use crate::state::{MigrationPhase, MigrationRecord};

/// Where a shard's reads and writes should currently go.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardRoute {
    pub reads_from: NodeId,
    /// Writes go to `writes_to[0]` and are mirrored to the rest, if any
    /// (dual-write during transfer/validate).
    pub writes_to: Vec<NodeId>,
}

/// Tracks in-flight migrations per shard and answers routing queries.
/// Once a migration reaches `Switching` or beyond, routing flips to the
/// destination atomically; there is no intermediate state where reads
/// are split across both nodes.
#[derive(Debug, Default)]
pub struct RoutingTable {
    active: BTreeMap<ShardId, MigrationRecord>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self { active: BTreeMap::new() }
    }

    pub fn track(&mut self, record: MigrationRecord) {
        self.active.insert(record.shard, record);
    }

    pub fn update(&mut self, record: MigrationRecord) {
        if record.phase.is_terminal() {
            self.active.remove(&record.shard);
        } else {
            self.active.insert(record.shard, record);
        }
    }

    /// Resolve where reads/writes for `shard` should go, given its
    /// steady-state primary (no migration in flight).
    pub fn route(&self, shard: ShardId, steady_state_primary: &NodeId) -> ShardRoute {
        match self.active.get(&shard) {
            None => ShardRoute {
                reads_from: steady_state_primary.clone(),
                writes_to: vec![steady_state_primary.clone()],
            },
            Some(record) => match record.phase {
                MigrationPhase::Pending => ShardRoute {
                    reads_from: record.from_node.clone(),
                    writes_to: vec![record.from_node.clone()],
                },
                MigrationPhase::Transferring | MigrationPhase::Validating => ShardRoute {
                    reads_from: record.from_node.clone(),
                    writes_to: vec![record.from_node.clone(), record.to_node.clone()],
                },
                MigrationPhase::Switching | MigrationPhase::Completed => ShardRoute {
                    reads_from: record.to_node.clone(),
                    writes_to: vec![record.to_node.clone()],
                },
                MigrationPhase::Failed => ShardRoute {
                    reads_from: record.from_node.clone(),
                    writes_to: vec![record.from_node.clone()],
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_active_migration_routes_to_steady_state_primary() {
        let table = RoutingTable::new();
        let route = table.route(ShardId(1), &NodeId("a".into()));
        assert_eq!(route.reads_from, NodeId("a".into()));
        assert_eq!(route.writes_to, vec![NodeId("a".into())]);
    }

    #[test]
    fn transferring_dual_writes_but_reads_stay_on_source() {
        let mut table = RoutingTable::new();
        let mut record = MigrationRecord::propose(ShardId(1), NodeId("a".into()), NodeId("b".into()), 0);
        record.phase = MigrationPhase::Transferring;
        table.track(record);

        let route = table.route(ShardId(1), &NodeId("a".into()));
        assert_eq!(route.reads_from, NodeId("a".into()));
        assert_eq!(route.writes_to, vec![NodeId("a".into()), NodeId("b".into())]);
    }

    #[test]
    fn switching_flips_routing_atomically_to_destination() {
        let mut table = RoutingTable::new();
        let mut record = MigrationRecord::propose(ShardId(1), NodeId("a".into()), NodeId("b".into()), 0);
        record.phase = MigrationPhase::Switching;
        table.track(record);

        let route = table.route(ShardId(1), &NodeId("a".into()));
        assert_eq!(route.reads_from, NodeId("b".into()));
        assert_eq!(route.writes_to, vec![NodeId("b".into())]);
    }

    #[test]
    fn completed_migration_is_untracked_and_falls_back_to_primary() {
        let mut table = RoutingTable::new();
        let mut record = MigrationRecord::propose(ShardId(1), NodeId("a".into()), NodeId("b".into()), 0);
        record.phase = MigrationPhase::Completed;
        table.update(record);
        assert!(table.active.is_empty());
    }
}
