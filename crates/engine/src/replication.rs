//! Read/write separation: the primary's replication log, replica pull-
//! sync, and read-preference/consistency-level resolution (§4.9).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use vgdb_core::change::{ChangeOp, EntityKind};
use vgdb_core::ConsistencyLevel;

/// One entry in the primary's replication log: enough to apply the same
/// mutation on a replica without re-deriving it from the change log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationEntry {
    pub sequence: u64,
    pub entity_kind: EntityKind,
    pub id: String,
    pub version: u64,
    pub op: ChangeOp,
    pub payload: Vec<u8>,
    pub timestamp: u64,
}

/// `{operations[], lastSequence, primaryVersion}`, owned by the shard's
/// primary (§4.9). `primary_version` is the primary's election term —
/// replicas use it to notice a primary handover and re-synchronize from
/// the new primary's log rather than assuming continuity.
pub struct ReplicationLog {
    primary_version: u64,
    entries: RwLock<Vec<ReplicationEntry>>,
    last_sequence: AtomicU64,
}

impl ReplicationLog {
    pub fn new(primary_version: u64) -> Self {
        Self { primary_version, entries: RwLock::new(Vec::new()), last_sequence: AtomicU64::new(0) }
    }

    pub fn primary_version(&self) -> u64 {
        self.primary_version
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::Relaxed)
    }

    /// Append one local mutation with a monotonically increasing
    /// sequence number, for fan-out to replicas.
    pub fn append(&self, entity_kind: EntityKind, id: String, version: u64, op: ChangeOp, payload: Vec<u8>, now: u64) -> u64 {
        let sequence = self.last_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        self.entries.write().push(ReplicationEntry { sequence, entity_kind, id, version, op, payload, timestamp: now });
        sequence
    }

    /// `getUpdates(fromSequence)`: every entry with `sequence > from_sequence`,
    /// in ascending order.
    pub fn get_updates(&self, from_sequence: u64) -> Vec<ReplicationEntry> {
        self.entries.read().iter().filter(|e| e.sequence > from_sequence).cloned().collect()
    }
}

/// A replica's local pull-sync state: the last sequence it has
/// successfully applied, and the per-entity versions it has observed —
/// the idempotency key an out-of-order or duplicated delivery is
/// checked against (§4.9).
#[derive(Default)]
pub struct ReplicaSync {
    applied_versions: RwLock<BTreeMap<String, u64>>,
    observed_sequence: AtomicU64,
}

impl ReplicaSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observed_sequence(&self) -> u64 {
        self.observed_sequence.load(Ordering::Relaxed)
    }

    /// Apply `entries` idempotently keyed by `(id, version)`: an entry
    /// whose version is at or below the locally observed version for
    /// that id is discarded. Returns how many entries were actually
    /// applied.
    pub fn apply(&self, entries: &[ReplicationEntry]) -> usize {
        let mut versions = self.applied_versions.write();
        let mut applied = 0;
        for entry in entries {
            let current = versions.get(&entry.id).copied().unwrap_or(0);
            if entry.version <= current {
                continue;
            }
            versions.insert(entry.id.clone(), entry.version);
            self.observed_sequence.fetch_max(entry.sequence, Ordering::Relaxed);
            applied += 1;
        }
        applied
    }
}

/// `primary | replica | nearest` (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadPreference {
    Primary,
    Replica,
    Nearest,
}

/// Whether a read at `consistency` may be served from a replica whose
/// replication lag is `replication_lag_us`, given `max_staleness_us`
/// (only consulted for `ConsistencyLevel::Bounded`).
pub fn may_serve_from_replica(consistency: ConsistencyLevel, replication_lag_us: u64, max_staleness_us: u64) -> bool {
    match consistency {
        ConsistencyLevel::Strong => false,
        ConsistencyLevel::Eventual => true,
        ConsistencyLevel::Bounded => replication_lag_us <= max_staleness_us,
    }
}
