//! Migration identity and phase state (§4.6).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use vgdb_core::{NodeId, ShardId};

/// Identifies one migration attempt for a single shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MigrationId(pub Uuid);

impl MigrationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MigrationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four phases a migration passes through, plus its terminal states.
/// Concurrent writes are forwarded to both primaries while in
/// `Transferring` or `Validating`; routing flips atomically only on
/// `Switching` (§4.6 "Concurrent writes during migration").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationPhase {
    Pending,
    Transferring,
    Validating,
    Switching,
    Completed,
    Failed,
}

impl MigrationPhase {
    /// Whether writes to the shard must be dual-forwarded to the new
    /// primary in this phase.
    pub fn forwards_writes(&self) -> bool {
        matches!(self, MigrationPhase::Transferring | MigrationPhase::Validating)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MigrationPhase::Completed | MigrationPhase::Failed)
    }
}

/// Per-batch transfer progress, reported by the source as it streams
/// items (§4.6 step 2, "Progress reported per batch").
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferProgress {
    pub nouns_sent: u64,
    pub verbs_sent: u64,
    pub batches_sent: u64,
}

/// Full state of one migration attempt, persisted so a restarted leader
/// can resume tracking it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub id: MigrationId,
    pub shard: ShardId,
    pub from_node: NodeId,
    pub to_node: NodeId,
    pub phase: MigrationPhase,
    pub progress: TransferProgress,
    pub expected_count: Option<u64>,
    pub error: Option<String>,
    pub started: u64,
    /// Set once the switch commits; physical deletion on `from_node` is
    /// scheduled for `switched_at + deleteDelay` (§4.6 step 4).
    pub switched_at: Option<u64>,
    pub retries: u32,
}

impl MigrationRecord {
    pub fn propose(shard: ShardId, from_node: NodeId, to_node: NodeId, now: u64) -> Self {
        Self {
            id: MigrationId::new(),
            shard,
            from_node,
            to_node,
            phase: MigrationPhase::Pending,
            progress: TransferProgress::default(),
            expected_count: None,
            error: None,
            started: now,
            switched_at: None,
            retries: 0,
        }
    }

    /// Whether `from_node` should delete its local copy of the shard as
    /// of `now`, given `delete_delay_us` from `MigrationSettings`.
    pub fn ready_for_local_deletion(&self, now: u64, delete_delay_us: u64) -> bool {
        matches!(
            (self.phase, self.switched_at),
            (MigrationPhase::Completed, Some(at)) if now.saturating_sub(at) >= delete_delay_us
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transferring_and_validating_forward_writes_others_do_not() {
        assert!(MigrationPhase::Transferring.forwards_writes());
        assert!(MigrationPhase::Validating.forwards_writes());
        assert!(!MigrationPhase::Pending.forwards_writes());
        assert!(!MigrationPhase::Switching.forwards_writes());
        assert!(!MigrationPhase::Completed.forwards_writes());
    }

    #[test]
    fn deletion_waits_for_delay_after_switch() {
        let mut record = MigrationRecord::propose(ShardId(1), NodeId("a".into()), NodeId("b".into()), 0);
        record.phase = MigrationPhase::Completed;
        record.switched_at = Some(1_000);
        assert!(!record.ready_for_local_deletion(1_500, 1_000));
        assert!(record.ready_for_local_deletion(2_000, 1_000));
    }
}
