//! Change event: the append-only record that is the single source of
//! truth for cross-node synchronisation (§3, §4.2).

use serde::{Deserialize, Serialize};

/// The kind of entity a change event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// A noun.
    Noun,
    /// A verb.
    Verb,
}

/// The operation a change event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeOp {
    Add,
    Update,
    Delete,
    Restore,
    Relate,
    Unrelate,
}

/// A single append-only change-log record.
///
/// `seq` is strictly increasing per writer (§3 invariant, §8 quantified
/// invariant "For all change-log sequences observed by a replica, `seq`
/// is strictly increasing per writer; applying events by `seq` is
/// idempotent").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Monotonic sequence number, strictly increasing per writer.
    pub seq: u64,
    /// The mutation this event records.
    pub op: ChangeOp,
    /// Whether `id` names a noun or a verb.
    pub entity_kind: EntityKind,
    /// The id of the affected entity, as its string form (noun/verb ids
    /// are UUIDs; kept as a string here so the change log does not need
    /// to depend on the noun/verb crate split).
    pub id: String,
    /// The entity's version after this change (optimistic-concurrency
    /// counter, distinct from `seq`: `version` is per-entity, `seq` is
    /// per-writer-stream).
    pub version: u64,
    /// Microseconds since epoch.
    pub timestamp: u64,
}

impl ChangeEvent {
    /// Construct a new change event.
    pub fn new(
        seq: u64,
        op: ChangeOp,
        entity_kind: EntityKind,
        id: String,
        version: u64,
        timestamp: u64,
    ) -> Self {
        Self {
            seq,
            op,
            entity_kind,
            id,
            version,
            timestamp,
        }
    }
}

/// Per-writer strictly-increasing sequence allocator.
///
/// A thin wrapper rather than a bare `AtomicU64` so the "strictly
/// increasing" invariant has one obvious owner: a single counter per
/// writer's change stream.
#[derive(Debug, Default)]
pub struct SeqAllocator {
    next: std::sync::atomic::AtomicU64,
}

impl SeqAllocator {
    /// Start a new allocator, with `next_seq` as the first value it will
    /// hand out (typically `recovered_max_seq + 1`).
    pub fn starting_at(next_seq: u64) -> Self {
        Self {
            next: std::sync::atomic::AtomicU64::new(next_seq),
        }
    }

    /// Allocate the next sequence number.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_allocator_strictly_increases() {
        let alloc = SeqAllocator::starting_at(5);
        let a = alloc.next();
        let b = alloc.next();
        let c = alloc.next();
        assert_eq!((a, b, c), (5, 6, 7));
    }
}
