//! Noun: a vectorized entity with metadata (§3).

use crate::enums::NounType;
use crate::ids::NodeId;
use crate::value::Metadata;
use crate::NounId;
use serde::{Deserialize, Serialize};

/// Tolerance for the unit-norm invariant: `‖vector‖ = 1 ± ε`.
pub const NORM_EPSILON: f32 = 1e-4;

/// A noun: immutable identity, mutable vector/type/metadata/timestamps,
/// soft-delete tombstone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Noun {
    /// Stable identity, assigned once at `add` and never reused.
    pub id: NounId,
    /// Unit-norm embedding, fixed dimension across the index.
    pub vector: Vec<f32>,
    /// Closed-enum type tag.
    pub noun_type: NounType,
    /// Arbitrary metadata record.
    pub metadata: Metadata,
    /// Which writer produced this noun.
    pub service: NodeId,
    /// Creation timestamp, microseconds since epoch.
    pub created_at: u64,
    /// Last-mutation timestamp, microseconds since epoch.
    pub updated_at: u64,
    /// Soft-delete marker: `Some(deleted_at)` once `delete` has run.
    pub tombstone: Option<u64>,
}

impl Noun {
    /// Construct a new noun at `now`, untombstoned.
    pub fn new(
        vector: Vec<f32>,
        noun_type: NounType,
        metadata: Metadata,
        service: NodeId,
        now: u64,
    ) -> Self {
        Self {
            id: NounId::new(),
            vector,
            noun_type,
            metadata,
            service,
            created_at: now,
            updated_at: now,
            tombstone: None,
        }
    }

    /// Whether the unit-norm invariant holds for `vector` (§3).
    pub fn is_unit_norm(vector: &[f32]) -> bool {
        let norm_sq: f32 = vector.iter().map(|x| x * x).sum();
        let norm = norm_sq.sqrt();
        (norm - 1.0).abs() <= NORM_EPSILON
    }

    /// Normalize `vector` in place to unit length. No-op on an all-zero
    /// vector (callers must reject that case separately — it has no
    /// well-defined direction).
    pub fn normalize(vector: &mut [f32]) {
        let norm_sq: f32 = vector.iter().map(|x| x * x).sum();
        let norm = norm_sq.sqrt();
        if norm > 0.0 {
            for x in vector.iter_mut() {
                *x /= norm;
            }
        }
    }

    /// Whether this noun is currently tombstoned (logically deleted).
    pub fn is_tombstoned(&self) -> bool {
        self.tombstone.is_some()
    }

    /// Apply `delete`: set the tombstone if not already set. Returns
    /// whether the noun transitioned from alive to tombstoned.
    pub fn mark_deleted(&mut self, at: u64) -> bool {
        if self.tombstone.is_some() {
            return false;
        }
        self.tombstone = Some(at);
        true
    }

    /// Apply `restore`: clear the tombstone. `updated_at` is left
    /// unchanged, matching the §8 round-trip law
    /// `delete(x); restore(x)` ⇒ `get(x)` returns the pre-delete record
    /// with `updated_at` unchanged.
    ///
    /// Returns `Err` if the noun was not tombstoned (`InvalidArgument`,
    /// §8 "Restore of non-tombstoned id").
    pub fn mark_restored(&mut self) -> Result<(), crate::Error> {
        if self.tombstone.take().is_none() {
            return Err(crate::Error::InvalidArgument(format!(
                "noun {} is not tombstoned",
                self.id
            )));
        }
        Ok(())
    }

    /// Whether this noun existed (alive or tombstoned) at `as_of_ts`.
    pub fn is_alive_at(&self, as_of_ts: u64) -> bool {
        self.created_at <= as_of_ts && self.tombstone.map_or(true, |d| d > as_of_ts)
    }

    /// Physical-removal eligibility: tombstoned longer than
    /// `max_soft_delete_age_us` (§4.8).
    pub fn eligible_for_cleanup(&self, now: u64, max_soft_delete_age_us: u64) -> bool {
        match self.tombstone {
            Some(deleted_at) => now.saturating_sub(deleted_at) > max_soft_delete_age_us,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Metadata;

    fn svc() -> NodeId {
        NodeId("node-a".into())
    }

    #[test]
    fn normalize_produces_unit_norm() {
        let mut v = vec![3.0, 4.0, 0.0];
        Noun::normalize(&mut v);
        assert!(Noun::is_unit_norm(&v));
    }

    #[test]
    fn delete_then_restore_preserves_updated_at() {
        let mut n = Noun::new(vec![1.0, 0.0], NounType::Concept, Metadata::new(), svc(), 100);
        n.updated_at = 150;
        assert!(n.mark_deleted(200));
        assert!(n.is_tombstoned());
        n.mark_restored().unwrap();
        assert!(!n.is_tombstoned());
        assert_eq!(n.updated_at, 150);
    }

    #[test]
    fn restore_of_non_tombstoned_errors() {
        let mut n = Noun::new(vec![1.0, 0.0], NounType::Concept, Metadata::new(), svc(), 100);
        let err = n.mark_restored().unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
    }

    #[test]
    fn delete_is_idempotent() {
        let mut n = Noun::new(vec![1.0, 0.0], NounType::Concept, Metadata::new(), svc(), 100);
        assert!(n.mark_deleted(200));
        assert!(!n.mark_deleted(300));
        assert_eq!(n.tombstone, Some(200));
    }

    #[test]
    fn eligible_for_cleanup_after_max_age() {
        let mut n = Noun::new(vec![1.0, 0.0], NounType::Concept, Metadata::new(), svc(), 100);
        n.mark_deleted(1_000_000);
        assert!(!n.eligible_for_cleanup(1_000_000 + 500_000, 1_000_000));
        assert!(n.eligible_for_cleanup(1_000_000 + 2_000_000, 1_000_000));
    }
}
