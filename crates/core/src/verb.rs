//! Verb: a typed directed edge between two nouns (§3).

use crate::enums::VerbType;
use crate::ids::NodeId;
use crate::value::Metadata;
use crate::{NounId, VerbId};
use serde::{Deserialize, Serialize};

/// A verb: typed directed edge, optionally vectorized, jointly owned by
/// its endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verb {
    /// Stable identity.
    pub id: VerbId,
    /// Source noun id.
    pub source: NounId,
    /// Target noun id.
    pub target: NounId,
    /// Closed-enum type tag.
    pub verb_type: VerbType,
    /// Optional embedded vector, used for verb-similarity search.
    pub vector: Option<Vec<f32>>,
    /// Edge weight in `[0,1]`.
    pub weight: f32,
    /// Confidence in `[0,1]`.
    pub confidence: f32,
    /// Arbitrary metadata record.
    pub metadata: Metadata,
    /// Which writer produced this verb.
    pub service: NodeId,
    /// Creation timestamp, microseconds since epoch.
    pub created_at: u64,
    /// Last-mutation timestamp, microseconds since epoch.
    pub updated_at: u64,
    /// Soft-delete marker.
    pub tombstone: Option<u64>,
    /// Set when either endpoint has been deleted; the verb is kept but
    /// excluded from traversal until pruned at cleanup (§3, Open Question
    /// resolution recorded in DESIGN.md: dangling verbs are neither
    /// auto-deleted nor auto-restored when an endpoint is restored — the
    /// flag is recomputed from current noun state at traversal time).
    pub dangling: bool,
}

impl Verb {
    /// Construct a new verb at `now`. Caller is responsible for enforcing
    /// the "source/target exist or autoCreateMissingNouns" invariant
    /// (§3) before calling this — it belongs to the engine's write path,
    /// not the data type.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: NounId,
        target: NounId,
        verb_type: VerbType,
        vector: Option<Vec<f32>>,
        weight: f32,
        confidence: f32,
        metadata: Metadata,
        service: NodeId,
        now: u64,
    ) -> Result<Self, crate::Error> {
        if !(0.0..=1.0).contains(&weight) {
            return Err(crate::Error::InvalidArgument(format!(
                "verb weight {weight} out of range [0,1]"
            )));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(crate::Error::InvalidArgument(format!(
                "verb confidence {confidence} out of range [0,1]"
            )));
        }
        Ok(Self {
            id: VerbId::new(),
            source,
            target,
            verb_type,
            vector,
            weight,
            confidence,
            metadata,
            service,
            created_at: now,
            updated_at: now,
            tombstone: None,
            dangling: false,
        })
    }

    /// Whether this verb is currently tombstoned.
    pub fn is_tombstoned(&self) -> bool {
        self.tombstone.is_some()
    }

    /// Apply `delete`. Returns whether it transitioned from alive to
    /// tombstoned.
    pub fn mark_deleted(&mut self, at: u64) -> bool {
        if self.tombstone.is_some() {
            return false;
        }
        self.tombstone = Some(at);
        true
    }

    /// Physical-removal eligibility, same discipline as `Noun`.
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
    fn construction_rejects_out_of_range_weight() {
        let err = Verb::new(
            NounId::new(),
            NounId::new(),
            VerbType::RelatedTo,
            None,
            1.5,
            0.5,
            Metadata::new(),
            svc(),
            0,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
    }

    #[test]
    fn construction_rejects_out_of_range_confidence() {
        let err = Verb::new(
            NounId::new(),
            NounId::new(),
            VerbType::RelatedTo,
            None,
            0.5,
            -0.1,
            Metadata::new(),
            svc(),
            0,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
    }

    #[test]
    fn delete_is_idempotent() {
        let mut v = Verb::new(
            NounId::new(),
            NounId::new(),
            VerbType::RelatedTo,
            None,
            0.5,
            0.9,
            Metadata::new(),
            svc(),
            0,
        )
        .unwrap();
        assert!(v.mark_deleted(10));
        assert!(!v.mark_deleted(20));
    }
}
