//! Fusion scoring (§4.7 "Fusion scoring").
//!
//! `score = w_v * s_v + w_m * s_m + w_g * s_g` where `s_v` is vector
//! similarity in `[0,1]`, `s_m` is the predicate match as `{0,1}`, and
//! `s_g` decays with graph distance as `1/(1+d)`. Default weights
//! `(0.6, 0.25, 0.15)`, overrideable per query. Weights apply only in
//! `QueryMode::Fusion`; a single-mode query's score is its own raw
//! signal, unweighted, so a perfect vector match still scores ~1.0.

use vgdb_core::NounId;

use crate::query::QueryMode;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub vector: f32,
    pub metadata: f32,
    pub graph: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self { vector: 0.6, metadata: 0.25, graph: 0.15 }
    }
}

/// Per-candidate signal inputs, `None` when a mode did not surface this
/// candidate at all (treated as `0.0` contribution, not excluded).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CandidateSignals {
    pub vector_similarity: Option<f32>,
    pub metadata_match: Option<bool>,
    pub graph_distance: Option<u32>,
}

impl CandidateSignals {
    fn vector_signal(&self) -> f32 {
        self.vector_similarity.unwrap_or(0.0)
    }

    fn metadata_signal(&self) -> f32 {
        if self.metadata_match.unwrap_or(false) { 1.0 } else { 0.0 }
    }

    fn graph_signal(&self) -> f32 {
        self.graph_distance.map(|d| 1.0 / (1.0 + d as f32)).unwrap_or(0.0)
    }

    /// Weighted combination of all three signals, used only for
    /// `QueryMode::Fusion`.
    pub fn fused_score(&self, weights: FusionWeights) -> f32 {
        weights.vector * self.vector_signal() + weights.metadata * self.metadata_signal() + weights.graph * self.graph_signal()
    }

    /// The raw, unweighted signal for a single-mode query. `mode` must
    /// be a concrete, non-fusion mode.
    pub fn raw_score(&self, mode: QueryMode) -> f32 {
        match mode {
            QueryMode::Vector => self.vector_signal(),
            QueryMode::Metadata => self.metadata_signal(),
            QueryMode::Graph => self.graph_signal(),
            QueryMode::Fusion | QueryMode::Auto => self.fused_score(FusionWeights::default()),
        }
    }
}

/// One scored candidate in the fused ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
    pub id: NounId,
    pub score: f32,
}

/// Merge per-mode candidate signals into a single ranked list, sorted by
/// score descending with lower id as the tiebreak (§4.7). Scores are
/// weighted only when `mode` is `QueryMode::Fusion`; every other mode
/// ranks by its own raw signal.
pub fn fuse(candidates: Vec<(NounId, CandidateSignals)>, mode: QueryMode, weights: FusionWeights) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|(id, signals)| {
            let score = match mode {
                QueryMode::Fusion => signals.fused_score(weights),
                _ => signals.raw_score(mode),
            };
            ScoredCandidate { id, score }
        })
        .collect();
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        let w = FusionWeights::default();
        assert!((w.vector + w.metadata + w.graph - 1.0).abs() < 1e-6);
    }

    #[test]
    fn graph_distance_decays_fused_score() {
        let near = CandidateSignals { graph_distance: Some(0), ..Default::default() };
        let far = CandidateSignals { graph_distance: Some(3), ..Default::default() };
        let weights = FusionWeights::default();
        assert!(near.fused_score(weights) > far.fused_score(weights));
    }

    #[test]
    fn vector_mode_raw_score_ignores_weights() {
        let signals = CandidateSignals { vector_similarity: Some(0.999), ..Default::default() };
        assert_eq!(signals.raw_score(QueryMode::Vector), 0.999);
    }

    #[test]
    fn fusion_mode_raw_score_applies_weights() {
        let signals = CandidateSignals { vector_similarity: Some(1.0), ..Default::default() };
        let weights = FusionWeights::default();
        assert_eq!(signals.raw_score(QueryMode::Fusion), weights.vector);
    }

    #[test]
    fn fuse_sorts_by_score_then_breaks_ties_by_lower_id() {
        let a = NounId::new();
        let b = NounId::new();
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let signals = CandidateSignals { vector_similarity: Some(0.5), ..Default::default() };
        let results = fuse(vec![(hi, signals), (lo, signals)], QueryMode::Vector, FusionWeights::default());
        assert_eq!(results[0].id, lo);
        assert_eq!(results[1].id, hi);
    }

    #[test]
    fn fuse_in_vector_mode_preserves_raw_similarity() {
        let id = NounId::new();
        let signals = CandidateSignals { vector_similarity: Some(0.999), ..Default::default() };
        let results = fuse(vec![(id, signals)], QueryMode::Vector, FusionWeights::default());
        assert!(results[0].score >= 0.999);
    }
}
