//! The triple-fusion query planner itself (§4.7).
//!
//! `QueryPlanner` is a stateless orchestrator holding borrowed data
//! sources: it owns no noun/verb/vector state, only the
//! seams (`VectorSearch`, [`crate::graph::GraphSource`],
//! [`MetadataSource`]) the engine crate wires up to the live store.

use tracing::debug;
use vgdb_core::enums::OperationalMode;
use vgdb_core::value::Metadata;
use vgdb_core::{Error, NounId, Result};

use crate::cursor::Cursor;
use crate::graph::{traverse, GraphSource};
use crate::mode::resolve_mode;
use crate::predicate::Predicate;
use crate::query::{LikeClause, Query, QueryMode};
use crate::scorer::{fuse, CandidateSignals, FusionWeights, ScoredCandidate};

/// Vector-mode search seam: embed-and-search or search-by-vector
/// directly, returning `(id, similarity)` pairs already sorted by
/// similarity descending.
pub trait VectorSearch {
    fn search_text(&self, text: &str, k: usize) -> Result<Vec<(NounId, f32)>>;
    fn search_vector(&self, vector: &[f32], k: usize) -> Result<Vec<(NounId, f32)>>;
}

/// Metadata-mode and predicate-postfilter seam.
pub trait MetadataSource {
    fn all_ids(&self) -> Vec<NounId>;
    fn metadata_of(&self, id: NounId) -> Option<Metadata>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanResult {
    pub hits: Vec<ScoredCandidate>,
    pub next_cursor: Option<String>,
    pub mode_used: QueryMode,
}

pub struct QueryPlanner<'a> {
    pub vectors: &'a dyn VectorSearch,
    pub graph: &'a dyn GraphSource,
    pub metadata: &'a dyn MetadataSource,
    pub max_depth_ceiling: u32,
    pub weights: FusionWeights,
}

impl<'a> QueryPlanner<'a> {
    /// Run `query` under `mode`, enforcing the write/read/frozen guards
    /// at the public boundary (§4.7 "Write-only / read-only guards").
    pub fn execute(&self, query: &Query, operational_mode: OperationalMode) -> Result<PlanResult> {
        let is_direct_id_lookup = query.connected.is_none() && query.like.is_none();
        let search_allowed = operational_mode.allows_search()
            || (operational_mode == OperationalMode::WriteOnly
                && query.allow_direct_reads.unwrap_or(false)
                && is_direct_id_lookup);
        if !search_allowed {
            return Err(Error::ModeViolation(
                "search refused: instance is write-only and this is not a direct-id lookup with allowDirectReads".to_string(),
            ));
        }

        let mode = resolve_mode(query);
        debug!(?mode, "resolved query mode");
        let limit = query.effective_limit();
        let offset = query.effective_offset();
        let fingerprint = query.fingerprint();
        let cursor = query
            .cursor
            .as_deref()
            .map(|c| Cursor::decode(c, fingerprint))
            .transpose()?;

        let candidates = match mode {
            QueryMode::Vector => self.run_vector(query, limit + offset)?,
            QueryMode::Metadata => self.run_metadata(query),
            QueryMode::Graph => self.run_graph(query),
            QueryMode::Fusion => self.run_fusion(query, limit + offset)?,
            QueryMode::Auto => unreachable!("resolve_mode never returns Auto"),
        };

        let mut scored = fuse(candidates, mode, self.weights);
        if let Some(cursor) = cursor {
            scored.retain(|c| !cursor.should_skip(c.score, c.id));
        }

        let truncated = scored.len() > offset + limit;
        let page: Vec<ScoredCandidate> = scored.into_iter().skip(offset).take(limit).collect();
        let next_cursor = if truncated {
            page.last().map(|last| {
                Cursor { last_score: last.score, last_id: last.id, mode_fingerprint: fingerprint }.encode()
            })
        } else {
            None
        };

        Ok(PlanResult { hits: page, next_cursor, mode_used: mode })
    }

    fn run_vector(&self, query: &Query, k: usize) -> Result<Vec<(NounId, CandidateSignals)>> {
        let Some(like) = &query.like else { return Ok(Vec::new()) };
        let hits = match like {
            LikeClause::Text(text) => self.vectors.search_text(text, k)?,
            LikeClause::Vector(vector) => self.vectors.search_vector(vector, k)?,
        };
        let predicate = query.r#where.clone();
        Ok(hits
            .into_iter()
            .filter(|(id, _)| match &predicate {
                Some(p) => self.metadata.metadata_of(*id).is_some_and(|m| p.matches(&m)),
                None => true,
            })
            .map(|(id, similarity)| {
                (id, CandidateSignals { vector_similarity: Some(similarity), ..Default::default() })
            })
            .collect())
    }

    fn run_metadata(&self, query: &Query) -> Vec<(NounId, CandidateSignals)> {
        let Some(predicate) = &query.r#where else { return Vec::new() };
        self.matching_ids(predicate)
            .into_iter()
            .map(|id| (id, CandidateSignals { metadata_match: Some(true), ..Default::default() }))
            .collect()
    }

    fn run_graph(&self, query: &Query) -> Vec<(NounId, CandidateSignals)> {
        let Some(clause) = &query.connected else { return Vec::new() };
        traverse(self.graph, clause, query.max_depth.unwrap_or(self.max_depth_ceiling).min(self.max_depth_ceiling))
            .into_iter()
            .map(|(id, distance)| (id, CandidateSignals { graph_distance: Some(distance), ..Default::default() }))
            .collect()
    }

    fn run_fusion(&self, query: &Query, k: usize) -> Result<Vec<(NounId, CandidateSignals)>> {
        use std::collections::BTreeMap;
        let mut merged: BTreeMap<NounId, CandidateSignals> = BTreeMap::new();

        if query.like.is_some() {
            for (id, signals) in self.run_vector(query, k)? {
                merged.entry(id).or_default().vector_similarity = signals.vector_similarity;
            }
        }
        if query.r#where.is_some() {
            for (id, signals) in self.run_metadata(query) {
                merged.entry(id).or_default().metadata_match = signals.metadata_match;
            }
        }
        if query.connected.is_some() {
            for (id, signals) in self.run_graph(query) {
                merged.entry(id).or_default().graph_distance = signals.graph_distance;
            }
        }

        Ok(merged.into_iter().collect())
    }

    fn matching_ids(&self, predicate: &Predicate) -> Vec<NounId> {
        self.metadata
            .all_ids()
            .into_iter()
            .filter(|id| self.metadata.metadata_of(*id).is_some_and(|m| predicate.matches(&m)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ConnectedClause;
    use std::collections::HashMap;
    use vgdb_core::{MetaValue, VerbType};

    struct FakeStore {
        vectors: HashMap<NounId, Vec<f32>>,
        metadata: HashMap<NounId, Metadata>,
        edges: HashMap<NounId, Vec<(VerbType, NounId)>>,
    }

    impl VectorSearch for FakeStore {
        fn search_text(&self, _text: &str, _k: usize) -> Result<Vec<(NounId, f32)>> {
            Ok(Vec::new())
        }
        fn search_vector(&self, query: &[f32], k: usize) -> Result<Vec<(NounId, f32)>> {
            let mut scored: Vec<_> = self
                .vectors
                .iter()
                .map(|(id, v)| {
                    let dot: f32 = v.iter().zip(query).map(|(a, b)| a * b).sum();
                    (*id, dot)
                })
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
            scored.truncate(k);
            Ok(scored)
        }
    }

    impl MetadataSource for FakeStore {
        fn all_ids(&self) -> Vec<NounId> {
            self.metadata.keys().copied().collect()
        }
        fn metadata_of(&self, id: NounId) -> Option<Metadata> {
            self.metadata.get(&id).cloned()
        }
    }

    impl GraphSource for FakeStore {
        fn outgoing(&self, id: NounId) -> Vec<(VerbType, NounId)> {
            self.edges.get(&id).cloned().unwrap_or_default()
        }
        fn incoming(&self, _id: NounId) -> Vec<(VerbType, NounId)> {
            Vec::new()
        }
    }

    fn store_with_one_match() -> (FakeStore, NounId) {
        let id = NounId::new();
        let mut metadata = HashMap::new();
        let mut m = Metadata::new();
        m.insert("status".to_string(), MetaValue::Str("active".into()));
        metadata.insert(id, m);
        (FakeStore { vectors: HashMap::new(), metadata, edges: HashMap::new() }, id)
    }

    #[test]
    fn metadata_mode_finds_matching_noun() {
        let (store, id) = store_with_one_match();
        let planner = QueryPlanner {
            vectors: &store,
            graph: &store,
            metadata: &store,
            max_depth_ceiling: 5,
            weights: FusionWeights::default(),
        };
        let query = Query {
            r#where: Some(Predicate::Eq { field: "status".into(), value: MetaValue::Str("active".into()) }),
            ..Default::default()
        };
        let result = planner.execute(&query, OperationalMode::Hybrid).unwrap();
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].id, id);
    }

    #[test]
    fn write_only_mode_refuses_non_direct_search() {
        let (store, _id) = store_with_one_match();
        let planner = QueryPlanner {
            vectors: &store,
            graph: &store,
            metadata: &store,
            max_depth_ceiling: 5,
            weights: FusionWeights::default(),
        };
        let query = Query {
            r#where: Some(Predicate::Eq { field: "status".into(), value: MetaValue::Str("active".into()) }),
            ..Default::default()
        };
        let result = planner.execute(&query, OperationalMode::WriteOnly);
        assert!(result.is_err());
    }

    #[test]
    fn pagination_truncates_and_emits_cursor() {
        let mut vectors = HashMap::new();
        for _ in 0..5 {
            vectors.insert(NounId::new(), vec![1.0, 0.0]);
        }
        let store = FakeStore { vectors, metadata: HashMap::new(), edges: HashMap::new() };
        let planner = QueryPlanner {
            vectors: &store,
            graph: &store,
            metadata: &store,
            max_depth_ceiling: 5,
            weights: FusionWeights::default(),
        };
        let query = Query { like: Some(LikeClause::Vector(vec![1.0, 0.0])), limit: Some(2), ..Default::default() };
        let result = planner.execute(&query, OperationalMode::Hybrid).unwrap();
        assert_eq!(result.hits.len(), 2);
        assert!(result.next_cursor.is_some());
    }

    #[test]
    fn graph_mode_finds_connected_nouns() {
        let a = NounId::new();
        let b = NounId::new();
        let mut edges = HashMap::new();
        edges.insert(a, vec![(VerbType::RelatedTo, b)]);
        let store = FakeStore { vectors: HashMap::new(), metadata: HashMap::new(), edges };
        let planner = QueryPlanner {
            vectors: &store,
            graph: &store,
            metadata: &store,
            max_depth_ceiling: 5,
            weights: FusionWeights::default(),
        };
        let query = Query {
            connected: Some(ConnectedClause { from: Some(a), to: None, via: None, depth: Some(1) }),
            ..Default::default()
        };
        let result = planner.execute(&query, OperationalMode::Hybrid).unwrap();
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].id, b);
    }
}
