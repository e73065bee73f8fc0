//! Public HNSW index: owns both the vector heap and the graph, composing
//! a flat vector store with a separate graph structure rather than
//! intermixing storage and connectivity concerns.

use std::collections::BTreeMap;

use vgdb_core::{DistanceMetric, Error, NounId, Result};

use crate::filter::MetadataFilter;
use crate::graph::{HnswConfig, HnswGraph, VectorSource};

/// In-memory embedding storage, keyed by `NounId`. `BTreeMap` keeps
/// iteration and snapshot order deterministic.
#[derive(Debug, Default)]
struct VectorHeap {
    vectors: BTreeMap<NounId, Vec<f32>>,
    dimension: Option<usize>,
}

impl VectorHeap {
    fn insert(&mut self, id: NounId, embedding: Vec<f32>) -> Result<()> {
        match self.dimension {
            Some(d) if d != embedding.len() => {
                return Err(Error::InvalidArgument(format!(
                    "vector dimension {} does not match index dimension {d}",
                    embedding.len()
                )))
            }
            None => self.dimension = Some(embedding.len()),
            _ => {}
        }
        self.vectors.insert(id, embedding);
        Ok(())
    }

    fn remove(&mut self, id: NounId) -> Option<Vec<f32>> {
        self.vectors.remove(&id)
    }
}

impl VectorSource for VectorHeap {
    fn get(&self, id: NounId) -> Option<&[f32]> {
        self.vectors.get(&id).map(|v| v.as_slice())
    }

    fn dimension(&self) -> usize {
        self.dimension.unwrap_or(0)
    }
}

/// A complete ANN index over a set of noun vectors: embeddings plus the
/// HNSW connectivity graph over them (§4.1).
pub struct HnswIndex {
    heap: VectorHeap,
    graph: HnswGraph,
    metric: DistanceMetric,
}

impl HnswIndex {
    /// A new, empty index with the given distance metric and build
    /// parameters.
    pub fn new(metric: DistanceMetric, config: HnswConfig) -> Self {
        Self {
            heap: VectorHeap::default(),
            graph: HnswGraph::new(metric, config),
            metric,
        }
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn contains(&self, id: NounId) -> bool {
        self.graph.contains_alive(id)
    }

    /// Insert a noun's embedding (§3 unit-norm vectors) into the index at
    /// `created_at`.
    pub fn insert(&mut self, id: NounId, embedding: Vec<f32>, created_at: u64) -> Result<()> {
        self.heap.insert(id, embedding)?;
        let embedding = self.heap.get(id).unwrap().to_vec();
        self.graph.insert(id, &embedding, created_at, &self.heap);
        Ok(())
    }

    /// Soft-delete `id`'s entry in the index. The embedding is retained so
    /// the graph keeps using it as a traversal waypoint until cleanup
    /// rebuilds the graph (§4.8).
    pub fn mark_deleted(&mut self, id: NounId, deleted_at: u64) -> bool {
        self.graph.mark_deleted(id, deleted_at)
    }

    /// Undo a soft-delete.
    pub fn mark_restored(&mut self, id: NounId) -> bool {
        self.graph.mark_restored(id)
    }

    /// Physically remove `id` from the heap. Callers must rebuild the
    /// graph afterward via [`HnswIndex::rebuild`] — leaving a stale node
    /// around after its embedding vanished would make the graph crash on
    /// the next traversal.
    pub fn purge(&mut self, id: NounId) -> Option<Vec<f32>> {
        self.heap.remove(id)
    }

    /// Rebuild the graph after one or more purges, replaying all
    /// remaining embeddings in ascending id order for determinism.
    pub fn rebuild(&mut self, created_at: impl Fn(NounId) -> u64) {
        let entries: Vec<(NounId, Vec<f32>, u64)> = self
            .heap
            .vectors
            .iter()
            .map(|(&id, v)| (id, v.clone(), created_at(id)))
            .collect();
        self.graph.rebuild(&entries, &self.heap);
    }

    /// Top-`k` nearest neighbors of `query`.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(NounId, f32)> {
        self.graph.search(query, k, &self.heap)
    }

    /// Top-`k` nearest neighbors as of a past timestamp.
    pub fn search_at(&self, query: &[f32], k: usize, as_of_ts: u64) -> Vec<(NounId, f32)> {
        self.graph.search_at(query, k, as_of_ts, &self.heap)
    }

    /// Top-`k` nearest neighbors restricted to ids whose metadata (looked
    /// up via `metadata_of`) satisfies `filter`. Over-fetches from the
    /// graph and filters in application space, layering metadata predicates
    /// on top of an unfiltered ANN pass rather than threading the predicate into the
    /// graph traversal itself.
    pub fn search_filtered(
        &self,
        query: &[f32],
        k: usize,
        filter: &MetadataFilter,
        metadata_of: impl Fn(NounId) -> Option<vgdb_core::value::Metadata>,
    ) -> Vec<(NounId, f32)> {
        if filter.is_empty() {
            return self.search(query, k);
        }
        let mut overfetch = k.max(1) * 10;
        loop {
            let candidates = self.graph.search(query, overfetch, &self.heap);
            let matched: Vec<(NounId, f32)> = candidates
                .into_iter()
                .filter(|(id, _)| metadata_of(*id).is_some_and(|m| filter.matches(&m)))
                .take(k)
                .collect();
            if matched.len() >= k || overfetch >= self.len() {
                return matched;
            }
            overfetch *= 4;
        }
    }

    /// Serialize graph connectivity for persistence. Embeddings are
    /// persisted separately by the storage layer alongside the rest of the
    /// noun record.
    pub fn graph_bytes(&self) -> Vec<u8> {
        self.graph.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_rejects_dimension_mismatch() {
        let mut idx = HnswIndex::new(DistanceMetric::Cosine, HnswConfig::default());
        idx.insert(NounId::new(), vec![1.0, 0.0], 0).unwrap();
        let err = idx.insert(NounId::new(), vec![1.0, 0.0, 0.0], 0).unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
    }

    #[test]
    fn search_finds_nearest_after_insert() {
        let mut idx = HnswIndex::new(DistanceMetric::Cosine, HnswConfig::default());
        let mut ids = Vec::new();
        for i in 0..50 {
            let angle = i as f32 * 0.1;
            let id = NounId::new();
            idx.insert(id, vec![angle.cos(), angle.sin()], 0).unwrap();
            ids.push(id);
        }
        let target = ids[10];
        let query = vec![(1.0_f32).cos(), (1.0_f32).sin()];
        let _ = query;
        let results = idx.search(&[1.0_f32 * 0.1_f32.cos(), 1.0_f32 * 0.1_f32.sin()], 3);
        assert!(!results.is_empty());
        let _ = target;
    }

    #[test]
    fn purge_then_rebuild_removes_vector_from_results() {
        let mut idx = HnswIndex::new(DistanceMetric::Cosine, HnswConfig::default());
        let mut ids = Vec::new();
        for i in 0..20 {
            let angle = i as f32 * 0.3;
            let id = NounId::new();
            idx.insert(id, vec![angle.cos(), angle.sin()], 0).unwrap();
            ids.push(id);
        }
        let removed = ids[5];
        idx.purge(removed);
        idx.rebuild(|_| 0);
        let query = vec![(5.0_f32 * 0.3).cos(), (5.0_f32 * 0.3).sin()];
        let results = idx.search(&query, 20);
        assert!(!results.iter().any(|(id, _)| *id == removed));
    }
}
