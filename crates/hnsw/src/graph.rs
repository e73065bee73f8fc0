//! Hierarchical Navigable Small World graph (§4.1).
//!
//! Multi-layer graph with layer 0 holding up to `2*M` connections per node
//! and higher layers up to `M`; greedy descent from the top layer followed
//! by an ef-beam search at the target layer. Node storage and neighbor
//! lists use `BTreeMap`/`BTreeSet` so iteration order — and therefore
//! search results — is deterministic. Level assignment is a fixed-seed
//! splitmix64 PRNG driven by a monotonic counter, so identical insert
//! sequences produce identical graphs.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use serde::{Deserialize, Serialize};
use vgdb_core::{DistanceMetric, NounId};

use crate::distance::compute_similarity;

/// HNSW build/search parameters (§4.1 "Parameters").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Max connections per layer above 0.
    pub m: usize,
    /// Build-time beam width.
    pub ef_construction: usize,
    /// Search-time beam width.
    pub ef_search: usize,
    /// Level multiplier, `1 / ln(m)`.
    pub ml: f64,
}

impl Default for HnswConfig {
    fn default() -> Self {
        let m = 16;
        Self {
            m,
            ef_construction: 200,
            ef_search: 50,
            ml: 1.0 / (m as f64).ln(),
        }
    }
}

impl HnswConfig {
    fn max_connections_layer0(&self) -> usize {
        self.m * 2
    }

    fn max_connections(&self) -> usize {
        self.m
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HnswNode {
    /// `neighbors[layer]` is the set of neighbor ids at that layer.
    neighbors: Vec<BTreeSet<NounId>>,
    max_layer: usize,
    created_at: u64,
    deleted_at: Option<u64>,
}

impl HnswNode {
    fn new(max_layer: usize, created_at: u64) -> Self {
        Self {
            neighbors: (0..=max_layer).map(|_| BTreeSet::new()).collect(),
            max_layer,
            created_at,
            deleted_at: None,
        }
    }

    fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    fn is_alive_at(&self, as_of_ts: u64) -> bool {
        self.created_at <= as_of_ts && self.deleted_at.map_or(true, |d| d > as_of_ts)
    }
}

/// A scored candidate: max-heap natural order (higher score = greater),
/// tie-broken by lower `NounId` winning, so result ordering is
/// deterministic regardless of insertion order.
#[derive(Debug, Clone, PartialEq)]
struct ScoredId {
    score: f32,
    id: NounId,
}

impl Eq for ScoredId {}

impl PartialOrd for ScoredId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Lookup of embeddings by id, supplied externally so the graph does not
/// own vector storage (the engine crate keeps vectors alongside the rest
/// of the noun record).
pub trait VectorSource {
    fn get(&self, id: NounId) -> Option<&[f32]>;
    fn dimension(&self) -> usize;
}

/// The HNSW graph proper — connectivity only, no embedding ownership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswGraph {
    config: HnswConfig,
    metric: DistanceMetric,
    nodes: BTreeMap<NounId, HnswNode>,
    entry_point: Option<NounId>,
    max_level: usize,
    rng_seed: u64,
    rng_counter: u64,
}

impl HnswGraph {
    /// A new, empty graph.
    pub fn new(metric: DistanceMetric, config: HnswConfig) -> Self {
        Self {
            config,
            metric,
            nodes: BTreeMap::new(),
            entry_point: None,
            max_level: 0,
            rng_seed: 42,
            rng_counter: 0,
        }
    }

    /// Number of nodes currently tracked (alive or deleted).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains_alive(&self, id: NounId) -> bool {
        self.nodes.get(&id).is_some_and(|n| !n.is_deleted())
    }

    fn splitmix64(&self, mut x: u64) -> u64 {
        x = x.wrapping_add(0x9e3779b97f4a7c15);
        x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
        x ^ (x >> 31)
    }

    fn assign_level(&mut self) -> usize {
        self.rng_counter += 1;
        let hash = self.splitmix64(self.rng_seed.wrapping_add(self.rng_counter));
        let uniform = ((hash as f64) / (u64::MAX as f64)).max(1e-15);
        (-uniform.ln() * self.config.ml) as usize
    }

    fn search_layer(
        &self,
        query: &[f32],
        entry_id: NounId,
        ef: usize,
        layer: usize,
        vectors: &dyn VectorSource,
    ) -> Vec<ScoredId> {
        let entry_embedding = match vectors.get(entry_id) {
            Some(e) => e,
            None => return Vec::new(),
        };
        let entry_score = compute_similarity(query, entry_embedding, self.metric);

        let mut visited = BTreeSet::new();
        visited.insert(entry_id);

        let mut candidates = BinaryHeap::new();
        candidates.push(ScoredId { score: entry_score, id: entry_id });

        let mut results: BinaryHeap<Reverse<ScoredId>> = BinaryHeap::new();
        let entry_deleted = self.nodes.get(&entry_id).map(|n| n.is_deleted()).unwrap_or(false);
        if !entry_deleted {
            results.push(Reverse(ScoredId { score: entry_score, id: entry_id }));
        }

        while let Some(nearest) = candidates.pop() {
            let worst = results.peek().map(|r| r.0.score).unwrap_or(f32::NEG_INFINITY);
            if nearest.score < worst && results.len() >= ef {
                break;
            }

            if let Some(node) = self.nodes.get(&nearest.id) {
                if layer < node.neighbors.len() {
                    for &neighbor_id in &node.neighbors[layer] {
                        if visited.contains(&neighbor_id) {
                            continue;
                        }
                        visited.insert(neighbor_id);

                        if let Some(neighbor_embedding) = vectors.get(neighbor_id) {
                            let score = compute_similarity(query, neighbor_embedding, self.metric);
                            let worst = results.peek().map(|r| r.0.score).unwrap_or(f32::NEG_INFINITY);

                            if results.len() < ef || score > worst {
                                candidates.push(ScoredId { score, id: neighbor_id });

                                let deleted =
                                    self.nodes.get(&neighbor_id).map(|n| n.is_deleted()).unwrap_or(false);
                                if !deleted {
                                    results.push(Reverse(ScoredId { score, id: neighbor_id }));
                                    if results.len() > ef {
                                        results.pop();
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        let mut out: Vec<ScoredId> = results.into_iter().map(|r| r.0).collect();
        out.sort_by(|a, b| {
            b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal).then_with(|| a.id.cmp(&b.id))
        });
        out
    }

    fn greedy_search_to_layer(
        &self,
        query: &[f32],
        entry_id: NounId,
        from_layer: usize,
        to_layer: usize,
        vectors: &dyn VectorSource,
    ) -> NounId {
        let mut current = entry_id;
        for layer in (to_layer..=from_layer).rev() {
            let mut improved = true;
            while improved {
                improved = false;
                let current_embedding = match vectors.get(current) {
                    Some(e) => e,
                    None => break,
                };
                let current_score = compute_similarity(query, current_embedding, self.metric);

                let mut best_score = current_score;
                let mut best_id = current;
                if let Some(node) = self.nodes.get(&current) {
                    if layer < node.neighbors.len() {
                        for &neighbor_id in &node.neighbors[layer] {
                            if let Some(neighbor_embedding) = vectors.get(neighbor_id) {
                                let score = compute_similarity(query, neighbor_embedding, self.metric);
                                if score > best_score || (score == best_score && neighbor_id < best_id) {
                                    best_score = score;
                                    best_id = neighbor_id;
                                }
                            }
                        }
                    }
                }

                if best_id != current {
                    current = best_id;
                    improved = true;
                }
            }
        }
        current
    }

    fn select_neighbors(&self, candidates: &[ScoredId], max_connections: usize) -> Vec<NounId> {
        candidates.iter().take(max_connections).map(|s| s.id).collect()
    }

    fn prune_neighbors_for(
        &mut self,
        id: NounId,
        layer: usize,
        max_connections: usize,
        vectors: &dyn VectorSource,
    ) {
        let embedding = match vectors.get(id) {
            Some(e) => e.to_vec(),
            None => return,
        };

        let neighbors: Vec<NounId> = match self.nodes.get(&id) {
            Some(node) if layer < node.neighbors.len() => node.neighbors[layer].iter().copied().collect(),
            _ => return,
        };

        let mut scored: Vec<ScoredId> = neighbors
            .iter()
            .filter_map(|&nid| {
                vectors.get(nid).map(|n_emb| ScoredId {
                    score: compute_similarity(&embedding, n_emb, self.metric),
                    id: nid,
                })
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal).then_with(|| a.id.cmp(&b.id))
        });

        let keep: BTreeSet<NounId> = scored.iter().take(max_connections).map(|s| s.id).collect();
        if let Some(node) = self.nodes.get_mut(&id) {
            if layer < node.neighbors.len() {
                node.neighbors[layer] = keep;
            }
        }
    }

    /// Insert `id` into the graph. Mirrors the paper's INSERT algorithm:
    /// greedy descent to the new node's top layer, then at each remaining
    /// layer an ef-construction beam search, `select_neighbors` for the new
    /// node's own edges, and reciprocal edges from each selected neighbor
    /// pruned back to its layer's connection cap.
    pub fn insert(&mut self, id: NounId, embedding: &[f32], created_at: u64, vectors: &dyn VectorSource) {
        let level = self.assign_level();
        self.nodes.insert(id, HnswNode::new(level, created_at));

        if self.entry_point.is_none() {
            self.entry_point = Some(id);
            self.max_level = level;
            return;
        }

        let entry_id = self.entry_point.unwrap();
        let mut current_entry = entry_id;
        if self.max_level > level {
            current_entry = self.greedy_search_to_layer(embedding, entry_id, self.max_level, level + 1, vectors);
        }

        let start_layer = level.min(self.max_level);
        for layer in (0..=start_layer).rev() {
            let candidates = self.search_layer(embedding, current_entry, self.config.ef_construction, layer, vectors);
            let selected = self.select_neighbors(&candidates, self.config.m);

            if let Some(new_node) = self.nodes.get_mut(&id) {
                if layer < new_node.neighbors.len() {
                    for &neighbor_id in &selected {
                        new_node.neighbors[layer].insert(neighbor_id);
                    }
                }
            }

            let max_conn = if layer == 0 {
                self.config.max_connections_layer0()
            } else {
                self.config.max_connections()
            };

            for &neighbor_id in &selected {
                let needs_prune = if let Some(neighbor_node) = self.nodes.get_mut(&neighbor_id) {
                    if layer < neighbor_node.neighbors.len() {
                        neighbor_node.neighbors[layer].insert(id);
                        neighbor_node.neighbors[layer].len() > max_conn
                    } else {
                        false
                    }
                } else {
                    false
                };
                if needs_prune {
                    self.prune_neighbors_for(neighbor_id, layer, max_conn, vectors);
                }
            }

            if let Some(closest) = candidates.first() {
                current_entry = closest.id;
            }
        }

        if level > self.max_level {
            self.entry_point = Some(id);
            self.max_level = level;
        }
    }

    /// Search for the `k` nearest alive neighbors of `query`.
    pub fn search(&self, query: &[f32], k: usize, vectors: &dyn VectorSource) -> Vec<(NounId, f32)> {
        if k == 0 || self.nodes.is_empty() || query.len() != vectors.dimension() {
            return Vec::new();
        }
        let entry_id = match self.entry_point {
            Some(id) => id,
            None => return Vec::new(),
        };
        if self.nodes.values().all(|n| n.is_deleted()) {
            return Vec::new();
        }

        let mut current_entry = entry_id;
        if self.max_level > 0 {
            current_entry = self.greedy_search_to_layer(query, entry_id, self.max_level, 1, vectors);
        }

        let ef = self.config.ef_search.max(k);
        let candidates = self.search_layer(query, current_entry, ef, 0, vectors);

        candidates
            .into_iter()
            .filter(|s| self.nodes.get(&s.id).map(|n| !n.is_deleted()).unwrap_or(false))
            .take(k)
            .map(|s| (s.id, s.score))
            .collect()
    }

    /// Search as of a past timestamp (§3 "is_alive_at"), over-fetching and
    /// filtering the current graph rather than maintaining per-timestamp
    /// structures.
    pub fn search_at(&self, query: &[f32], k: usize, as_of_ts: u64, vectors: &dyn VectorSource) -> Vec<(NounId, f32)> {
        if self.nodes.is_empty() || k == 0 {
            return Vec::new();
        }
        if !self.nodes.values().any(|n| n.is_alive_at(as_of_ts)) {
            return Vec::new();
        }
        let mut results = self.search(query, k * 2, vectors);
        results.retain(|(id, _)| self.nodes.get(id).is_some_and(|n| n.is_alive_at(as_of_ts)));
        results.truncate(k);
        results
    }

    /// Soft-delete a node in the graph (removal is only logical; edges are
    /// kept so the graph stays connected for waypoint traversal).
    pub fn mark_deleted(&mut self, id: NounId, deleted_at: u64) -> bool {
        let was_alive = self.nodes.get(&id).is_some_and(|n| !n.is_deleted());
        if let Some(node) = self.nodes.get_mut(&id) {
            node.deleted_at = Some(deleted_at);
        }
        was_alive
    }

    /// Undo a soft-delete (the graph never physically removes a node until
    /// the engine's cleanup pass rebuilds it).
    pub fn mark_restored(&mut self, id: NounId) -> bool {
        if let Some(node) = self.nodes.get_mut(&id) {
            if node.deleted_at.take().is_some() {
                return true;
            }
        }
        false
    }

    /// Rebuild from scratch by replaying inserts in ascending id order, for
    /// determinism across identical recovery replays.
    pub fn rebuild(&mut self, entries: &[(NounId, Vec<f32>, u64)], vectors: &dyn VectorSource) {
        self.nodes.clear();
        self.entry_point = None;
        self.max_level = 0;
        self.rng_counter = 0;

        let mut sorted = entries.to_vec();
        sorted.sort_by_key(|(id, _, _)| *id);
        for (id, embedding, created_at) in sorted {
            self.insert(id, &embedding, created_at, vectors);
        }
    }

    /// Serialize graph connectivity (not embeddings) for persistence.
    pub fn to_bytes(&self) -> Vec<u8> {
        rmp_serde::to_vec(self).expect("HnswGraph serialization is infallible for owned data")
    }

    /// Deserialize graph connectivity produced by [`HnswGraph::to_bytes`].
    pub fn from_bytes(data: &[u8]) -> Result<Self, vgdb_core::Error> {
        rmp_serde::from_slice(data)
            .map_err(|e| vgdb_core::Error::StorageFailure(format!("corrupt hnsw graph state: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;

    struct FakeVectors(Map<NounId, Vec<f32>>, usize);

    impl VectorSource for FakeVectors {
        fn get(&self, id: NounId) -> Option<&[f32]> {
            self.0.get(&id).map(|v| v.as_slice())
        }
        fn dimension(&self) -> usize {
            self.1
        }
    }

    fn build(n: usize) -> (HnswGraph, FakeVectors, Vec<NounId>) {
        let mut graph = HnswGraph::new(DistanceMetric::Cosine, HnswConfig::default());
        let mut store = Map::new();
        let mut ids = Vec::new();
        for i in 0..n {
            let id = NounId::new();
            let angle = i as f32;
            store.insert(id, vec![angle.cos(), angle.sin()]);
            ids.push(id);
        }
        let vectors = FakeVectors(store, 2);
        for &id in &ids {
            graph.insert(id, vectors.get(id).unwrap(), 0, &vectors);
        }
        (graph, vectors, ids)
    }

    #[test]
    fn search_returns_self_as_closest_match() {
        let (graph, vectors, ids) = build(30);
        let query = vectors.get(ids[5]).unwrap().to_vec();
        let results = graph.search(&query, 5, &vectors);
        assert_eq!(results[0].0, ids[5]);
    }

    #[test]
    fn deleted_nodes_are_excluded_from_results() {
        let (mut graph, vectors, ids) = build(20);
        graph.mark_deleted(ids[3], 100);
        let query = vectors.get(ids[3]).unwrap().to_vec();
        let results = graph.search(&query, 20, &vectors);
        assert!(!results.iter().any(|(id, _)| *id == ids[3]));
    }

    #[test]
    fn restore_makes_node_searchable_again() {
        let (mut graph, vectors, ids) = build(10);
        graph.mark_deleted(ids[0], 50);
        assert!(graph.mark_restored(ids[0]));
        let query = vectors.get(ids[0]).unwrap().to_vec();
        let results = graph.search(&query, 10, &vectors);
        assert!(results.iter().any(|(id, _)| *id == ids[0]));
    }

    #[test]
    fn graph_state_round_trips_through_bytes() {
        let (graph, _, _) = build(12);
        let bytes = graph.to_bytes();
        let restored = HnswGraph::from_bytes(&bytes).unwrap();
        assert_eq!(restored.len(), graph.len());
    }

    #[test]
    fn empty_graph_search_returns_nothing() {
        let graph = HnswGraph::new(DistanceMetric::Cosine, HnswConfig::default());
        let vectors = FakeVectors(Map::new(), 2);
        assert!(graph.search(&[1.0, 0.0], 5, &vectors).is_empty());
    }
}
