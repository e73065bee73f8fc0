//! Graph-mode traversal: BFS/DFS from a starting noun (§4.7 "graph" mode).

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use vgdb_core::{NounId, VerbType};

use crate::query::ConnectedClause;

/// Read-only access to the adjacency the planner traverses. The engine
/// crate implements this over the live noun/verb store; tests use a
/// plain adjacency map.
pub trait GraphSource {
    fn outgoing(&self, id: NounId) -> Vec<(VerbType, NounId)>;
    fn incoming(&self, id: NounId) -> Vec<(VerbType, NounId)>;
}

/// BFS distances from `clause.from` (or reverse-BFS to `clause.to`) up to
/// `clause.depth` (capped by `max_depth`), optionally restricted to one
/// verb type. Returns `noun -> hop distance`.
pub fn traverse(
    source: &dyn GraphSource,
    clause: &ConnectedClause,
    max_depth: u32,
) -> BTreeMap<NounId, u32> {
    let depth_limit = clause.depth.unwrap_or(max_depth).min(max_depth);
    let Some(start) = clause.from.or(clause.to) else {
        return BTreeMap::new();
    };
    let forward = clause.from.is_some();

    let mut distances = BTreeMap::new();
    let mut visited: BTreeSet<NounId> = BTreeSet::new();
    let mut queue = VecDeque::new();
    distances.insert(start, 0);
    visited.insert(start);
    queue.push_back((start, 0));

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= depth_limit {
            continue;
        }
        let edges = if forward { source.outgoing(current) } else { source.incoming(current) };
        for (verb_type, neighbor) in edges {
            if let Some(via) = clause.via {
                if via != verb_type {
                    continue;
                }
            }
            if visited.insert(neighbor) {
                distances.insert(neighbor, depth + 1);
                queue.push_back((neighbor, depth + 1));
            }
        }
    }

    distances.remove(&start);
    distances
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeGraph(HashMap<NounId, Vec<(VerbType, NounId)>>);

    impl GraphSource for FakeGraph {
        fn outgoing(&self, id: NounId) -> Vec<(VerbType, NounId)> {
            self.0.get(&id).cloned().unwrap_or_default()
        }
        fn incoming(&self, _id: NounId) -> Vec<(VerbType, NounId)> {
            Vec::new()
        }
    }

    #[test]
    fn bfs_respects_depth_limit() {
        let a = NounId::new();
        let b = NounId::new();
        let c = NounId::new();
        let mut adjacency = HashMap::new();
        adjacency.insert(a, vec![(VerbType::RelatedTo, b)]);
        adjacency.insert(b, vec![(VerbType::RelatedTo, c)]);
        let graph = FakeGraph(adjacency);

        let clause = ConnectedClause { from: Some(a), to: None, via: None, depth: Some(1) };
        let distances = traverse(&graph, &clause, 10);
        assert_eq!(distances.get(&b), Some(&1));
        assert!(!distances.contains_key(&c));
    }

    #[test]
    fn via_filter_excludes_other_verb_types() {
        let a = NounId::new();
        let b = NounId::new();
        let mut adjacency = HashMap::new();
        adjacency.insert(a, vec![(VerbType::DependsOn, b)]);
        let graph = FakeGraph(adjacency);

        let clause = ConnectedClause { from: Some(a), to: None, via: Some(VerbType::RelatedTo), depth: Some(2) };
        let distances = traverse(&graph, &clause, 10);
        assert!(distances.is_empty());
    }

    #[test]
    fn no_start_point_returns_empty() {
        let graph = FakeGraph(HashMap::new());
        let clause = ConnectedClause::default();
        assert!(traverse(&graph, &clause, 10).is_empty());
    }
}
