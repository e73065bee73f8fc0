//! End-to-end coverage over a `FileAdapter`-backed [`Database`]: insert,
//! vector search, metadata filter, graph traversal, and soft-delete +
//! restore, driven through the same planner seams the HTTP layer uses.

use std::sync::Arc;

use tempfile::tempdir;

use vgdb_core::value::MetaValue;
use vgdb_core::{EngineConfig, Metadata, NodeId, Noun, NounType, ShardId, Verb, VerbType};
use vgdb_engine::{Database, DatabaseSources, HashEmbedder};
use vgdb_planner::{ConnectedClause, FusionWeights, LikeClause, Query, QueryMode, QueryPlanner};
use vgdb_storage::FileAdapter;

fn open_database() -> Database {
    let dir = tempdir().unwrap();
    // Leak the tempdir so it outlives the test's Database; the OS reclaims
    // it when the process exits.
    let root = Box::leak(Box::new(dir)).path().to_path_buf();
    let storage = Arc::new(FileAdapter::open(root).unwrap());
    Database::open(ShardId(0), NodeId("n1".into()), EngineConfig::default(), storage).unwrap()
}

fn noun_with_category(category: &str, vector: Vec<f32>) -> Noun {
    let mut metadata = Metadata::new();
    metadata.insert("category".into(), MetaValue::Str(category.into()));
    Noun::new(vector, NounType::Document, metadata, NodeId("n1".into()), 0)
}

#[test]
fn insert_then_vector_search_finds_the_nearest_noun() {
    let db = open_database();
    let target = noun_with_category("invoice", vec![1.0, 0.0]);
    let decoy = noun_with_category("invoice", vec![0.0, 1.0]);
    let target_id = target.id;
    db.save_noun(target, None, 0).unwrap();
    db.save_noun(decoy, None, 0).unwrap();

    let embedder = HashEmbedder::new(2);
    let sources = DatabaseSources::new(&db, &embedder);
    let planner = QueryPlanner { vectors: &sources, graph: &sources, metadata: &sources, max_depth_ceiling: 4, weights: FusionWeights::default() };

    let query = Query { like: Some(LikeClause::Vector(vec![1.0, 0.0])), mode: QueryMode::Vector, limit: Some(1), ..Default::default() };
    let result = planner.execute(&query, vgdb_core::OperationalMode::Hybrid).unwrap();
    assert_eq!(result.hits.first().map(|h| h.id), Some(target_id));
}

#[test]
fn metadata_filter_matches_only_the_tagged_noun() {
    let db = open_database();
    let invoice = noun_with_category("invoice", vec![1.0, 0.0]);
    let memo = noun_with_category("memo", vec![0.0, 1.0]);
    let invoice_id = invoice.id;
    db.save_noun(invoice, None, 0).unwrap();
    db.save_noun(memo, None, 0).unwrap();

    let matches = db.metadata_eq("category", &MetaValue::Str("invoice".into()));
    assert_eq!(matches, vec![invoice_id]);
}

#[test]
fn graph_traversal_follows_verbs_from_the_start_noun() {
    let db = open_database();
    let alice = noun_with_category("person", vec![1.0, 0.0]);
    let bob = noun_with_category("person", vec![0.0, 1.0]);
    let (alice_id, bob_id) = (alice.id, bob.id);
    db.save_noun(alice, None, 0).unwrap();
    db.save_noun(bob, None, 0).unwrap();
    let verb = Verb::new(alice_id, bob_id, VerbType::RelatedTo, None, 0.8, 0.9, Metadata::new(), NodeId("n1".into()), 0).unwrap();
    db.save_verb(verb, 0).unwrap();

    let embedder = HashEmbedder::new(2);
    let sources = DatabaseSources::new(&db, &embedder);
    let planner = QueryPlanner { vectors: &sources, graph: &sources, metadata: &sources, max_depth_ceiling: 4, weights: FusionWeights::default() };

    let query = Query {
        connected: Some(ConnectedClause { from: Some(alice_id), to: None, via: None, depth: Some(1) }),
        mode: QueryMode::Graph,
        ..Default::default()
    };
    let result = planner.execute(&query, vgdb_core::OperationalMode::Hybrid).unwrap();
    assert!(result.hits.iter().any(|h| h.id == bob_id));
}

#[test]
fn soft_deleted_noun_is_excluded_from_vector_search_results_once_purged() {
    let db = open_database();
    let noun = noun_with_category("invoice", vec![1.0, 0.0]);
    let id = noun.id;
    db.save_noun(noun, None, 0).unwrap();

    db.delete_noun(id, 0).unwrap();
    assert!(db.get_noun(id, 0, true).unwrap().unwrap().is_tombstoned());

    db.restore_noun(id, 10).unwrap();
    assert!(!db.get_noun(id, 10, true).unwrap().unwrap().is_tombstoned());

    db.delete_noun(id, 20).unwrap();
    let max_age = db.config().cleanup.max_soft_delete_age_us;
    let (removed, _) = db.purge_expired(20 + max_age + 1, max_age);
    assert_eq!(removed, 1);
    assert!(db.get_noun(id, 0, true).unwrap().is_none());
}
