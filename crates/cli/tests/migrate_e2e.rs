//! End-to-end coverage for `migrate`: real HTTP round trip against a
//! `vgdb-engine` server serving the destination shard, driven by
//! [`vgdb_cli::migrate::run_migrate`].

use std::sync::Arc;

use vgdb_core::cluster::{ClusterConfig, NodeCapacity, NodeInfo, NodeStats};
use vgdb_core::value::Metadata;
use vgdb_core::{ConsensusRole, EngineConfig, InstanceRole, NodeId, Noun, NounType, ShardId, Verb, VerbType};
use vgdb_engine::{AppState, Database};
use vgdb_storage::{MemoryAdapter, StorageAdapter};
use vgdb_transport::layout::{vector_partition_prefix, CLUSTER_CONFIG_KEY};

fn dest_node_info(endpoint: String) -> NodeInfo {
    NodeInfo {
        id: NodeId("n2".into()),
        endpoint,
        hostname: "n2".into(),
        started: 0,
        last_seen: 0,
        role: ConsensusRole::Leader,
        instance_role: InstanceRole::Hybrid,
        shards: vec![ShardId(0)],
        capacity: NodeCapacity { cpu: 1, memory_mb: 1024 },
        stats: NodeStats::default(),
    }
}

#[tokio::test]
async fn migrate_streams_nouns_and_verbs_to_a_live_destination() {
    // Destination: a real axum server serving shard 0.
    let dest_storage: Arc<dyn StorageAdapter> = Arc::new(MemoryAdapter::new());
    let dest_db = Arc::new(Database::open(ShardId(0), NodeId("n2".into()), EngineConfig::default(), dest_storage.clone()).unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let dest_endpoint = format!("http://{addr}");
    let dest_cluster = ClusterConfig::bootstrap(dest_node_info(dest_endpoint.clone()), 1, 0);
    let state = Arc::new(AppState::new(dest_db.clone(), dest_cluster));
    let server = tokio::spawn(async move {
        axum::serve(listener, vgdb_engine::router(state)).await.unwrap();
    });

    // Source: raw blobs under shard 0's partition, plus a cluster config
    // pointing "n2" at the live destination above.
    let source_storage = MemoryAdapter::new();
    let mut cluster = ClusterConfig::bootstrap(dest_node_info(dest_endpoint), 1, 0);
    cluster.nodes.insert(NodeId("n2".into()), cluster.nodes.values().next().unwrap().clone());
    source_storage
        .put_blob(CLUSTER_CONFIG_KEY, &serde_json::to_vec(&cluster).unwrap())
        .unwrap();

    let noun = Noun::new(vec![1.0, 0.0], NounType::Document, Metadata::new(), NodeId("n1".into()), 0);
    let noun_id = noun.id;
    let verb = Verb::new(noun_id, noun_id, VerbType::RelatedTo, None, 1.0, 1.0, Metadata::new(), NodeId("n1".into()), 0).unwrap();
    let prefix = vector_partition_prefix(ShardId(0));
    source_storage
        .put_blob(&format!("{prefix}nouns/{noun_id}.json"), &serde_json::to_vec(&noun).unwrap())
        .unwrap();
    source_storage
        .put_blob(&format!("{prefix}verbs/{}.json", verb.id), &serde_json::to_vec(&verb).unwrap())
        .unwrap();

    let outcome = vgdb_cli::migrate::run_migrate(
        &source_storage,
        NodeId("n1".into()),
        ShardId(0),
        NodeId("n2".into()),
        100,
        3,
        1_000,
    )
    .await
    .unwrap();

    assert_eq!(outcome.nouns_sent, 1);
    assert_eq!(outcome.verbs_sent, 1);
    assert!(dest_db.get_noun(noun_id, 0, false).unwrap().is_some());
    assert!(dest_db.get_verb(verb.id, 0, false).unwrap().is_some());

    server.abort();
}
