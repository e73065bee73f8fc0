//! `migrate --shard <id> --to <node>` (§4.6).
//!
//! Drives one shard's four-phase migration directly over the storage
//! adapter's blob layer rather than through a live [`vgdb_engine::Database`]:
//! `Database::open` recovers only the change-log sequence allocator, not
//! the in-memory secondary indexes, so a freshly opened `Database` would
//! enumerate nothing. Reading the shard's blobs straight out of storage
//! sidesteps that rather than requiring a separate reindex pass — see
//! DESIGN.md.

use std::time::Duration;

use tracing::{info, warn};
use vgdb_core::cluster::ClusterConfig;
use vgdb_core::{Error, NodeId, Result, ShardId};
use vgdb_migration::{MigrationDriver, MigrationRecord};
use vgdb_storage::StorageAdapter;
use vgdb_transport::layout::{vector_partition_prefix, CLUSTER_CONFIG_KEY};
use vgdb_transport::stream::{encode_body, StreamItem, StreamItemType};

/// Totals reported back to the CLI caller on success.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrateOutcome {
    pub nouns_sent: u64,
    pub verbs_sent: u64,
}

/// Runs one migration attempt to completion against the destination's
/// `/stream/{streamId}` endpoint, or returns the first error encountered
/// (the migration record itself lands in `Failed` for anything past
/// `begin_transfer`).
pub async fn run_migrate(
    storage: &dyn StorageAdapter,
    self_node: NodeId,
    shard: ShardId,
    to_node: NodeId,
    batch_size: usize,
    max_retries: u32,
    now_us: u64,
) -> Result<MigrateOutcome> {
    let config_bytes = storage
        .get_blob(CLUSTER_CONFIG_KEY)?
        .ok_or_else(|| Error::ConsensusTimeout("no cluster config found; is this node bootstrapped?".into()))?;
    let cluster: ClusterConfig =
        serde_json::from_slice(&config_bytes).map_err(|e| Error::StorageFailure(format!("cluster config decode: {e}")))?;
    let dest = cluster
        .nodes
        .get(&to_node)
        .ok_or_else(|| Error::ConsensusTimeout(format!("unknown destination node {to_node}")))?;
    if dest.endpoint.is_empty() {
        return Err(Error::ConsensusTimeout(format!("destination node {to_node} has no advertised endpoint")));
    }

    let prefix = vector_partition_prefix(shard);
    let keys = storage.list_blobs(&prefix)?;
    let noun_keys: Vec<_> = keys.iter().filter(|k| k.contains("/nouns/")).cloned().collect();
    let verb_keys: Vec<_> = keys.iter().filter(|k| k.contains("/verbs/")).cloned().collect();
    let expected_count = (noun_keys.len() + verb_keys.len()) as u64;

    let record = MigrationRecord::propose(shard, self_node, to_node.clone(), now_us);
    let mut driver = MigrationDriver::new(record, batch_size.max(1), max_retries);
    driver.begin_transfer(expected_count)?;

    let client = reqwest::Client::new();
    let stream_url = format!("{}/stream/{}", dest.endpoint.trim_end_matches('/'), driver.record().id);

    let mut nouns_sent = 0u64;
    for chunk in noun_keys.chunks(driver.batch_size()) {
        let items = load_items(storage, chunk, StreamItemType::Noun)?;
        let sent = items.len() as u64;
        post_batch(&client, &stream_url, &items).await?;
        driver.record_batch(sent, 0)?;
        nouns_sent += sent;
    }
    let mut verbs_sent = 0u64;
    for chunk in verb_keys.chunks(driver.batch_size()) {
        let items = load_items(storage, chunk, StreamItemType::Verb)?;
        let sent = items.len() as u64;
        post_batch(&client, &stream_url, &items).await?;
        driver.record_batch(0, sent)?;
        verbs_sent += sent;
    }

    driver.finish_transfer()?;
    driver.validate(nouns_sent + verbs_sent)?;
    driver.commit_switch(now_us)?;
    info!(shard = %shard, to = %to_node, nouns_sent, verbs_sent, "shard migration completed");
    Ok(MigrateOutcome { nouns_sent, verbs_sent })
}

fn load_items(storage: &dyn StorageAdapter, keys: &[String], item_type: StreamItemType) -> Result<Vec<StreamItem>> {
    let mut items = Vec::with_capacity(keys.len());
    for key in keys {
        let bytes = storage.get_blob(key)?.ok_or_else(|| Error::StorageFailure(format!("blob vanished mid-migration: {key}")))?;
        let data: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| Error::StorageFailure(format!("corrupt entity at {key}: {e}")))?;
        items.push(StreamItem { item_type, data });
    }
    Ok(items)
}

async fn post_batch(client: &reqwest::Client, url: &str, items: &[StreamItem]) -> Result<()> {
    let body = encode_body(items);
    let response = client
        .post(url)
        .header("content-type", "application/x-ndjson")
        .body(body)
        .timeout(Duration::from_secs(30))
        .send()
        .await
        .map_err(|e| Error::ConsensusTimeout(format!("stream batch to {url}: {e}")))?;
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        warn!(url, %status, "destination rejected migration batch");
        return Err(Error::StorageFailure(format!("destination rejected batch ({status}): {text}")));
    }
    Ok(())
}
