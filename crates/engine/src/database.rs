//! Per-shard database: the one place that owns the HNSW index, the
//! metadata index, the noun/verb secondary indexes, and the storage
//! adapter together (§3, §4.2, §5 "per-shard write lock").
//!
//! Keeps a small set of in-memory secondary indexes for the lifetime
//! of the process, with a storage adapter as the actual durability
//! boundary — entity bodies round-trip through [`vgdb_cache::MultiTierCache`]
//! rather than living permanently in a giant in-memory map.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;
use vgdb_cache::MultiTierCache;
use vgdb_core::change::{ChangeEvent, ChangeOp, EntityKind};
use vgdb_core::value::Metadata;
use vgdb_core::{
    DistanceMetric, EngineConfig, Error, NodeId, Noun, NounId, NounType, OperationalMode, Result,
    SeqAllocator, ShardId, Verb, VerbId, VerbType,
};
use vgdb_hnsw::{HnswConfig, HnswIndex};
use vgdb_partition::MetadataIndex;
use vgdb_storage::StorageAdapter;
use vgdb_transport::layout::vector_partition_prefix;

use crate::status::StorageStatus;

fn noun_key(shard: ShardId, id: NounId) -> String {
    format!("{}nouns/{id}.json", vector_partition_prefix(shard))
}

fn verb_key(shard: ShardId, id: VerbId) -> String {
    format!("{}verbs/{id}.json", vector_partition_prefix(shard))
}

fn metadata_blob_key(key: &str) -> String {
    format!("meta/{key}")
}

/// Optimistic-concurrency check shared by noun and verb writes (§7
/// `ConcurrencyConflict`).
fn check_version(current: Option<u64>, expected: Option<u64>) -> Result<u64> {
    let current = current.unwrap_or(0);
    if let Some(expected) = expected {
        if expected != current {
            return Err(Error::ConcurrencyConflict { expected, actual: current });
        }
    }
    Ok(current + 1)
}

fn hnsw_config_from(cfg: &EngineConfig) -> HnswConfig {
    let m = cfg.hnsw.m.max(1);
    HnswConfig {
        m,
        ef_construction: cfg.hnsw.ef_construction,
        ef_search: cfg.hnsw.ef_search,
        ml: 1.0 / (m as f64).ln().max(f64::MIN_POSITIVE),
    }
}

/// A single shard's live state: nouns, verbs, the ANN index over noun
/// vectors, and the metadata inverted index, all fronted by the multi-
/// tier cache and backed by a [`StorageAdapter`] (§3 "Shard").
pub struct Database {
    shard: ShardId,
    self_node: NodeId,
    config: EngineConfig,
    mode: RwLock<OperationalMode>,
    storage: Arc<dyn StorageAdapter>,
    seq: SeqAllocator,

    /// Serializes the shard's mutation path (§5 "per-shard write lock").
    /// Reads never take this lock.
    write_lock: Mutex<()>,

    noun_versions: RwLock<BTreeMap<NounId, u64>>,
    noun_types: RwLock<BTreeMap<NounId, NounType>>,
    noun_ids_by_type: RwLock<BTreeMap<u8, BTreeSet<NounId>>>,
    noun_cache: RwLock<MultiTierCache<NounId, Noun>>,

    verb_versions: RwLock<BTreeMap<VerbId, u64>>,
    verb_endpoints: RwLock<BTreeMap<VerbId, (NounId, NounId)>>,
    by_source: RwLock<BTreeMap<NounId, BTreeSet<VerbId>>>,
    by_target: RwLock<BTreeMap<NounId, BTreeSet<VerbId>>>,
    by_verb_type: RwLock<BTreeMap<u8, BTreeSet<VerbId>>>,
    verb_cache: RwLock<MultiTierCache<VerbId, Verb>>,

    index: RwLock<HnswIndex>,
    metadata_index: RwLock<MetadataIndex>,
}

impl Database {
    /// Open (or initialize) the database for `shard` on `self_node`,
    /// recovering the change-log sequence allocator from `storage`.
    pub fn open(
        shard: ShardId,
        self_node: NodeId,
        config: EngineConfig,
        storage: Arc<dyn StorageAdapter>,
    ) -> Result<Self> {
        let next_seq = storage.max_seq(&self_node.0)?.map(|s| s + 1).unwrap_or(0);
        let hot = config.cache.hot_cache_max_size;
        let evict = config.cache.hot_cache_eviction_threshold;
        let ttl = config.cache.warm_cache_ttl_us;
        Ok(Self {
            index: RwLock::new(HnswIndex::new(DistanceMetric::Cosine, hnsw_config_from(&config))),
            mode: RwLock::new(OperationalMode::default()),
            noun_cache: RwLock::new(MultiTierCache::new(hot, evict, ttl, self_node.clone())),
            verb_cache: RwLock::new(MultiTierCache::new(hot, evict, ttl, self_node.clone())),
            seq: SeqAllocator::starting_at(next_seq),
            write_lock: Mutex::new(()),
            noun_versions: RwLock::new(BTreeMap::new()),
            noun_types: RwLock::new(BTreeMap::new()),
            noun_ids_by_type: RwLock::new(BTreeMap::new()),
            verb_versions: RwLock::new(BTreeMap::new()),
            verb_endpoints: RwLock::new(BTreeMap::new()),
            by_source: RwLock::new(BTreeMap::new()),
            by_target: RwLock::new(BTreeMap::new()),
            by_verb_type: RwLock::new(BTreeMap::new()),
            metadata_index: RwLock::new(MetadataIndex::new()),
            shard,
            self_node,
            config,
            storage,
        })
    }

    pub fn shard(&self) -> ShardId {
        self.shard
    }

    pub fn mode(&self) -> OperationalMode {
        *self.mode.read()
    }

    pub fn set_mode(&self, mode: OperationalMode) {
        *self.mode.write() = mode;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn self_node(&self) -> NodeId {
        self.self_node.clone()
    }

    fn append_change(&self, op: ChangeOp, entity_kind: EntityKind, id: String, version: u64, now: u64) -> Result<()> {
        let event = ChangeEvent::new(self.seq.next(), op, entity_kind, id, version, now);
        self.storage.append_change(&self.self_node.0, &event)
    }

    // ---- Nouns (§3 "Noun", §4.2) ----------------------------------------

    /// `add` (new noun) or `update` (existing noun) depending on whether
    /// `expected_version` is `None` (create) or `Some` (optimistic update).
    pub fn save_noun(&self, mut noun: Noun, expected_version: Option<u64>, now: u64) -> Result<u64> {
        if !self.mode().allows_write() {
            return Err(Error::ModeViolation("write attempted in a non-writable operational mode".into()));
        }
        if !Noun::is_unit_norm(&noun.vector) {
            return Err(Error::InvalidArgument(format!("noun {} vector is not unit-norm", noun.id)));
        }
        let _guard = self.write_lock.lock();
        let id = noun.id;
        let current = self.noun_versions.read().get(&id).copied();
        let version = check_version(current, expected_version)?;
        noun.updated_at = now;

        let bytes = serde_json::to_vec(&noun)
            .map_err(|e| Error::StorageFailure(format!("noun serialize: {e}")))?;
        self.storage.put_blob(&noun_key(self.shard, id), &bytes)?;

        let op = if current.is_none() { ChangeOp::Add } else { ChangeOp::Update };
        self.append_change(op, EntityKind::Noun, id.to_string(), version, now)?;

        self.noun_versions.write().insert(id, version);
        self.noun_types.write().insert(id, noun.noun_type);
        self.noun_ids_by_type.write().entry(noun.noun_type.as_code()).or_default().insert(id);

        {
            let mut index = self.metadata_index.write();
            for (field, value) in noun.metadata.iter() {
                index.insert(field, value.clone(), id);
            }
        }

        if noun.is_tombstoned() {
            self.index.write().mark_deleted(id, now);
        } else if self.index.read().contains(id) {
            // vector may have changed on update; re-insert by purge+insert
            // would require a rebuild, so in place we only support a
            // pure metadata update keeping the existing embedding graph
            // position. A true vector change goes through delete+add.
        } else {
            self.index.write().insert(id, noun.vector.clone(), now)?;
        }

        self.noun_cache.write().invalidate(&id, version, now, false);
        debug!(noun = %id, version, "noun saved");
        Ok(version)
    }

    /// `get`. Direct-id lookups are allowed even in write-only mode when
    /// `allow_direct_reads` is set (§4.7); callers that need that
    /// exception pass `true` for `direct_read`.
    pub fn get_noun(&self, id: NounId, now: u64, direct_read: bool) -> Result<Option<Noun>> {
        let mode = self.mode();
        if !mode.allows_search() && !(mode == OperationalMode::WriteOnly && direct_read) {
            return Err(Error::ModeViolation("search attempted in a non-searchable operational mode".into()));
        }
        let storage = self.storage.clone();
        let shard = self.shard;
        let version = self.noun_versions.read().get(&id).copied();
        let Some(version) = version else { return Ok(None) };
        let noun = self.noun_cache.write().get_or_load(&id, now, || {
            let bytes = storage.get_blob(&noun_key(shard, id)).ok().flatten()?;
            let noun: Noun = serde_json::from_slice(&bytes).ok()?;
            Some((noun, version))
        });
        Ok(noun)
    }

    /// `delete`: flips the tombstone, keeps the HNSW node reachable as a
    /// traversal waypoint and the metadata index entry intact (§4.8).
    pub fn delete_noun(&self, id: NounId, now: u64) -> Result<()> {
        if !self.mode().allows_write() {
            return Err(Error::ModeViolation("delete attempted in a non-writable operational mode".into()));
        }
        let _guard = self.write_lock.lock();
        let mut noun = self.get_noun(id, now, true)?.ok_or_else(|| Error::NotFound(id.to_string()))?;
        if !noun.mark_deleted(now) {
            return Ok(());
        }
        let version = self.save_noun_raw(&noun, now, ChangeOp::Delete)?;
        self.index.write().mark_deleted(id, now);
        self.noun_cache.write().invalidate(&id, version, now, false);
        self.mark_incident_verbs_dangling(id, now);
        Ok(())
    }

    /// `restore`: clears the tombstone while it still exists (§3, §8
    /// round-trip law).
    pub fn restore_noun(&self, id: NounId, now: u64) -> Result<()> {
        if !self.mode().allows_write() {
            return Err(Error::ModeViolation("restore attempted in a non-writable operational mode".into()));
        }
        let _guard = self.write_lock.lock();
        let mut noun = self.get_noun(id, now, true)?.ok_or_else(|| Error::NotFound(id.to_string()))?;
        noun.mark_restored()?;
        let version = self.save_noun_raw(&noun, now, ChangeOp::Restore)?;
        self.index.write().mark_restored(id);
        self.noun_cache.write().invalidate(&id, version, now, false);
        Ok(())
    }

    /// Persist `noun` as-is (tombstone already applied by the caller) and
    /// bump its version, without re-running the full `save_noun` write
    /// path (insert-into-index / metadata-index steps do not apply the
    /// same way to a delete/restore as they do to a fresh `add`).
    fn save_noun_raw(&self, noun: &Noun, now: u64, op: ChangeOp) -> Result<u64> {
        let id = noun.id;
        let current = self.noun_versions.read().get(&id).copied();
        let version = current.unwrap_or(0) + 1;
        let bytes = serde_json::to_vec(noun).map_err(|e| Error::StorageFailure(format!("noun serialize: {e}")))?;
        self.storage.put_blob(&noun_key(self.shard, id), &bytes)?;
        self.append_change(op, EntityKind::Noun, id.to_string(), version, now)?;
        self.noun_versions.write().insert(id, version);
        Ok(version)
    }

    /// `listNounsByType`.
    pub fn list_nouns_by_type(&self, noun_type: NounType) -> Vec<NounId> {
        self.noun_ids_by_type.read().get(&noun_type.as_code()).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    /// Direct metadata-index equality lookup (§4.4), faster than scanning
    /// every noun through a `Predicate::Eq` leaf.
    pub fn metadata_eq(&self, field: &str, value: &vgdb_core::value::MetaValue) -> Vec<NounId> {
        self.metadata_index.read().eq_ids(field, value).into_iter().collect()
    }

    /// Direct metadata-index range lookup (§4.4).
    pub fn metadata_range(
        &self,
        field: &str,
        lower: Option<&vgdb_core::value::MetaValue>,
        upper: Option<&vgdb_core::value::MetaValue>,
    ) -> Vec<NounId> {
        self.metadata_index.read().range_ids(field, lower, upper).into_iter().collect()
    }

    /// All ids currently known (alive or tombstoned), ascending.
    pub fn all_noun_ids(&self) -> Vec<NounId> {
        self.noun_versions.read().keys().copied().collect()
    }

    fn mark_incident_verbs_dangling(&self, noun_id: NounId, now: u64) {
        let affected: BTreeSet<VerbId> = self
            .by_source
            .read()
            .get(&noun_id)
            .into_iter()
            .flatten()
            .chain(self.by_target.read().get(&noun_id).into_iter().flatten())
            .copied()
            .collect();
        for verb_id in affected {
            if let Ok(Some(mut verb)) = self.get_verb(verb_id, now, true) {
                if !verb.dangling {
                    verb.dangling = true;
                    verb.updated_at = now;
                    let _ = self.persist_verb_raw(&verb);
                }
            }
        }
    }

    fn persist_verb_raw(&self, verb: &Verb) -> Result<()> {
        let bytes = serde_json::to_vec(verb).map_err(|e| Error::StorageFailure(format!("verb serialize: {e}")))?;
        self.storage.put_blob(&verb_key(self.shard, verb.id), &bytes)?;
        self.verb_cache.write().invalidate(&verb.id, 0, verb.updated_at, false);
        Ok(())
    }

    // ---- Verbs (§3 "Verb") ----------------------------------------------

    /// `add` for verbs. Caller has already resolved or auto-created the
    /// endpoint nouns (§3 `autoCreateMissingNouns`).
    pub fn save_verb(&self, verb: Verb, now: u64) -> Result<u64> {
        if !self.mode().allows_write() {
            return Err(Error::ModeViolation("write attempted in a non-writable operational mode".into()));
        }
        let _guard = self.write_lock.lock();
        let id = verb.id;
        let version = 1;
        let bytes = serde_json::to_vec(&verb).map_err(|e| Error::StorageFailure(format!("verb serialize: {e}")))?;
        self.storage.put_blob(&verb_key(self.shard, id), &bytes)?;
        self.append_change(ChangeOp::Relate, EntityKind::Verb, id.to_string(), version, now)?;

        self.verb_versions.write().insert(id, version);
        self.verb_endpoints.write().insert(id, (verb.source, verb.target));
        self.by_source.write().entry(verb.source).or_default().insert(id);
        self.by_target.write().entry(verb.target).or_default().insert(id);
        self.by_verb_type.write().entry(verb.verb_type.as_code()).or_default().insert(id);
        self.verb_cache.write().invalidate(&id, version, now, false);
        debug!(verb = %id, "verb saved");
        Ok(version)
    }

    pub fn get_verb(&self, id: VerbId, now: u64, direct_read: bool) -> Result<Option<Verb>> {
        let mode = self.mode();
        if !mode.allows_search() && !(mode == OperationalMode::WriteOnly && direct_read) {
            return Err(Error::ModeViolation("search attempted in a non-searchable operational mode".into()));
        }
        let storage = self.storage.clone();
        let shard = self.shard;
        let version = self.verb_versions.read().get(&id).copied();
        let Some(version) = version else { return Ok(None) };
        let verb = self.verb_cache.write().get_or_load(&id, now, || {
            let bytes = storage.get_blob(&verb_key(shard, id)).ok().flatten()?;
            let verb: Verb = serde_json::from_slice(&bytes).ok()?;
            Some((verb, version))
        });
        Ok(verb)
    }

    /// `delete` for verbs.
    pub fn delete_verb(&self, id: VerbId, now: u64) -> Result<()> {
        if !self.mode().allows_write() {
            return Err(Error::ModeViolation("delete attempted in a non-writable operational mode".into()));
        }
        let _guard = self.write_lock.lock();
        let mut verb = self.get_verb(id, now, true)?.ok_or_else(|| Error::NotFound(id.to_string()))?;
        if !verb.mark_deleted(now) {
            return Ok(());
        }
        self.persist_verb_raw(&verb)?;
        self.append_change(ChangeOp::Unrelate, EntityKind::Verb, id.to_string(), 0, now)?;
        Ok(())
    }

    /// `getVerbsBySource`.
    pub fn verbs_by_source(&self, source: NounId) -> Vec<VerbId> {
        self.by_source.read().get(&source).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    /// `getVerbsByTarget`.
    pub fn verbs_by_target(&self, target: NounId) -> Vec<VerbId> {
        self.by_target.read().get(&target).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    /// `getVerbsByType`.
    pub fn verbs_by_type(&self, verb_type: VerbType) -> Vec<VerbId> {
        self.by_verb_type.read().get(&verb_type.as_code()).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    pub fn all_verb_ids(&self) -> Vec<VerbId> {
        self.verb_versions.read().keys().copied().collect()
    }

    // ---- Periodic cleanup (§4.8) -----------------------------------------

    /// Physically remove nouns tombstoned longer than
    /// `max_soft_delete_age_us` together with their incident verbs (whose
    /// endpoint is now gone regardless of the verb's own tombstone age),
    /// plus any independently-tombstoned verb past the same age. Returns
    /// `(nouns_removed, verbs_removed)`. Caller (the cleanup task) is
    /// responsible for holding the cluster-wide lease before calling this.
    pub fn purge_expired(&self, now: u64, max_soft_delete_age_us: u64) -> (u64, u64) {
        let _guard = self.write_lock.lock();

        let expired_nouns: Vec<Noun> = self
            .all_noun_ids()
            .into_iter()
            .filter_map(|id| self.get_noun(id, now, true).ok().flatten())
            .filter(|noun| noun.eligible_for_cleanup(now, max_soft_delete_age_us))
            .collect();

        let mut verbs_removed = 0u64;
        for noun in &expired_nouns {
            verbs_removed += self.purge_incident_verbs(noun.id);
            self.purge_noun_record(noun);
        }

        let expired_verbs: Vec<Verb> = self
            .all_verb_ids()
            .into_iter()
            .filter_map(|id| self.get_verb(id, now, true).ok().flatten())
            .filter(|verb| verb.eligible_for_cleanup(now, max_soft_delete_age_us))
            .collect();
        for verb in &expired_verbs {
            self.purge_verb_record(verb);
            verbs_removed += 1;
        }

        if !expired_nouns.is_empty() {
            self.index.write().rebuild(|id| {
                self.get_noun(id, now, true).ok().flatten().map(|n| n.created_at).unwrap_or(0)
            });
        }

        (expired_nouns.len() as u64, verbs_removed)
    }

    fn purge_incident_verbs(&self, noun_id: NounId) -> u64 {
        let ids: BTreeSet<VerbId> = self
            .by_source
            .read()
            .get(&noun_id)
            .into_iter()
            .flatten()
            .chain(self.by_target.read().get(&noun_id).into_iter().flatten())
            .copied()
            .collect();
        let mut removed = 0u64;
        for id in ids {
            if let Ok(Some(verb)) = self.get_verb(id, 0, true) {
                self.purge_verb_record(&verb);
                removed += 1;
            }
        }
        removed
    }

    fn purge_noun_record(&self, noun: &Noun) {
        let id = noun.id;
        let _ = self.storage.delete_blob(&noun_key(self.shard, id));
        self.noun_versions.write().remove(&id);
        self.noun_types.write().remove(&id);
        if let Some(set) = self.noun_ids_by_type.write().get_mut(&noun.noun_type.as_code()) {
            set.remove(&id);
        }
        {
            let mut index = self.metadata_index.write();
            for (field, value) in noun.metadata.iter() {
                index.remove(field, value, id);
            }
        }
        self.index.write().purge(id);
        self.noun_cache.write().invalidate(&id, 0, 0, false);
    }

    fn purge_verb_record(&self, verb: &Verb) {
        let id = verb.id;
        let _ = self.storage.delete_blob(&verb_key(self.shard, id));
        self.verb_versions.write().remove(&id);
        self.verb_endpoints.write().remove(&id);
        if let Some(set) = self.by_source.write().get_mut(&verb.source) {
            set.remove(&id);
        }
        if let Some(set) = self.by_target.write().get_mut(&verb.target) {
            set.remove(&id);
        }
        if let Some(set) = self.by_verb_type.write().get_mut(&verb.verb_type.as_code()) {
            set.remove(&id);
        }
        self.verb_cache.write().invalidate(&id, 0, 0, false);
    }

    // ---- Generic key/value metadata (§4.2 `saveMetadata`/`getMetadata`) -

    pub fn save_metadata(&self, key: &str, value: &[u8]) -> Result<()> {
        self.storage.put_blob(&metadata_blob_key(key), value)
    }

    pub fn get_metadata(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.storage.get_blob(&metadata_blob_key(key))
    }

    // ---- Statistics (§4.2 `saveStatistics`/`getStorageStatus`) ----------

    pub fn storage_status(&self) -> StorageStatus {
        let ids: Vec<NounId> = self.noun_versions.read().keys().copied().collect();
        let noun_count = ids.len() as u64;
        let tombstoned_nouns = ids
            .iter()
            .filter(|id| self.get_noun(**id, 0, true).ok().flatten().is_some_and(|n| n.is_tombstoned()))
            .count() as u64;
        let verb_count = self.verb_versions.read().len() as u64;
        StorageStatus {
            shard: self.shard,
            noun_count,
            tombstoned_nouns,
            verb_count,
            tombstoned_verbs: 0,
            hnsw_size: self.index.read().len() as u64,
            last_seq: self.storage.max_seq(&self.self_node.0).ok().flatten().unwrap_or(0),
        }
    }

    pub fn save_statistics(&self, now: u64) -> Result<()> {
        let status = self.storage_status();
        let bytes = serde_json::to_vec(&status).map_err(|e| Error::StorageFailure(format!("statistics serialize: {e}")))?;
        self.save_metadata(&format!("statistics-{}", self.shard), &bytes)?;
        debug!(shard = %self.shard, now, "statistics snapshot saved");
        Ok(())
    }

    // ---- Read-only accessors for the planner adapters -------------------

    pub(crate) fn index(&self) -> &RwLock<HnswIndex> {
        &self.index
    }

    pub(crate) fn metadata_of(&self, id: NounId) -> Option<Metadata> {
        self.get_noun(id, 0, true).ok().flatten().map(|n| n.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgdb_core::value::MetaValue;
    use vgdb_storage::MemoryAdapter;

    fn db() -> Database {
        Database::open(
            ShardId(0),
            NodeId("n1".into()),
            EngineConfig::default(),
            Arc::new(MemoryAdapter::default()),
        )
        .unwrap()
    }

    fn svc() -> NodeId {
        NodeId("n1".into())
    }

    #[test]
    fn add_then_get_noun_round_trips() {
        let db = db();
        let mut metadata = Metadata::new();
        metadata.insert("category".into(), MetaValue::Str("doc".into()));
        let noun = Noun::new(vec![1.0, 0.0], NounType::Document, metadata, svc(), 100);
        let id = noun.id;
        db.save_noun(noun, None, 100).unwrap();

        let fetched = db.get_noun(id, 100, false).unwrap().unwrap();
        assert_eq!(fetched.noun_type, NounType::Document);
        assert!(db.list_nouns_by_type(NounType::Document).contains(&id));
    }

    #[test]
    fn update_with_stale_version_is_rejected() {
        let db = db();
        let noun = Noun::new(vec![1.0, 0.0], NounType::Concept, Metadata::new(), svc(), 0);
        let id = noun.id;
        db.save_noun(noun.clone(), None, 0).unwrap();

        let err = db.save_noun(noun, Some(99), 10).unwrap_err();
        assert_eq!(err.kind(), "ConcurrencyConflict");
    }

    #[test]
    fn delete_then_restore_round_trips() {
        let db = db();
        let noun = Noun::new(vec![1.0, 0.0], NounType::Concept, Metadata::new(), svc(), 0);
        let id = noun.id;
        db.save_noun(noun, None, 0).unwrap();

        db.delete_noun(id, 10).unwrap();
        assert!(db.get_noun(id, 10, true).unwrap().unwrap().is_tombstoned());

        db.restore_noun(id, 20).unwrap();
        assert!(!db.get_noun(id, 20, true).unwrap().unwrap().is_tombstoned());
    }

    #[test]
    fn deleting_noun_marks_incident_verbs_dangling() {
        let db = db();
        let source = Noun::new(vec![1.0, 0.0], NounType::Person, Metadata::new(), svc(), 0);
        let target = Noun::new(vec![0.0, 1.0], NounType::Person, Metadata::new(), svc(), 0);
        let (source_id, target_id) = (source.id, target.id);
        db.save_noun(source, None, 0).unwrap();
        db.save_noun(target, None, 0).unwrap();

        let verb = Verb::new(source_id, target_id, VerbType::RelatedTo, None, 0.5, 0.9, Metadata::new(), svc(), 0).unwrap();
        let verb_id = verb.id;
        db.save_verb(verb, 0).unwrap();

        db.delete_noun(source_id, 10).unwrap();
        let verb = db.get_verb(verb_id, 10, true).unwrap().unwrap();
        assert!(verb.dangling);
    }

    #[test]
    fn writes_are_rejected_in_read_only_mode() {
        let db = db();
        db.set_mode(OperationalMode::ReadOnly);
        let noun = Noun::new(vec![1.0, 0.0], NounType::Concept, Metadata::new(), svc(), 0);
        let err = db.save_noun(noun, None, 0).unwrap_err();
        assert_eq!(err.kind(), "ModeViolation");
    }

    #[test]
    fn storage_status_counts_reflect_writes() {
        let db = db();
        for i in 0..3 {
            let noun = Noun::new(vec![1.0, 0.0], NounType::Concept, Metadata::new(), svc(), i);
            db.save_noun(noun, None, i).unwrap();
        }
        let status = db.storage_status();
        assert_eq!(status.noun_count, 3);
        assert_eq!(status.hnsw_size, 3);
    }

    #[test]
    fn verbs_by_source_and_target_are_indexed() {
        let db = db();
        let a = Noun::new(vec![1.0, 0.0], NounType::Person, Metadata::new(), svc(), 0);
        let b = Noun::new(vec![0.0, 1.0], NounType::Person, Metadata::new(), svc(), 0);
        let (a_id, b_id) = (a.id, b.id);
        db.save_noun(a, None, 0).unwrap();
        db.save_noun(b, None, 0).unwrap();
        let verb = Verb::new(a_id, b_id, VerbType::RelatedTo, None, 0.5, 0.9, Metadata::new(), svc(), 0).unwrap();
        let verb_id = verb.id;
        db.save_verb(verb, 0).unwrap();

        assert_eq!(db.verbs_by_source(a_id), vec![verb_id]);
        assert_eq!(db.verbs_by_target(b_id), vec![verb_id]);
    }

    #[test]
    fn purge_expired_removes_old_tombstones_and_incident_verbs() {
        let db = db();
        let a = Noun::new(vec![1.0, 0.0], NounType::Person, Metadata::new(), svc(), 0);
        let b = Noun::new(vec![0.0, 1.0], NounType::Person, Metadata::new(), svc(), 0);
        let (a_id, b_id) = (a.id, b.id);
        db.save_noun(a, None, 0).unwrap();
        db.save_noun(b, None, 0).unwrap();
        let verb = Verb::new(a_id, b_id, VerbType::RelatedTo, None, 0.5, 0.9, Metadata::new(), svc(), 0).unwrap();
        let verb_id = verb.id;
        db.save_verb(verb, 0).unwrap();

        db.delete_noun(a_id, 1_000_000).unwrap();

        let (removed_nouns, removed_verbs) = db.purge_expired(1_000_000 + 500_000, 1_000_000);
        assert_eq!((removed_nouns, removed_verbs), (0, 0));

        let (removed_nouns, removed_verbs) = db.purge_expired(1_000_000 + 2_000_000, 1_000_000);
        assert_eq!(removed_nouns, 1);
        assert_eq!(removed_verbs, 1);
        assert!(db.get_noun(a_id, 0, true).unwrap().is_none());
        assert!(db.get_verb(verb_id, 0, true).unwrap().is_none());
        assert!(!db.list_nouns_by_type(NounType::Person).contains(&a_id));
    }

    #[test]
    fn metadata_eq_finds_matching_noun() {
        let db = db();
        let mut metadata = Metadata::new();
        metadata.insert("category".into(), MetaValue::Str("invoice".into()));
        let noun = Noun::new(vec![1.0, 0.0], NounType::Invoice, metadata, svc(), 0);
        let id = noun.id;
        db.save_noun(noun, None, 0).unwrap();

        let matches = db.metadata_eq("category", &MetaValue::Str("invoice".into()));
        assert_eq!(matches, vec![id]);
    }
}
