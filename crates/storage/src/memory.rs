//! In-memory storage adapter — the default for tests and single-process
//! development.

use std::collections::BTreeMap;

use dashmap::DashMap;
use parking_lot::Mutex;
use vgdb_core::change::ChangeEvent;
use vgdb_core::Result;

use crate::adapter::StorageAdapter;

/// Storage adapter holding everything in process memory. Nothing survives
/// a restart; intended for tests and local development, never production.
#[derive(Default)]
pub struct MemoryAdapter {
    blobs: DashMap<String, Vec<u8>>,
    changes: Mutex<BTreeMap<String, Vec<ChangeEvent>>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageAdapter for MemoryAdapter {
    fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.get(key).map(|v| v.clone()))
    }

    fn put_blob(&self, key: &str, value: &[u8]) -> Result<()> {
        self.blobs.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn list_blobs(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .blobs
            .iter()
            .map(|e| e.key().clone())
            .filter(|k| k.starts_with(prefix))
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn delete_blob(&self, key: &str) -> Result<()> {
        self.blobs.remove(key);
        Ok(())
    }

    fn append_change(&self, writer: &str, event: &ChangeEvent) -> Result<()> {
        let mut changes = self.changes.lock();
        let log = changes.entry(writer.to_string()).or_default();
        if let Some(last) = log.last() {
            debug_assert!(event.seq > last.seq, "change log seq must strictly increase");
        }
        log.push(event.clone());
        Ok(())
    }

    fn read_changes_since(&self, writer: &str, since: u64) -> Result<Vec<ChangeEvent>> {
        let changes = self.changes.lock();
        Ok(changes
            .get(writer)
            .map(|log| log.iter().filter(|e| e.seq > since).cloned().collect())
            .unwrap_or_default())
    }

    fn max_seq(&self, writer: &str) -> Result<Option<u64>> {
        let changes = self.changes.lock();
        Ok(changes.get(writer).and_then(|log| log.last()).map(|e| e.seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgdb_core::change::{ChangeOp, EntityKind};

    fn event(seq: u64) -> ChangeEvent {
        ChangeEvent::new(seq, ChangeOp::Add, EntityKind::Noun, "n1".into(), 1, 0)
    }

    #[test]
    fn blob_round_trips() {
        let adapter = MemoryAdapter::new();
        adapter.put_blob("k", b"v").unwrap();
        assert_eq!(adapter.get_blob("k").unwrap(), Some(b"v".to_vec()));
        adapter.delete_blob("k").unwrap();
        assert_eq!(adapter.get_blob("k").unwrap(), None);
    }

    #[test]
    fn changes_filtered_by_since() {
        let adapter = MemoryAdapter::new();
        for seq in 1..=5 {
            adapter.append_change("writer-a", &event(seq)).unwrap();
        }
        let recent = adapter.read_changes_since("writer-a", 3).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(adapter.max_seq("writer-a").unwrap(), Some(5));
    }

    #[test]
    fn list_blobs_respects_prefix() {
        let adapter = MemoryAdapter::new();
        adapter.put_blob("a/1", b"x").unwrap();
        adapter.put_blob("a/2", b"y").unwrap();
        adapter.put_blob("b/1", b"z").unwrap();
        let keys = adapter.list_blobs("a/").unwrap();
        assert_eq!(keys, vec!["a/1".to_string(), "a/2".to_string()]);
    }
}
