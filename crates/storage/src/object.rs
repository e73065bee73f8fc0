//! Object-storage-backed adapter (§4.2 "Object storage adapter").
//!
//! `Bucket` is the seam to whatever object store a deployment uses (S3,
//! GCS, an internal blob service); `ObjectStorageAdapter` layers the
//! change-log framing from [`crate::file`] on top of it so the engine
//! never has to know which backend it is talking to. No concrete object
//! store client is vendored here — a deployment wires in its own `Bucket`
//! impl against whatever SDK it already depends on.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use parking_lot::Mutex;
use std::io::Cursor;
use vgdb_core::change::ChangeEvent;
use vgdb_core::{Error, Result};

use crate::adapter::StorageAdapter;

/// Minimal object-store operations an `ObjectStorageAdapter` needs.
pub trait Bucket: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;
    fn list(&self, prefix: &str) -> Result<Vec<String>>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// Storage adapter over an arbitrary [`Bucket`]. Change-log records are
/// appended by read-modify-write on a single object per writer — object
/// stores rarely offer true append, so unlike [`crate::file::FileAdapter`]
/// each append pays for a full re-read (acceptable: change logs are
/// per-writer and bounded by cleanup).
pub struct ObjectStorageAdapter<B: Bucket> {
    bucket: B,
    append_lock: Mutex<()>,
}

impl<B: Bucket> ObjectStorageAdapter<B> {
    pub fn new(bucket: B) -> Self {
        Self { bucket, append_lock: Mutex::new(()) }
    }

    fn change_key(writer: &str) -> String {
        format!("_changes/{writer}.log")
    }

    fn decode_changes(bytes: &[u8]) -> Result<Vec<ChangeEvent>> {
        let mut cursor = Cursor::new(bytes);
        let mut events = Vec::new();
        while (cursor.position() as usize) < bytes.len() {
            let len = cursor
                .read_u32::<LittleEndian>()
                .map_err(|e| Error::StorageFailure(format!("corrupt change log: {e}")))?;
            let start = cursor.position() as usize;
            let end = start + len as usize;
            let event: ChangeEvent = rmp_serde::from_slice(&bytes[start..end])
                .map_err(|e| Error::StorageFailure(format!("corrupt change log record: {e}")))?;
            events.push(event);
            cursor.set_position(end as u64);
        }
        Ok(events)
    }

    fn encode_changes(events: &[ChangeEvent]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for event in events {
            let payload = rmp_serde::to_vec(event)
                .map_err(|e| Error::StorageFailure(format!("failed to encode change event: {e}")))?;
            out.write_u32::<LittleEndian>(payload.len() as u32)
                .map_err(|e| Error::StorageFailure(e.to_string()))?;
            out.extend_from_slice(&payload);
        }
        Ok(out)
    }
}

impl<B: Bucket> StorageAdapter for ObjectStorageAdapter<B> {
    fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.bucket.get(key)
    }

    fn put_blob(&self, key: &str, value: &[u8]) -> Result<()> {
        self.bucket.put(key, value)
    }

    fn list_blobs(&self, prefix: &str) -> Result<Vec<String>> {
        self.bucket.list(prefix)
    }

    fn delete_blob(&self, key: &str) -> Result<()> {
        self.bucket.delete(key)
    }

    fn append_change(&self, writer: &str, event: &ChangeEvent) -> Result<()> {
        let _guard = self.append_lock.lock();
        let key = Self::change_key(writer);
        let mut events = match self.bucket.get(&key)? {
            Some(bytes) => Self::decode_changes(&bytes)?,
            None => Vec::new(),
        };
        if let Some(last) = events.last() {
            debug_assert!(event.seq > last.seq, "change log seq must strictly increase");
        }
        events.push(event.clone());
        let bytes = Self::encode_changes(&events)?;
        self.bucket.put(&key, &bytes)
    }

    fn read_changes_since(&self, writer: &str, since: u64) -> Result<Vec<ChangeEvent>> {
        let key = Self::change_key(writer);
        let events = match self.bucket.get(&key)? {
            Some(bytes) => Self::decode_changes(&bytes)?,
            None => return Ok(Vec::new()),
        };
        Ok(events.into_iter().filter(|e| e.seq > since).collect())
    }

    fn max_seq(&self, writer: &str) -> Result<Option<u64>> {
        let key = Self::change_key(writer);
        match self.bucket.get(&key)? {
            Some(bytes) => Ok(Self::decode_changes(&bytes)?.last().map(|e| e.seq)),
            None => Ok(None),
        }
    }
}
