//! Storage adapter trait (§4.2 "Storage adapter interface").
//!
//! A storage adapter is the one seam between the engine and wherever bytes
//! actually live — local disk, an in-memory map for tests, or an object
//! store. Every adapter exposes the same small surface: blob get/put/list
//! plus the append-only change log built on top of it, splitting a raw
//! byte store from the change-log abstraction built over it.

use vgdb_core::change::ChangeEvent;
use vgdb_core::Result;

/// A storage adapter backing one node's durable state.
pub trait StorageAdapter: Send + Sync {
    /// Read a named blob (e.g. `"_cluster/config.json"`).
    fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a named blob, replacing any prior value.
    fn put_blob(&self, key: &str, value: &[u8]) -> Result<()>;

    /// List blob keys under `prefix`.
    fn list_blobs(&self, prefix: &str) -> Result<Vec<String>>;

    /// Delete a blob. No-op if absent.
    fn delete_blob(&self, key: &str) -> Result<()>;

    /// Append a change-log record for `writer`. Returns the assigned
    /// `seq` (§3 invariant: strictly increasing per writer).
    fn append_change(&self, writer: &str, event: &ChangeEvent) -> Result<()>;

    /// Read all change-log records for `writer` with `seq > since`, in
    /// ascending `seq` order.
    fn read_changes_since(&self, writer: &str, since: u64) -> Result<Vec<ChangeEvent>>;

    /// Highest `seq` previously appended for `writer`, or `None` if the
    /// writer has never appended (used to resume a [`vgdb_core::change::SeqAllocator`]
    /// after a restart).
    fn max_seq(&self, writer: &str) -> Result<Option<u64>>;
}
