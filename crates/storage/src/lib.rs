//! Pluggable storage adapters and the append-only change log (§4.2).

pub mod adapter;
pub mod file;
pub mod memory;
pub mod object;

pub use adapter::StorageAdapter;
pub use file::FileAdapter;
pub use memory::MemoryAdapter;
pub use object::{Bucket, ObjectStorageAdapter};
