//! Top-level database tying the index, storage, cache, partition,
//! planner, and cluster crates together into one running node (§3, §4,
//! §6).

#![warn(clippy::all)]

pub mod adapters;
pub mod cleanup;
pub mod database;
pub mod http;
pub mod replication;
pub mod status;

pub use adapters::{DatabaseSources, Embedder, HashEmbedder};
pub use cleanup::{AlwaysGranted, CleanupLease, CleanupStats, CleanupTask, ConsensusLease};
pub use database::Database;
pub use http::{router, AppState};
pub use replication::{may_serve_from_replica, ReadPreference, ReplicaSync, ReplicationEntry, ReplicationLog};
pub use status::StorageStatus;
