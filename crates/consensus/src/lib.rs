//! Leader election, storage-based cluster discovery, and the dev-only
//! simplified coordinator (§4.5).

#![warn(clippy::all)]

pub mod dev_coordinator;
pub mod discovery;
pub mod election;
pub mod rpc;

pub use dev_coordinator::{elect_lowest_id, refresh_leader};
pub use discovery::{load_or_bootstrap, reap_dead_nodes, upsert_node, write_config};
pub use election::ConsensusNode;
pub use rpc::{AppendEntries, AppendEntriesResponse, RequestVote, RequestVoteResponse, Term};
