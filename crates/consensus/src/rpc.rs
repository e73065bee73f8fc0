//! Consensus RPC messages (§4.5 "Election protocol").
//!
//! Entries themselves travel over the storage-backed change log (§4.2);
//! `AppendEntries` here carries only the heartbeat — `entries` is reserved
//! for a future log-replication mode and is always empty today.

use serde::{Deserialize, Serialize};
use vgdb_core::NodeId;

pub type Term = u64;

/// Sent by a candidate to solicit votes for the current term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestVote {
    pub term: Term,
    pub candidate_id: NodeId,
    pub last_log_seq: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestVoteResponse {
    pub term: Term,
    pub vote_granted: bool,
}

/// Leader heartbeat / (reserved) log-replication RPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendEntries {
    pub term: Term,
    pub leader_id: NodeId,
    /// Reserved for future log-replication; always empty in this mode.
    pub entries: Vec<()>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendEntriesResponse {
    pub term: Term,
    pub success: bool,
}
