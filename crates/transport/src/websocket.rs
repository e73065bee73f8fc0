//! Optional WebSocket path: consensus messages ride a binary JSON frame
//! (§6 "Optional WebSocket path").

use serde::{Deserialize, Serialize};
use vgdb_consensus::{AppendEntries, AppendEntriesResponse, RequestVote, RequestVoteResponse};
use vgdb_core::NodeId;

/// The payload carried by a [`WsFrame`]. `Handshake` has no consensus
/// analogue; it is the first frame a peer sends on connect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WsPayload {
    RequestVote(RequestVote),
    VoteResponse(RequestVoteResponse),
    AppendEntries(AppendEntries),
    AppendResponse(AppendEntriesResponse),
    Heartbeat,
    Handshake { node_id: NodeId },
}

/// `{type, from, to?, data, timestamp, id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsFrame {
    pub from: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<NodeId>,
    pub data: WsPayload,
    pub timestamp: u64,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trips_through_json() {
        let frame = WsFrame {
            from: NodeId("a".into()),
            to: Some(NodeId("b".into())),
            data: WsPayload::Heartbeat,
            timestamp: 10,
            id: "f1".into(),
        };
        let json = serde_json::to_string(&frame).unwrap();
        let decoded: WsFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(frame, decoded);
    }

    #[test]
    fn request_vote_payload_tags_correctly() {
        let payload = WsPayload::RequestVote(RequestVote {
            term: 1,
            candidate_id: NodeId("a".into()),
            last_log_seq: 0,
        });
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"requestVote\""));
    }
}
