//! Server-sent-event stream framing (§6 "Server-Sent-Event stream").
//!
//! `GET /events` keeps a pinned connection; the server writes `: ping\n\n`
//! every `heartbeat_interval` and `data: {...}\n\n` frames for broadcasts.
//! This module only formats frames — the actual connection lives in the
//! engine/HTTP layer, outside this crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default heartbeat interval, matching `SSE_HEARTBEAT_INTERVAL` (§6).
pub const SSE_HEARTBEAT_INTERVAL_US: u64 = 15_000_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastEvent {
    pub event: String,
    pub data: Value,
    pub timestamp: u64,
}

impl BroadcastEvent {
    /// Render as an SSE `data:` frame, terminated by a blank line.
    pub fn to_sse_frame(&self) -> String {
        format!("data: {}\n\n", serde_json::to_string(self).expect("BroadcastEvent serializes infallibly"))
    }
}

/// The comment-form heartbeat frame sent on the interval.
pub fn heartbeat_frame() -> &'static str {
    ": ping\n\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_event_frames_end_with_blank_line() {
        let event = BroadcastEvent {
            event: "shard.migrated".into(),
            data: serde_json::json!({"shard": 1}),
            timestamp: 42,
        };
        let frame = event.to_sse_frame();
        assert!(frame.starts_with("data: "));
        assert!(frame.ends_with("\n\n"));
    }

    #[test]
    fn heartbeat_frame_is_a_comment() {
        assert_eq!(heartbeat_frame(), ": ping\n\n");
    }
}
