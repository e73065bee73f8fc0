//! Opaque cursor pagination (§4.7 "Cursor pagination").
//!
//! A cursor encodes `{lastScore, lastId, modeFingerprint}` as base64.
//! Given a cursor, results ranking at or before it in the score-descending
//! ordering are skipped, so the next page picks up right after it. A
//! cursor is only valid for the exact query fingerprint it was minted
//! under — a fingerprint mismatch means the caller changed the query
//! between pages, which `vgdb_core::Error::InvalidArgument` surfaces
//! rather than silently reinterpreting the cursor.

use base64::Engine;
use serde::{Deserialize, Serialize};
use vgdb_core::{Error, NounId, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub last_score: f32,
    pub last_id: NounId,
    pub mode_fingerprint: u64,
}

impl Cursor {
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).expect("Cursor serializes infallibly");
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(encoded: &str, expected_fingerprint: u64) -> Result<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| Error::InvalidArgument(format!("malformed cursor: {e}")))?;
        let cursor: Cursor = serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidArgument(format!("malformed cursor: {e}")))?;
        if cursor.mode_fingerprint != expected_fingerprint {
            return Err(Error::InvalidArgument(
                "cursor was minted for a different query".to_string(),
            ));
        }
        Ok(cursor)
    }

    /// Whether `(score, id)` ranks at or before this cursor's position in
    /// the score-descending, id-ascending-tiebreak ordering the planner
    /// ranks results by — i.e. it belongs on a page already served.
    pub fn should_skip(&self, score: f32, id: NounId) -> bool {
        score > self.last_score || (score == self.last_score && id <= self.last_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips_through_encoding() {
        let cursor = Cursor { last_score: 0.75, last_id: NounId::new(), mode_fingerprint: 42 };
        let encoded = cursor.encode();
        let decoded = Cursor::decode(&encoded, 42).unwrap();
        assert_eq!(cursor, decoded);
    }

    #[test]
    fn fingerprint_mismatch_is_rejected() {
        let cursor = Cursor { last_score: 0.5, last_id: NounId::new(), mode_fingerprint: 1 };
        let encoded = cursor.encode();
        assert!(Cursor::decode(&encoded, 2).is_err());
    }

    #[test]
    fn should_skip_items_at_or_before_cursor_position() {
        let id = NounId::new();
        let (lo, hi) = {
            let other = NounId::new();
            if other < id { (other, id) } else { (id, other) }
        };
        let cursor = Cursor { last_score: 0.5, last_id: hi, mode_fingerprint: 0 };
        // Same score, lower-or-equal id: already served.
        assert!(cursor.should_skip(0.5, lo));
        assert!(cursor.should_skip(0.5, hi));
        // Higher score: ranks before the cursor, already served.
        assert!(cursor.should_skip(0.9, NounId::new()));
        // Lower score: belongs on the next page.
        assert!(!cursor.should_skip(0.3, NounId::new()));
    }
}
