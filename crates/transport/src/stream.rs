//! `POST /stream/{streamId}` shard-migration upload framing (§6, §4.6).
//!
//! Body is a framed sequence of JSON objects `{type, data}`. This mirrors
//! the migration driver's batch-at-a-time shape: the destination decodes
//! one `StreamItem` per line and tallies nouns/verbs as it goes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamItemType {
    Noun,
    Verb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamItem {
    #[serde(rename = "type")]
    pub item_type: StreamItemType,
    pub data: Value,
}

/// Decode one newline-delimited-JSON body into its items. A malformed
/// line fails the whole batch rather than silently dropping an item —
/// migration validation depends on an exact received count (§4.6 step 3).
pub fn decode_body(body: &str) -> Result<Vec<StreamItem>, serde_json::Error> {
    body.lines().filter(|line| !line.trim().is_empty()).map(serde_json::from_str).collect()
}

/// Encode items as a newline-delimited-JSON body.
pub fn encode_body(items: &[StreamItem]) -> String {
    items
        .iter()
        .map(|item| serde_json::to_string(item).expect("StreamItem serializes infallibly"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_round_trips_through_encode_decode() {
        let items = vec![
            StreamItem { item_type: StreamItemType::Noun, data: serde_json::json!({"id": "n1"}) },
            StreamItem { item_type: StreamItemType::Verb, data: serde_json::json!({"id": "v1"}) },
        ];
        let body = encode_body(&items);
        let decoded = decode_body(&body).unwrap();
        assert_eq!(decoded, items);
    }

    #[test]
    fn malformed_line_fails_whole_batch() {
        let body = "{\"type\":\"noun\",\"data\":{}}\nnot json";
        assert!(decode_body(body).is_err());
    }
}
