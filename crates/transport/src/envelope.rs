//! HTTP control-plane RPC envelope: `POST /rpc` (§6 "Wire protocol").
//!
//! A thin, explicit struct pair rather than a generic JSON-RPC
//! library, since the message set here is small and fixed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vgdb_core::NodeId;

/// `{id, method, params, timestamp, from, to?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: String,
    pub method: String,
    pub params: Value,
    pub timestamp: u64,
    pub from: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<NodeId>,
}

/// `{code, message, data?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// `{id, result?, error?, timestamp}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub timestamp: u64,
}

impl RpcResponse {
    pub fn success(id: impl Into<String>, result: Value, timestamp: u64) -> Self {
        Self { id: id.into(), result: Some(result), error: None, timestamp }
    }

    pub fn failure(id: impl Into<String>, error: RpcError, timestamp: u64) -> Self {
        Self { id: id.into(), result: None, error: Some(error), timestamp }
    }
}
