//! Wire envelopes for the HTTP control plane, SSE stream, shard-migration
//! streaming endpoint, and the optional WebSocket consensus channel (§6).

#![warn(clippy::all)]

pub mod envelope;
pub mod health;
pub mod layout;
pub mod sse;
pub mod stream;
pub mod websocket;

pub use envelope::{RpcError, RpcRequest, RpcResponse};
pub use health::{HealthReport, HealthStatus, PeersReport};
pub use sse::{BroadcastEvent, SSE_HEARTBEAT_INTERVAL_US};
pub use stream::{StreamItem, StreamItemType};
pub use websocket::{WsFrame, WsPayload};
