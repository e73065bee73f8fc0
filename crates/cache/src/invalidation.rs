//! Distributed cache invalidation (§4.3 "Distributed invalidation").
//!
//! When a writer mutates a noun/verb, it publishes an invalidation message
//! so every other node's hot/warm tiers drop their copy rather than
//! serving a stale version until TTL expiry.

use serde::{Deserialize, Serialize};
use vgdb_core::NodeId;

/// Broadcast when `key` at `version` should be dropped from every peer's
/// cache tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidationMessage {
    pub key: String,
    pub version: u64,
    pub origin: NodeId,
    pub timestamp: u64,
}

impl InvalidationMessage {
    pub fn new(key: impl Into<String>, version: u64, origin: NodeId, timestamp: u64) -> Self {
        Self { key: key.into(), version, origin, timestamp }
    }
}

/// Transport for invalidation messages, implemented by the cluster's RPC
/// layer ([`vgdb_transport`] in the full engine).
pub trait InvalidationBus: Send + Sync {
    fn publish(&self, message: InvalidationMessage);
}

/// A bus that drops every message — used where invalidation is a no-op,
/// e.g. a single-node deployment.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullInvalidationBus;

impl InvalidationBus for NullInvalidationBus {
    fn publish(&self, _message: InvalidationMessage) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_bus_accepts_any_message_without_panicking() {
        let bus = NullInvalidationBus;
        bus.publish(InvalidationMessage::new("k", 1, NodeId("n".into()), 0));
    }
}
