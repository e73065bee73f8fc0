//! `GET /health` and `GET /peers` response shapes (§6).

use serde::{Deserialize, Serialize};
use vgdb_core::cluster::NodeInfo;
use vgdb_core::NodeId;

/// `GET /health` → `{status, nodeId, uptime, memory, connections}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub node_id: NodeId,
    /// Microseconds since process start.
    pub uptime_us: u64,
    pub memory_mb: u64,
    pub connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Unhealthy,
}

/// `GET /peers` → this node's info plus known peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeersReport {
    pub self_info: NodeInfo,
    pub peers: Vec<NodeInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_report_round_trips() {
        let report = HealthReport {
            status: HealthStatus::Ok,
            node_id: NodeId("a".into()),
            uptime_us: 5_000,
            memory_mb: 256,
            connections: 3,
        };
        let json = serde_json::to_string(&report).unwrap();
        let decoded: HealthReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, decoded);
    }
}
