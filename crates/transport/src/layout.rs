//! Persisted storage-adapter key layout (§6 "Persisted layout").

use vgdb_core::ShardId;

/// `vectors/pNNN/...` for noun partitions.
pub fn vector_partition_prefix(shard: ShardId) -> String {
    format!("vectors/p{:03}/", shard.0)
}

pub const CLUSTER_CONFIG_KEY: &str = "_cluster/config.json";

/// `_cluster/nodes/<nodeId>.json` node heartbeat file.
pub fn node_heartbeat_key(node_id: &vgdb_core::NodeId) -> String {
    format!("_cluster/nodes/{}.json", node_id.0)
}

/// `_cluster/registry.json` flat list of known node ids.
pub const NODE_REGISTRY_KEY: &str = "_cluster/registry.json";

/// Legacy path, migrated to [`CLUSTER_CONFIG_KEY`] on first write (§6,
/// Open Question resolution in DESIGN.md).
pub const LEGACY_CLUSTER_CONFIG_KEY: &str = "_system/distributed_config.json";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_partition_prefix_is_zero_padded() {
        assert_eq!(vector_partition_prefix(ShardId(7)), "vectors/p007/");
        assert_eq!(vector_partition_prefix(ShardId(123)), "vectors/p123/");
    }

    #[test]
    fn node_heartbeat_key_embeds_node_id() {
        let key = node_heartbeat_key(&vgdb_core::NodeId("n1".into()));
        assert_eq!(key, "_cluster/nodes/n1.json");
    }
}
