//! Engine configuration, loaded from `vgdb.toml` and overridden by the
//! environment variables recognized in §6.
//!
//! A single `serde`-deserializable struct with `Default` plus named
//! field overrides, rather than a sprawling builder.

use crate::enums::InstanceRole;
use serde::{Deserialize, Serialize};

fn default_m() -> usize {
    16
}
fn default_ef_construction() -> usize {
    200
}
fn default_ef_search() -> usize {
    50
}
fn default_hot_cache_max_size() -> usize {
    10_000
}
fn default_hot_cache_eviction_threshold() -> f64 {
    0.9
}
fn default_warm_cache_ttl_us() -> u64 {
    5 * 60 * 1_000_000
}
fn default_auto_tune_interval_us() -> u64 {
    60 * 1_000_000
}
fn default_sync_interval_us() -> u64 {
    1_000_000
}
fn default_max_sync_batch_size() -> usize {
    256
}
fn default_cleanup_interval_us() -> u64 {
    15 * 60 * 1_000_000
}
fn default_max_soft_delete_age_us() -> u64 {
    60 * 60 * 1_000_000
}
fn default_replication_factor() -> u32 {
    1
}
fn default_shard_count() -> u32 {
    16
}
fn default_node_timeout_us() -> u64 {
    30_000_000
}
fn default_migration_batch_size() -> usize {
    1000
}
fn default_migration_max_retries() -> u32 {
    3
}
fn default_migration_delete_delay_us() -> u64 {
    60 * 60 * 1_000_000
}
fn default_request_timeout_us() -> u64 {
    30_000_000
}

/// Vector-index configuration (§4.1 "Parameters").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HnswSettings {
    #[serde(default = "default_m")]
    pub m: usize,
    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,
    #[serde(default = "default_ef_search")]
    pub ef_search: usize,
}

impl Default for HnswSettings {
    fn default() -> Self {
        Self {
            m: default_m(),
            ef_construction: default_ef_construction(),
            ef_search: default_ef_search(),
        }
    }
}

/// Multi-tier cache configuration (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheSettings {
    #[serde(default = "default_hot_cache_max_size")]
    pub hot_cache_max_size: usize,
    #[serde(default = "default_hot_cache_eviction_threshold")]
    pub hot_cache_eviction_threshold: f64,
    #[serde(default = "default_warm_cache_ttl_us")]
    pub warm_cache_ttl_us: u64,
    #[serde(default = "default_auto_tune_interval_us")]
    pub auto_tune_interval_us: u64,
    #[serde(default = "default_sync_interval_us")]
    pub sync_interval_us: u64,
    #[serde(default = "default_max_sync_batch_size")]
    pub max_sync_batch_size: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            hot_cache_max_size: default_hot_cache_max_size(),
            hot_cache_eviction_threshold: default_hot_cache_eviction_threshold(),
            warm_cache_ttl_us: default_warm_cache_ttl_us(),
            auto_tune_interval_us: default_auto_tune_interval_us(),
            sync_interval_us: default_sync_interval_us(),
            max_sync_batch_size: default_max_sync_batch_size(),
        }
    }
}

/// Soft-delete / cleanup configuration (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CleanupSettings {
    #[serde(default = "default_cleanup_interval_us")]
    pub cleanup_interval_us: u64,
    #[serde(default = "default_max_soft_delete_age_us")]
    pub max_soft_delete_age_us: u64,
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            cleanup_interval_us: default_cleanup_interval_us(),
            max_soft_delete_age_us: default_max_soft_delete_age_us(),
        }
    }
}

/// Sharding / replication configuration (§3, §4.4, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShardingSettings {
    #[serde(default = "default_shard_count")]
    pub shard_count: u32,
    #[serde(default = "default_replication_factor")]
    pub replication_factor: u32,
    #[serde(default = "default_node_timeout_us")]
    pub node_timeout_us: u64,
}

impl Default for ShardingSettings {
    fn default() -> Self {
        Self {
            shard_count: default_shard_count(),
            replication_factor: default_replication_factor(),
            node_timeout_us: default_node_timeout_us(),
        }
    }
}

/// Shard-migration configuration (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationSettings {
    #[serde(default = "default_migration_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_migration_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_migration_delete_delay_us")]
    pub delete_delay_us: u64,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            batch_size: default_migration_batch_size(),
            max_retries: default_migration_max_retries(),
            delete_delay_us: default_migration_delete_delay_us(),
        }
    }
}

/// Retry policy applied to retryable errors (§5, §7).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_us: u64,
    pub max_delay_us: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_us: 100_000,
            max_delay_us: 5_000_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Top-level engine configuration, loadable from `vgdb.toml` and
/// overridden by the environment variables in §6.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    pub instance_role: InstanceRole,
    #[serde(default)]
    pub hnsw: HnswSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub cleanup: CleanupSettings,
    #[serde(default)]
    pub sharding: ShardingSettings,
    #[serde(default)]
    pub migration: MigrationSettings,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default = "default_request_timeout_us")]
    pub request_timeout_us: u64,
    /// Use the "lowest-id-wins" simplified coordinator instead of full
    /// Raft (§9 Design Notes, REDESIGN FLAGS). Dev-only; never the
    /// default in a real deployment.
    #[serde(default)]
    pub dev_simple_coordinator: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instance_role: InstanceRole::default(),
            hnsw: HnswSettings::default(),
            cache: CacheSettings::default(),
            cleanup: CleanupSettings::default(),
            sharding: ShardingSettings::default(),
            migration: MigrationSettings::default(),
            retry: RetryPolicy::default(),
            request_timeout_us: default_request_timeout_us(),
            dev_simple_coordinator: false,
        }
    }
}

impl EngineConfig {
    /// Parse from a `vgdb.toml` document.
    pub fn from_toml(s: &str) -> crate::Result<Self> {
        toml::from_str(s)
            .map_err(|e| crate::Error::InvalidArgument(format!("invalid vgdb.toml: {e}")))
    }

    /// Apply the `VGDB_ROLE` environment variable (§6), rejecting any
    /// value other than `writer|reader|hybrid`.
    pub fn with_role_env(mut self, raw: Option<&str>) -> crate::Result<Self> {
        if let Some(raw) = raw {
            self.instance_role = match raw {
                "writer" => InstanceRole::Writer,
                "reader" => InstanceRole::Reader,
                "hybrid" => InstanceRole::Hybrid,
                other => {
                    return Err(crate::Error::InvalidArgument(format!(
                        "VGDB_ROLE must be one of writer|reader|hybrid, got {other:?}"
                    )))
                }
            };
        }
        Ok(self)
    }
}
