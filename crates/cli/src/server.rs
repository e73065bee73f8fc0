//! `server` subcommand: runs one node hosting a single shard's
//! [`vgdb_engine::Database`] behind the HTTP control plane.
//!
//! A production deployment hosts every shard assigned to it by the
//! cluster's [`vgdb_core::cluster::ShardLayout`]; this CLI's minimal
//! surface runs shard 0 only (§6 "CLI surface (minimal)") — see
//! DESIGN.md.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;
use vgdb_core::cluster::{NodeCapacity, NodeInfo, NodeStats};
use vgdb_core::{ConsensusRole, EngineConfig, Error, InstanceRole, NodeId, OperationalMode, Result, ShardId};
use vgdb_engine::{AlwaysGranted, AppState, CleanupTask, Database};
use vgdb_storage::FileAdapter;

use crate::env::EnvSettings;

/// Resolved arguments for the `server` subcommand, already merged with
/// environment overrides by `main`.
pub struct ServerSettings {
    pub node_id: NodeId,
    pub role: Option<String>,
    pub http_port: u16,
    pub seeds: Vec<String>,
    pub storage: String,
    pub read_only: bool,
    pub write_only: bool,
}

fn now_us() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_micros() as u64
}

pub async fn run_server(settings: ServerSettings, env: EnvSettings) -> Result<()> {
    let mut config = EngineConfig::default().with_role_env(settings.role.as_deref().or(env.role.as_deref()))?;
    if settings.read_only && settings.write_only {
        return Err(Error::InvalidArgument("--read-only and --write-only are mutually exclusive".into()));
    }
    let mode = if settings.read_only {
        OperationalMode::ReadOnly
    } else if settings.write_only {
        OperationalMode::WriteOnly
    } else {
        OperationalMode::default()
    };

    let storage = Arc::new(FileAdapter::open(settings.storage.clone())?);
    let shard = ShardId(0);
    let db = Arc::new(Database::open(shard, settings.node_id.clone(), config, storage.clone())?);
    db.set_mode(mode);

    let seeds = env.resolve_seeds(&settings.seeds);
    if !seeds.is_empty() {
        info!(?seeds, "resolved peer-discovery seeds");
    }

    let endpoint = env
        .advertised_host()
        .map(|host| format!("http://{host}:{}", settings.http_port))
        .unwrap_or_else(|| format!("http://0.0.0.0:{}", settings.http_port));

    let started = now_us();
    let self_info = NodeInfo {
        id: settings.node_id.clone(),
        endpoint,
        hostname: settings.node_id.0.clone(),
        started,
        last_seen: started,
        role: ConsensusRole::Leader,
        instance_role: instance_role_for(&db),
        shards: vec![shard],
        capacity: NodeCapacity { cpu: num_cpus_hint(), memory_mb: 0 },
        stats: NodeStats::default(),
    };
    let cluster = vgdb_consensus::load_or_bootstrap(storage.as_ref(), self_info, db.config().sharding.shard_count, started)?;

    let state = Arc::new(AppState::new(db.clone(), cluster));
    let cleanup = Arc::new(CleanupTask::new(db.clone(), Arc::new(AlwaysGranted)));
    let cleanup_handle = cleanup.clone().spawn(now_us);

    let addr: SocketAddr = format!("0.0.0.0:{}", settings.http_port)
        .parse()
        .map_err(|e| Error::InvalidArgument(format!("invalid --http-port: {e}")))?;
    info!(%addr, node = %settings.node_id, "starting HTTP control plane");
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| Error::StorageFailure(format!("bind {addr}: {e}")))?;

    axum::serve(listener, vgdb_engine::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::StorageFailure(format!("http server: {e}")))?;

    cleanup.request_shutdown();
    cleanup_handle.abort();
    Ok(())
}

fn instance_role_for(db: &Database) -> InstanceRole {
    db.config().instance_role
}

fn num_cpus_hint() -> u32 {
    std::thread::available_parallelism().map(|n| n.get() as u32).unwrap_or(1)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
