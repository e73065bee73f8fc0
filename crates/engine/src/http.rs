//! HTTP control plane: `/health`, `/peers`, `/rpc`, `/events`,
//! `/stream/{streamId}` (§6 "Wire protocol").
//!
//! Routes here are shaped after control-plane handlers elsewhere in
//! the ecosystem (typed `Json<_>` extractors, one function per
//! route) and the envelopes defined in `vgdb-transport`.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Path, State};
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, Stream};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::warn;

use vgdb_core::cluster::{ClusterConfig, NodeInfo};
use vgdb_core::{Error, Noun, Verb};
use vgdb_transport::sse::{heartbeat_frame, BroadcastEvent, SSE_HEARTBEAT_INTERVAL_US};
use vgdb_transport::stream::{decode_body, StreamItemType};
use vgdb_transport::{HealthReport, HealthStatus, PeersReport, RpcError, RpcRequest, RpcResponse};

use crate::database::Database;

fn now_us() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_micros() as u64
}

fn error_code(err: &Error) -> &'static str {
    err.kind()
}

/// Shared state handed to every axum handler.
pub struct AppState {
    pub db: Arc<Database>,
    pub cluster: RwLock<ClusterConfig>,
    pub started_at: u64,
    events: broadcast::Sender<BroadcastEvent>,
}

impl AppState {
    pub fn new(db: Arc<Database>, cluster: ClusterConfig) -> Self {
        let (events, _) = broadcast::channel(256);
        Self { db, cluster: RwLock::new(cluster), started_at: now_us(), events }
    }

    /// Publish a broadcast event to every connected `/events` listener.
    /// Dropped silently if nobody is subscribed.
    pub fn publish(&self, event: BroadcastEvent) {
        let _ = self.events.send(event);
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/peers", get(peers))
        .route("/rpc", post(rpc))
        .route("/events", get(events))
        .route("/stream/:stream_id", post(stream_upload))
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    let status = state.db.storage_status();
    let self_node = state.cluster.read().nodes.get(&state.db.self_node()).cloned();
    let connections = state.events.receiver_count() as u32;
    Json(HealthReport {
        status: if status.last_seq > 0 || status.noun_count == 0 { HealthStatus::Ok } else { HealthStatus::Degraded },
        node_id: self_node.map(|n| n.id).unwrap_or_else(|| state.db.self_node()),
        uptime_us: now_us().saturating_sub(state.started_at),
        memory_mb: 0,
        connections,
    })
}

async fn peers(State(state): State<Arc<AppState>>) -> Json<PeersReport> {
    let cluster = state.cluster.read();
    let self_id = state.db.self_node();
    let self_info = cluster.nodes.get(&self_id).cloned().unwrap_or_else(|| NodeInfo {
        id: self_id,
        endpoint: String::new(),
        hostname: String::new(),
        started: state.started_at,
        last_seen: now_us(),
        role: vgdb_core::cluster::ConsensusRole::Follower,
        instance_role: vgdb_core::InstanceRole::Hybrid,
        shards: vec![state.db.shard()],
        capacity: vgdb_core::cluster::NodeCapacity { cpu: 0, memory_mb: 0 },
        stats: vgdb_core::cluster::NodeStats::default(),
    });
    let peers = cluster.nodes.values().filter(|n| n.id != self_info.id).cloned().collect();
    Json(PeersReport { self_info, peers })
}

/// Dispatches the small fixed method set this node answers directly
/// (cluster-wide methods like `migration.*` are handled by the CLI's
/// driver, not this endpoint).
async fn rpc(State(state): State<Arc<AppState>>, Json(request): Json<RpcRequest>) -> Json<RpcResponse> {
    let now = now_us();
    let result = match request.method.as_str() {
        "ping" => Ok(Value::String("pong".into())),
        "storage.status" => serde_json::to_value(state.db.storage_status()).map_err(|e| Error::InvalidArgument(e.to_string())),
        "noun.get" => dispatch_noun_get(&state, &request.params, now),
        other => Err(Error::InvalidArgument(format!("unknown method: {other}"))),
    };
    Json(match result {
        Ok(value) => RpcResponse::success(request.id, value, now),
        Err(err) => {
            warn!(method = %request.method, error = %err, "rpc call failed");
            RpcResponse::failure(request.id, RpcError { code: error_code(&err).into(), message: err.to_string(), data: None }, now)
        }
    })
}

fn dispatch_noun_get(state: &AppState, params: &Value, now: u64) -> Result<Value, Error> {
    let id_str = params.get("id").and_then(Value::as_str).ok_or_else(|| Error::InvalidArgument("missing id".into()))?;
    let id = vgdb_core::NounId::parse(id_str).ok_or_else(|| Error::InvalidArgument("malformed id".into()))?;
    let noun = state.db.get_noun(id, now, false)?;
    serde_json::to_value(noun).map_err(|e| Error::InvalidArgument(e.to_string()))
}

type SseItem = Result<Event, Infallible>;

/// `GET /events`: a heartbeat frame every `SSE_HEARTBEAT_INTERVAL_US`
/// interleaved with broadcast events as they are published.
async fn events(State(state): State<Arc<AppState>>) -> Sse<impl Stream<Item = SseItem>> {
    let receiver = state.events.subscribe();
    let heartbeat = stream::unfold((), |_| async {
        tokio::time::sleep(std::time::Duration::from_micros(SSE_HEARTBEAT_INTERVAL_US)).await;
        let item: SseItem = Ok(Event::default().data(heartbeat_frame()));
        Some((item, ()))
    });
    let broadcasts = stream::unfold(receiver, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let item: SseItem = Ok(Event::default().event(event.event.clone()).data(event.to_sse_frame()));
                    return Some((item, rx));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    });
    Sse::new(stream::select(heartbeat, broadcasts))
}

/// `POST /stream/{streamId}`: a batch of `StreamItem`s from the shard-
/// migration driver (§4.6 step 3). `stream_id` currently only appears in
/// logs — batches are applied directly rather than buffered per stream,
/// since the migration driver sends them already ordered.
async fn stream_upload(
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<String>,
    body: String,
) -> (axum::http::StatusCode, String) {
    let now = now_us();
    let items = match decode_body(&body) {
        Ok(items) => items,
        Err(err) => return (axum::http::StatusCode::BAD_REQUEST, err.to_string()),
    };
    let mut applied = 0usize;
    for item in items {
        let outcome = match item.item_type {
            StreamItemType::Noun => serde_json::from_value::<Noun>(item.data)
                .map_err(|e| Error::InvalidArgument(e.to_string()))
                .and_then(|noun| state.db.save_noun(noun, None, now)),
            StreamItemType::Verb => serde_json::from_value::<Verb>(item.data)
                .map_err(|e| Error::InvalidArgument(e.to_string()))
                .and_then(|verb| state.db.save_verb(verb, now)),
        };
        match outcome {
            Ok(_) => applied += 1,
            Err(err) => {
                warn!(stream_id = %stream_id, error = %err, "shard-migration stream item rejected");
                return (axum::http::StatusCode::UNPROCESSABLE_ENTITY, err.to_string());
            }
        }
    }
    (axum::http::StatusCode::OK, applied.to_string())
}
