//! Periodic soft-delete sweep (§4.8).
//!
//! Wakes every `cleanupInterval`, takes a cluster-wide lease from the
//! leader, and physically removes entities past `maxSoftDeleteAge`.
//! Uses a shutdown-flag-plus-background-task pattern built on a
//! `tokio::time::interval` loop since the HTTP layer already pulls in
//! tokio.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};
use vgdb_consensus::ConsensusNode;
use vgdb_core::cluster::ConsensusRole;

use crate::database::Database;

/// Acquires the cluster-wide lease a cleanup cycle must hold before it
/// may physically remove anything (§4.8 "must first acquire a cluster-
/// wide lease from the leader"). The consensus crate's leader-election
/// state is the natural backing for this in a real deployment; tests and
/// single-node development use [`AlwaysGranted`].
pub trait CleanupLease: Send + Sync {
    fn try_acquire(&self, now: u64) -> bool;
}

/// Grants the lease unconditionally — correct for a single-node deployment
/// or any test that does not exercise lease contention.
#[derive(Debug, Default)]
pub struct AlwaysGranted;

impl CleanupLease for AlwaysGranted {
    fn try_acquire(&self, _now: u64) -> bool {
        true
    }
}

/// Backs the lease with the consensus crate's election state: a cycle may
/// purge only while this node believes itself to be the shard's leader.
pub struct ConsensusLease {
    node: Arc<Mutex<ConsensusNode>>,
}

impl ConsensusLease {
    pub fn new(node: Arc<Mutex<ConsensusNode>>) -> Self {
        Self { node }
    }
}

impl CleanupLease for ConsensusLease {
    fn try_acquire(&self, _now: u64) -> bool {
        self.node.lock().role() == ConsensusRole::Leader
    }
}

/// Counters from one or more completed cleanup cycles.
#[derive(Debug, Default)]
pub struct CleanupStats {
    pub cycles_run: AtomicU64,
    pub cycles_skipped: AtomicU64,
    pub nouns_removed: AtomicU64,
    pub verbs_removed: AtomicU64,
}

/// The background cleanup task for one shard's [`Database`].
pub struct CleanupTask {
    db: Arc<Database>,
    lease: Arc<dyn CleanupLease>,
    interval: Duration,
    max_soft_delete_age_us: u64,
    shutdown: Arc<AtomicBool>,
    stats: Arc<CleanupStats>,
}

impl CleanupTask {
    pub fn new(db: Arc<Database>, lease: Arc<dyn CleanupLease>) -> Self {
        let cleanup = &db.config().cleanup;
        let interval = Duration::from_micros(cleanup.cleanup_interval_us);
        let max_soft_delete_age_us = cleanup.max_soft_delete_age_us;
        Self { db, lease, interval, max_soft_delete_age_us, shutdown: Arc::new(AtomicBool::new(false)), stats: Arc::new(CleanupStats::default()) }
    }

    pub fn stats(&self) -> Arc<CleanupStats> {
        self.stats.clone()
    }

    /// Run one cycle now, at caller-supplied `now` (microseconds since
    /// epoch). Skips and returns `false` if the lease is not held.
    pub fn run_cycle(&self, now: u64) -> bool {
        if !self.lease.try_acquire(now) {
            self.stats.cycles_skipped.fetch_add(1, Ordering::Relaxed);
            debug!(shard = %self.db.shard(), "cleanup cycle skipped: lease not acquired");
            return false;
        }
        let (nouns, verbs) = self.db.purge_expired(now, self.max_soft_delete_age_us);
        self.stats.cycles_run.fetch_add(1, Ordering::Relaxed);
        self.stats.nouns_removed.fetch_add(nouns, Ordering::Relaxed);
        self.stats.verbs_removed.fetch_add(verbs, Ordering::Relaxed);
        if nouns > 0 || verbs > 0 {
            info!(shard = %self.db.shard(), nouns, verbs, "cleanup cycle removed expired entities");
        }
        true
    }

    /// Spawn the recurring task. The returned handle can be aborted, or
    /// the task can be asked to stop cooperatively via [`CleanupTask::request_shutdown`].
    pub fn spawn(self: Arc<Self>, now_fn: impl Fn() -> u64 + Send + Sync + 'static) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                if self.shutdown.load(Ordering::Relaxed) {
                    return;
                }
                self.run_cycle(now_fn());
            }
        })
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool as StdAtomicBool;
    use vgdb_core::{EngineConfig, NodeId, Noun, NounType, ShardId};
    use vgdb_storage::MemoryAdapter;

    fn db() -> Arc<Database> {
        Arc::new(Database::open(ShardId(0), NodeId("n1".into()), EngineConfig::default(), Arc::new(MemoryAdapter::default())).unwrap())
    }

    struct DenyingLease(StdAtomicBool);

    impl CleanupLease for DenyingLease {
        fn try_acquire(&self, _now: u64) -> bool {
            self.0.load(Ordering::Relaxed)
        }
    }

    #[test]
    fn consensus_lease_follows_election_role() {
        let settings = vgdb_core::ClusterSettings {
            replication_factor: 1,
            node_timeout_us: 30_000_000,
            election_timeout_min_us: 100,
            election_timeout_max_us: 100,
            heartbeat_interval_us: 10,
        };
        let node = Arc::new(Mutex::new(ConsensusNode::new(NodeId("n1".into()), settings, 0, 0)));
        let lease = ConsensusLease::new(node.clone());
        assert!(!lease.try_acquire(0));

        let request = node.lock().tick(1000).expect("should start election");
        let response = vgdb_consensus::RequestVoteResponse { term: request.term, vote_granted: true };
        node.lock().on_vote_response(NodeId("n1".into()), &response);
        assert!(lease.try_acquire(1000));
    }

    #[test]
    fn cycle_skips_when_lease_denied() {
        let task = CleanupTask::new(db(), Arc::new(DenyingLease(StdAtomicBool::new(false))));
        assert!(!task.run_cycle(0));
        assert_eq!(task.stats().cycles_skipped.load(Ordering::Relaxed), 1);
        assert_eq!(task.stats().cycles_run.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn cycle_removes_expired_noun_when_lease_granted() {
        let db = db();
        let noun = Noun::new(vec![1.0, 0.0], NounType::Concept, Default::default(), NodeId("n1".into()), 0);
        let id = noun.id;
        db.save_noun(noun, None, 0).unwrap();
        db.delete_noun(id, 0).unwrap();

        let task = CleanupTask::new(db.clone(), Arc::new(AlwaysGranted));
        let max_age = db.config().cleanup.max_soft_delete_age_us;
        assert!(task.run_cycle(max_age + 1));
        assert_eq!(task.stats().nouns_removed.load(Ordering::Relaxed), 1);
        assert!(db.get_noun(id, 0, true).unwrap().is_none());
    }
}
