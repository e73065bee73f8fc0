//! Drives a single migration attempt through its four phases (§4.6).
//!
//! This module holds no networking; `vgdb-transport` carries the actual
//! batches and RPCs between nodes. `MigrationDriver` is the state machine
//! both sides consult to decide what to do next: an explicit
//! propose/commit-with-timeout shape, boring and minimal.

use tracing::{info, warn};
use vgdb_core::{Error, Result};

use crate::state::{MigrationPhase, MigrationRecord, TransferProgress};

/// Drives one [`MigrationRecord`] through Propose → Transfer → Validate →
/// Switch, enforced in order; callers cannot skip a phase.
pub struct MigrationDriver {
    record: MigrationRecord,
    batch_size: usize,
    max_retries: u32,
}

impl MigrationDriver {
    pub fn new(record: MigrationRecord, batch_size: usize, max_retries: u32) -> Self {
        Self { record, batch_size, max_retries }
    }

    pub fn record(&self) -> &MigrationRecord {
        &self.record
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Step 1, leader only: move `Pending` → `Transferring` once the
    /// source has begun enumerating items.
    pub fn begin_transfer(&mut self, expected_count: u64) -> Result<()> {
        self.require_phase(MigrationPhase::Pending)?;
        self.record.expected_count = Some(expected_count);
        self.record.phase = MigrationPhase::Transferring;
        info!(migration = %self.record.id, shard = %self.record.shard, expected_count, "transfer started");
        Ok(())
    }

    /// Step 2, source side: record one streamed batch's progress. The
    /// source enumerates nouns whose ids hash into the shard, then
    /// incident verbs, in batches of `batch_size` (§4.6 step 2).
    pub fn record_batch(&mut self, nouns: u64, verbs: u64) -> Result<TransferProgress> {
        self.require_phase(MigrationPhase::Transferring)?;
        self.record.progress.nouns_sent += nouns;
        self.record.progress.verbs_sent += verbs;
        self.record.progress.batches_sent += 1;
        Ok(self.record.progress)
    }

    /// Step 2 → 3 transition once the source has streamed everything it
    /// enumerated.
    pub fn finish_transfer(&mut self) -> Result<()> {
        self.require_phase(MigrationPhase::Transferring)?;
        self.record.phase = MigrationPhase::Validating;
        Ok(())
    }

    /// Step 3, destination side: compare the received count against what
    /// the source promised. On mismatch the migration fails rather than
    /// silently losing data; the leader may retry up to `max_retries`.
    pub fn validate(&mut self, received_count: u64) -> Result<()> {
        self.require_phase(MigrationPhase::Validating)?;
        let expected = self.record.expected_count.unwrap_or(0);
        if received_count != expected {
            self.record.error = Some(format!(
                "validation failed: expected {expected} items, received {received_count}"
            ));
            self.record.phase = MigrationPhase::Failed;
            warn!(migration = %self.record.id, expected, received_count, "migration validation failed");
            return Err(Error::ConsensusTimeout(format!(
                "shard {} migration {} failed validation",
                self.record.shard, self.record.id
            )));
        }
        self.record.phase = MigrationPhase::Switching;
        Ok(())
    }

    /// Step 4, leader only: the assignment update has committed through
    /// consensus. Schedules the source's delayed local deletion.
    pub fn commit_switch(&mut self, now: u64) -> Result<()> {
        self.require_phase(MigrationPhase::Switching)?;
        self.record.phase = MigrationPhase::Completed;
        self.record.switched_at = Some(now);
        info!(migration = %self.record.id, shard = %self.record.shard, "migration switched");
        Ok(())
    }

    /// The leader-driven consensus wait for the switch timed out
    /// (default 30s per §4.6 step 4). Retries if under the retry budget,
    /// otherwise fails the migration permanently.
    pub fn switch_timed_out(&mut self) -> Result<bool> {
        self.require_phase(MigrationPhase::Switching)?;
        self.record.retries += 1;
        if self.record.retries > self.max_retries {
            self.record.phase = MigrationPhase::Failed;
            self.record.error = Some("switch consensus timed out after max retries".to_string());
            Ok(false)
        } else {
            warn!(migration = %self.record.id, retries = self.record.retries, "switch timed out, retrying");
            Ok(true)
        }
    }

    fn require_phase(&self, expected: MigrationPhase) -> Result<()> {
        if self.record.phase != expected {
            return Err(Error::InvalidArgument(format!(
                "migration {} expected phase {:?}, found {:?}",
                self.record.id, expected, self.record.phase
            )));
        }
        Ok(())
    }
}
