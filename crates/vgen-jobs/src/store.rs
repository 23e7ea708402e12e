//! In-memory job store.
//!
//! Records live in a sharded concurrent map. Every mutation runs while the
//! entry's shard lock is held, so readers only ever see a record before or
//! after a transition, never in between. Reads hand out clones.
//!
//! Mutation is crate-private: the dispatcher creates records and each
//! execution unit mutates only the record it owns.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tracing::warn;

use vgen_models::{JobId, JobPayload, JobRecord, JobStatus};

/// Number of records per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

impl JobCounts {
    pub fn total(&self) -> usize {
        self.queued + self.running + self.completed + self.failed
    }

    /// Jobs that have not reached a terminal state.
    pub fn active(&self) -> usize {
        self.queued + self.running
    }
}

/// Concurrent mapping from job ID to record.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: DashMap<JobId, JobRecord>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a queued record under a fresh identifier.
    pub(crate) fn create(
        &self,
        payload: JobPayload,
        label: String,
        notify_address: Option<String>,
    ) -> JobId {
        loop {
            let id = JobId::new();
            match self.jobs.entry(id.clone()) {
                Entry::Occupied(_) => {
                    warn!(job_id = %id, "Job ID collision, regenerating");
                }
                Entry::Vacant(slot) => {
                    slot.insert(JobRecord::new(id.clone(), payload, label, notify_address));
                    return id;
                }
            }
        }
    }

    /// Snapshot of a record.
    pub fn get(&self, id: &JobId) -> Option<JobRecord> {
        self.jobs.get(id).map(|entry| entry.value().clone())
    }

    /// Apply one atomic mutation. Returns `None` if the record is gone.
    pub(crate) fn update<F, R>(&self, id: &JobId, mutator: F) -> Option<R>
    where
        F: FnOnce(&mut JobRecord) -> R,
    {
        self.jobs
            .get_mut(id)
            .map(|mut entry| mutator(entry.value_mut()))
    }

    /// Remove terminal records that finished before `cutoff`.
    pub(crate) fn purge_terminal_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0usize;
        self.jobs.retain(|_, record| {
            let expired = record.is_terminal()
                && record.completed_at.is_some_and(|finished| finished < cutoff);
            if expired {
                removed += 1;
            }
            !expired
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: &JobId) -> bool {
        self.jobs.contains_key(id)
    }

    pub fn counts(&self) -> JobCounts {
        let mut counts = JobCounts::default();
        for entry in self.jobs.iter() {
            match entry.value().status {
                JobStatus::Queued => counts.queued += 1,
                JobStatus::Running => counts.running += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}
