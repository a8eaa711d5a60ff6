//! Per-job status tracking and batch completion.

use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::job::{Job, JobId, JobStatus};

use super::types::{BatchSummary, PoolStatus};

/// Running tally for one submitted batch.
#[derive(Debug)]
struct BatchTally {
    destination: String,
    total: usize,
    done: usize,
    failed: usize,
    failed_labels: Vec<String>,
}

#[derive(Debug, Default)]
struct BoardState {
    /// Jobs that have not reached a terminal state yet.
    active: HashMap<JobId, JobStatus>,
    done: usize,
    failed: usize,
    /// Batches with at least one active job.
    batches: HashMap<String, BatchTally>,
}

/// Status of in-flight jobs and lifetime totals of finished ones.
///
/// A job leaves the board when it turns terminal and a batch leaves it when
/// its summary is produced, so memory tracks what is in flight rather than
/// everything ever submitted.
#[derive(Debug, Default)]
pub struct JobBoard {
    state: RwLock<BoardState>,
}

impl JobBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records newly submitted jobs.
    pub async fn register(&self, jobs: &[Job]) {
        let mut state = self.state.write().await;
        for job in jobs {
            state.active.insert(job.id.clone(), job.status());
            state
                .batches
                .entry(job.batch_id.clone())
                .or_insert_with(|| BatchTally {
                    destination: job.destination.clone(),
                    total: job.total_in_batch,
                    done: 0,
                    failed: 0,
                    failed_labels: Vec::new(),
                });
        }
    }

    /// Whether a batch with this id still has unfinished jobs.
    pub async fn has_batch(&self, batch_id: &str) -> bool {
        self.state.read().await.batches.contains_key(batch_id)
    }

    /// Records the job's current status.
    ///
    /// Returns the batch summary when this was the last job of its batch to
    /// reach a terminal state. Only the first terminal update of a registered
    /// job is counted.
    pub async fn update(&self, job: &Job) -> Option<BatchSummary> {
        let mut state = self.state.write().await;
        let status = job.status();

        if !status.is_terminal() {
            if let Some(entry) = state.active.get_mut(&job.id) {
                *entry = status;
            }
            return None;
        }

        state.active.remove(&job.id)?;
        match status {
            JobStatus::Done => state.done += 1,
            JobStatus::Failed => state.failed += 1,
            _ => {}
        }

        let tally = state.batches.get_mut(&job.batch_id)?;
        match status {
            JobStatus::Done => tally.done += 1,
            JobStatus::Failed => {
                tally.failed += 1;
                tally.failed_labels.push(job.label());
            }
            _ => {}
        }
        if tally.done + tally.failed < tally.total {
            return None;
        }

        let tally = state.batches.remove(&job.batch_id)?;
        Some(BatchSummary {
            batch_id: job.batch_id.clone(),
            destination: tally.destination,
            total: tally.total,
            done: tally.done,
            failed: tally.failed,
            failed_labels: tally.failed_labels,
        })
    }

    /// Per-status counts, with pool fields left at their defaults.
    pub async fn counts(&self) -> PoolStatus {
        let state = self.state.read().await;
        let mut status = PoolStatus {
            done: state.done,
            failed: state.failed,
            ..Default::default()
        };
        for job_status in state.active.values() {
            match job_status {
                JobStatus::Queued => status.queued += 1,
                JobStatus::InProgress => status.in_progress += 1,
                JobStatus::Done | JobStatus::Failed => {}
            }
        }
        status
    }
}
