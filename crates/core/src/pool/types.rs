//! Types for the pool module.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::notifier::Notifier;
use crate::sink::ResultSink;

/// Collaborators shared by every worker of a pool.
pub struct PoolDeps<F, T> {
    pub fetcher: Arc<F>,
    /// Holds the conversion limiter shared by all workers.
    pub transcoder: Arc<T>,
    pub notifier: Arc<Notifier>,
    pub sink: Arc<ResultSink>,
}

impl<F, T> Clone for PoolDeps<F, T> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            transcoder: Arc::clone(&self.transcoder),
            notifier: Arc::clone(&self.notifier),
            sink: Arc::clone(&self.sink),
        }
    }
}

/// Snapshot of the pool and the jobs it has seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Whether workers are accepting jobs.
    pub running: bool,
    /// Number of worker loops started.
    pub workers: usize,
    pub queued: usize,
    pub in_progress: usize,
    pub done: usize,
    pub failed: usize,
}

impl PoolStatus {
    /// Jobs not yet in a terminal state.
    pub fn pending(&self) -> usize {
        self.queued + self.in_progress
    }
}

/// Outcome counts for a batch whose jobs have all finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: String,
    pub destination: String,
    pub total: usize,
    pub done: usize,
    pub failed: usize,
    /// Labels of the failed jobs, in completion order.
    pub failed_labels: Vec<String>,
}
