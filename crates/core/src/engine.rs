//! Batch engine: feeds batches from a transport into a worker pool.

use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use crate::fetcher::Fetcher;
use crate::job::Batch;
use crate::pool::WorkerPool;
use crate::transcoder::Transcoder;
use crate::transport::Transport;

/// Totals for one engine run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineReport {
    pub batches: usize,
    pub jobs: usize,
}

/// Receives batches until the transport runs dry, then drains the pool.
pub struct BatchEngine<F: Fetcher, T: Transcoder> {
    transport: Arc<dyn Transport>,
    pool: WorkerPool<F, T>,
}

impl<F: Fetcher + 'static, T: Transcoder + 'static> BatchEngine<F, T> {
    pub fn new(transport: Arc<dyn Transport>, pool: WorkerPool<F, T>) -> Self {
        Self { transport, pool }
    }

    pub fn pool(&self) -> &WorkerPool<F, T> {
        &self.pool
    }

    /// Runs until the transport has no more batches.
    pub async fn run(&self) -> EngineReport {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Runs until the transport has no more batches or `shutdown` resolves.
    ///
    /// Either way the pool is stopped before returning, so every job that was
    /// accepted has reached a terminal state.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> EngineReport {
        tokio::pin!(shutdown);
        let mut report = EngineReport::default();
        info!(transport = self.transport.name(), "Engine started");

        loop {
            let batch = tokio::select! {
                batch = self.transport.receive_batch() => batch,
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting batches");
                    break;
                }
            };
            let Some(batch) = batch else {
                info!("Transport has no more batches");
                break;
            };

            if batch.is_empty() {
                warn!(batch_id = %batch.id, "Ignoring empty batch");
                continue;
            }

            self.acknowledge(&batch).await;
            report.jobs += self.pool.submit(batch).await;
            report.batches += 1;
        }

        self.pool.stop().await;
        let status = self.pool.status().await;
        info!(
            batches = report.batches,
            jobs = report.jobs,
            done = status.done,
            failed = status.failed,
            "Engine finished"
        );
        report
    }

    /// Tells each destination in the batch how many links it sent.
    async fn acknowledge(&self, batch: &Batch) {
        let notifier = &self.pool.deps().notifier;
        let mut destinations: Vec<&str> = Vec::new();
        for item in &batch.items {
            if !destinations.contains(&item.destination.as_str()) {
                destinations.push(&item.destination);
            }
        }
        for destination in destinations {
            let count = batch
                .items
                .iter()
                .filter(|item| item.destination == destination)
                .count();
            let text = format!("Received {} link(s), processing with the worker pool", count);
            notifier.announce(destination, &text).await;
        }
    }
}
