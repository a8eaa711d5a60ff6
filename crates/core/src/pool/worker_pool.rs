//! Worker pool implementation.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};

use crate::config::Config;
use crate::fetcher::Fetcher;
use crate::job::Batch;
use crate::queue::JobQueue;
use crate::transcoder::Transcoder;

use super::board::JobBoard;
use super::types::{PoolDeps, PoolStatus};
use super::worker::{run_worker, WorkerContext};

/// A fixed set of workers sharing one queue, one fetcher and one transcoder.
pub struct WorkerPool<F: Fetcher, T: Transcoder> {
    queue: Arc<JobQueue>,
    ctx: Arc<WorkerContext<F, T>>,
    board: Arc<JobBoard>,
    workers: usize,
    handles: Mutex<Vec<JoinHandle<()>>>,
    /// Held while enqueueing so no job lands behind the shutdown sentinels.
    running: Mutex<bool>,
}

impl<F: Fetcher + 'static, T: Transcoder + 'static> WorkerPool<F, T> {
    /// Launches `config.pool.workers` worker loops.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &Config, deps: PoolDeps<F, T>) -> Self {
        let workers = config.pool.workers;
        let queue = Arc::new(JobQueue::new());
        let board = Arc::new(JobBoard::new());
        let ctx = Arc::new(WorkerContext {
            deps,
            board: Arc::clone(&board),
            work_dir: config.pool.work_dir.clone(),
            conversion_timeout: config.transcode.timeout(),
        });

        let handles = (1..=workers)
            .map(|worker_id| {
                let queue = Arc::clone(&queue);
                let ctx = Arc::clone(&ctx);
                tokio::spawn(
                    run_worker(worker_id, queue, ctx).instrument(info_span!("worker", worker_id)),
                )
            })
            .collect();

        info!(
            workers,
            work_dir = %config.pool.work_dir.display(),
            fetcher = ctx.deps.fetcher.name(),
            transcoder = ctx.deps.transcoder.name(),
            "Worker pool started"
        );

        Self {
            queue,
            ctx,
            board,
            workers,
            handles: Mutex::new(handles),
            running: Mutex::new(true),
        }
    }

    /// Splits a batch into jobs and enqueues them in order.
    ///
    /// Returns the number of jobs enqueued; zero once the pool is stopped.
    /// A batch reusing the id of one still in flight gets a fresh id, so the
    /// two never share a tally or a working directory.
    pub async fn submit(&self, mut batch: Batch) -> usize {
        let running = self.running.lock().await;
        if !*running {
            warn!(batch_id = %batch.id, "Pool stopped, dropping batch");
            return 0;
        }

        if self.board.has_batch(&batch.id).await {
            let fresh = uuid::Uuid::new_v4().to_string();
            warn!(batch_id = %batch.id, new_id = %fresh, "Batch id already in flight, renaming");
            batch.id = fresh;
        }

        let batch_id = batch.id.clone();
        let jobs = batch.into_jobs();
        self.board.register(&jobs).await;

        let count = jobs.len();
        for job in jobs {
            self.queue.enqueue(job);
        }
        info!(batch_id = %batch_id, jobs = count, "Batch submitted");
        count
    }

    /// Waits until every job submitted so far is terminal.
    pub async fn join(&self) {
        self.queue.join().await;
    }

    /// Drains the queue, then stops every worker.
    ///
    /// Jobs already queued run to completion. Calling `stop` twice is a no-op.
    pub async fn stop(&self) {
        {
            let mut running = self.running.lock().await;
            if !*running {
                return;
            }
            *running = false;
        }
        info!(workers = self.workers, "Stopping worker pool");
        self.queue.shutdown(self.workers).await;

        let handles = std::mem::take(&mut *self.handles.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Worker task ended abnormally");
            }
        }
        info!("Worker pool stopped");
    }

    pub async fn is_running(&self) -> bool {
        *self.running.lock().await
    }

    /// Counts of known jobs per status.
    pub async fn status(&self) -> PoolStatus {
        let mut status = self.board.counts().await;
        status.running = self.is_running().await;
        status.workers = self.workers;
        status
    }

    /// Collaborators the workers were started with.
    pub fn deps(&self) -> &PoolDeps<F, T> {
        &self.ctx.deps
    }
}
