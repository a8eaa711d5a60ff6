//! Worker loop and per-job processing.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{error, info, info_span, warn, Instrument};

use crate::fetcher::{FetchProgress, Fetcher};
use crate::job::{Job, JobKind, JobStatus};
use crate::metrics;
use crate::notifier::{failed_text, progress_text, started_text, succeeded_text, summary_text};
use crate::queue::{JobQueue, QueueItem};
use crate::sink::DeliveryReceipt;
use crate::transcoder::Transcoder;

use super::board::JobBoard;
use super::error::JobError;
use super::types::PoolDeps;

/// Everything a worker needs to process a job.
pub(crate) struct WorkerContext<F, T> {
    pub deps: PoolDeps<F, T>,
    pub board: Arc<JobBoard>,
    pub work_dir: PathBuf,
    pub conversion_timeout: Duration,
}

/// Runs until a shutdown sentinel is dequeued.
pub(crate) async fn run_worker<F, T>(
    worker_id: usize,
    queue: Arc<JobQueue>,
    ctx: Arc<WorkerContext<F, T>>,
) where
    F: Fetcher + 'static,
    T: Transcoder + 'static,
{
    info!(worker_id, "Worker started");
    loop {
        match queue.dequeue().await {
            QueueItem::Shutdown => {
                queue.task_done();
                break;
            }
            QueueItem::Job(job) => {
                let span = info_span!("job", job_id = %job.id, seq = job.sequence_index);
                ctx.handle(*job).instrument(span).await;
                queue.task_done();
            }
        }
    }
    info!(worker_id, "Worker stopped");
}

impl<F, T> WorkerContext<F, T>
where
    F: Fetcher + 'static,
    T: Transcoder + 'static,
{
    /// Takes one job from `Queued` to a terminal state.
    async fn handle(&self, mut job: Job) {
        let start = Instant::now();
        if let Err(e) = job.advance(JobStatus::InProgress) {
            warn!(error = %e, "Skipping job that is not queued");
            return;
        }
        self.deps.notifier.report(&job, &started_text(&job)).await;
        self.board.update(&job).await;
        metrics::JOBS_IN_PROGRESS.inc();

        let dest = job.artifact_path(&self.work_dir);
        let outcome = AssertUnwindSafe(self.process(&job, &dest))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(JobError::from_panic(panic.as_ref())));

        let terminal = match outcome {
            Ok(_) => JobStatus::Done,
            Err(_) => JobStatus::Failed,
        };
        if let Err(e) = job.advance(terminal) {
            warn!(error = %e, "Unexpected job transition");
        }

        self.deps.sink.cleanup(&dest).await;

        let text = match &outcome {
            Ok(receipt) => {
                info!(
                    strategy = receipt.strategy.as_str(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Job done"
                );
                succeeded_text(&job)
            }
            Err(e) => {
                error!(kind = e.kind(), error = %e, url = %job.source_url, "Job failed");
                failed_text(&job, &e.to_string())
            }
        };
        self.deps.notifier.report_final(&job, &text).await;

        metrics::JOBS_IN_PROGRESS.dec();
        metrics::JOBS_TOTAL
            .with_label_values(&[job.kind.as_str(), job.status().as_str()])
            .inc();
        metrics::JOB_DURATION
            .with_label_values(&[job.kind.as_str()])
            .observe(start.elapsed().as_secs_f64());

        if let Some(summary) = self.board.update(&job).await {
            info!(
                batch_id = %summary.batch_id,
                done = summary.done,
                failed = summary.failed,
                "Batch finished"
            );
            self.deps
                .notifier
                .announce(&summary.destination, &summary_text(&summary))
                .await;
            self.deps
                .sink
                .cleanup_dir(&job.batch_dir(&self.work_dir))
                .await;
        }
    }

    /// Produces the artifact and delivers it.
    async fn process(&self, job: &Job, dest: &Path) -> Result<DeliveryReceipt, JobError> {
        let path = match job.kind {
            JobKind::Plain => self.fetch_reporting(job, dest).await?,
            JobKind::Stream => {
                self.deps
                    .transcoder
                    .convert(&job.source_url, dest, Some(self.conversion_timeout))
                    .await?
            }
        };

        Ok(self.deps.sink.deliver(&path, job).await?)
    }

    /// Fetches while forwarding progress to the notifier.
    ///
    /// Progress is read from a watch channel on this task, so a slow
    /// transport never stalls the download and no task is spawned per chunk.
    async fn fetch_reporting(&self, job: &Job, dest: &Path) -> Result<PathBuf, JobError> {
        let (progress_tx, mut progress_rx) = watch::channel(FetchProgress::default());
        let fetch = self
            .deps
            .fetcher
            .fetch_with_progress(&job.source_url, dest, progress_tx);

        let report = async {
            while progress_rx.changed().await.is_ok() {
                let progress = *progress_rx.borrow_and_update();
                self.deps
                    .notifier
                    .report(job, &progress_text(job, &progress))
                    .await;
            }
        };

        let (result, ()) = tokio::join!(fetch, report);
        Ok(result?)
    }
}
