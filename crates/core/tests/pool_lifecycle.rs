//! Worker pool lifecycle integration tests.
//!
//! These tests verify the worker pool with mock fetcher, transcoder and
//! transport:
//! - Every submitted job reaches a terminal state before `stop` returns
//! - Failures and panics stay contained to their job
//! - Conversions never exceed the limiter capacity
//! - Artifacts are delivered once and removed afterwards

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use batchfetch_core::{
    testing::{fixtures, MockFetcher, MockTranscoder, MockTransport},
    ConversionLimiter, Notifier, PoolDeps, ResultSink, UploadKind, WorkerPool,
};

/// Test helper to create a worker pool with mocks.
struct TestHarness {
    pool: WorkerPool<MockFetcher, MockTranscoder>,
    fetcher: Arc<MockFetcher>,
    transcoder: Arc<MockTranscoder>,
    transport: Arc<MockTransport>,
    limiter: ConversionLimiter,
    work_dir: PathBuf,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new(workers: usize, max_parallel: usize) -> Self {
        Self::with_transport(workers, max_parallel, MockTransport::new())
    }

    fn with_transport(workers: usize, max_parallel: usize, transport: MockTransport) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = fixtures::config(temp_dir.path(), workers, max_parallel);

        let transport = Arc::new(transport);
        let fetcher = Arc::new(MockFetcher::new());
        let limiter = ConversionLimiter::new(config.transcode.max_parallel);
        let transcoder = Arc::new(MockTranscoder::with_limiter(limiter.clone()));

        let deps = PoolDeps {
            fetcher: Arc::clone(&fetcher),
            transcoder: Arc::clone(&transcoder),
            notifier: Arc::new(Notifier::new(transport.clone(), &config.notifier)),
            sink: Arc::new(ResultSink::new(
                transport.clone(),
                config.delivery.enable_fallback,
            )),
        };
        let pool = WorkerPool::start(&config, deps);

        Self {
            pool,
            fetcher,
            transcoder,
            transport,
            limiter,
            work_dir: config.pool.work_dir.clone(),
            _temp_dir: temp_dir,
        }
    }

    fn leftover_artifacts(&self) -> Vec<PathBuf> {
        list_files(&self.work_dir)
    }
}

fn list_files(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn test_plain_jobs_are_delivered_and_cleaned_up() {
    let harness = TestHarness::new(2, 2);
    let batch = fixtures::batch(
        &["https://h/a.pdf", "https://h/b.pdf", "https://h/c.pdf"],
        "chat",
    );

    assert_eq!(harness.pool.submit(batch).await, 3);
    harness.pool.stop().await;

    let status = harness.pool.status().await;
    assert_eq!(status.done, 3);
    assert_eq!(status.failed, 0);
    assert_eq!(status.pending(), 0);
    assert!(!status.running);

    let uploads = harness.transport.uploads().await;
    assert_eq!(uploads.len(), 3);
    let mut names: Vec<_> = uploads.iter().map(|u| u.file_name.clone()).collect();
    names.sort();
    assert_eq!(names, vec!["0001_a.pdf", "0002_b.pdf", "0003_c.pdf"]);
    assert!(uploads.iter().all(|u| u.kind == UploadKind::Document));

    assert!(harness.leftover_artifacts().is_empty());
    assert_eq!(harness.fetcher.fetched_urls().await.len(), 3);
}

#[tokio::test]
async fn test_failed_job_does_not_affect_others() {
    let harness = TestHarness::new(2, 2);
    harness.fetcher.fail_url("https://h/b.pdf", 404).await;
    let batch = fixtures::batch(
        &["https://h/a.pdf", "https://h/b.pdf", "https://h/c.pdf"],
        "chat",
    );

    harness.pool.submit(batch).await;
    harness.pool.stop().await;

    let status = harness.pool.status().await;
    assert_eq!((status.done, status.failed), (2, 1));

    let failures = harness.transport.messages_containing("Failed #").await;
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("#2/3 0002_b.pdf"));
    assert!(failures[0].contains("HTTP 404"));

    let uploads = harness.transport.uploads().await;
    assert_eq!(uploads.len(), 2);
    assert!(uploads.iter().all(|u| u.file_name != "0002_b.pdf"));
    assert!(harness.leftover_artifacts().is_empty());
}

#[tokio::test]
async fn test_stop_drains_every_job() {
    let harness = TestHarness::new(3, 2);
    harness.fetcher.set_delay(Duration::from_millis(10)).await;
    let urls: Vec<String> = (1..=12).map(|i| format!("https://h/{}.bin", i)).collect();
    let refs: Vec<&str> = urls.iter().map(String::as_str).collect();

    harness.pool.submit(fixtures::batch(&refs, "chat")).await;
    harness.pool.stop().await;

    let status = harness.pool.status().await;
    assert_eq!(status.done, 12);
    assert_eq!(status.pending(), 0);
    assert_eq!(harness.transport.uploads().await.len(), 12);
}

#[tokio::test]
async fn test_stop_with_nothing_submitted() {
    let harness = TestHarness::new(4, 1);
    tokio::time::timeout(Duration::from_secs(2), harness.pool.stop())
        .await
        .expect("stop should return with an empty queue");

    // A second stop is a no-op and submit is refused.
    harness.pool.stop().await;
    let batch = fixtures::batch(&["https://h/late.pdf"], "chat");
    assert_eq!(harness.pool.submit(batch).await, 0);
}

#[tokio::test]
async fn test_panic_is_contained() {
    let harness = TestHarness::new(1, 1);
    harness.fetcher.panic_on("https://h/boom.pdf").await;
    let batch = fixtures::batch(&["https://h/boom.pdf", "https://h/ok.pdf"], "chat");

    harness.pool.submit(batch).await;
    harness.pool.stop().await;

    let status = harness.pool.status().await;
    assert_eq!((status.done, status.failed), (1, 1));
    let failures = harness.transport.messages_containing("Failed #").await;
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("panicked"));
}

#[tokio::test]
async fn test_stream_jobs_wait_for_conversion_slot() {
    let harness = TestHarness::new(2, 1);
    harness
        .transcoder
        .set_delay(Duration::from_millis(100))
        .await;
    let batch = fixtures::batch(
        &["https://h/one/index.m3u8", "https://h/two/index.m3u8"],
        "chat",
    );

    harness.pool.submit(batch).await;
    harness.pool.stop().await;

    let conversions = harness.transcoder.recorded_conversions().await;
    assert_eq!(conversions.len(), 2);
    assert!(conversions[1].started >= conversions[0].finished);
    assert_eq!(harness.transcoder.peak(), 1);
    assert_eq!(harness.limiter.held(), 0);

    let uploads = harness.transport.uploads().await;
    assert_eq!(uploads.len(), 2);
    assert!(uploads.iter().all(|u| u.kind == UploadKind::Video));
    assert!(uploads.iter().all(|u| u.file_name.ends_with("_index.mp4")));
}

#[tokio::test]
async fn test_conversions_never_exceed_capacity() {
    let harness = TestHarness::new(6, 2);
    harness.transcoder.set_delay(Duration::from_millis(20)).await;
    let urls: Vec<String> = (1..=10)
        .map(|i| format!("https://h/{}/playlist.m3u8", i))
        .collect();
    let refs: Vec<&str> = urls.iter().map(String::as_str).collect();

    harness.pool.submit(fixtures::batch(&refs, "chat")).await;
    harness.pool.stop().await;

    assert!(harness.transcoder.peak() <= 2);
    assert!(harness.limiter.peak() <= 2);
    assert_eq!(harness.pool.status().await.done, 10);
}

#[tokio::test]
async fn test_conversion_timeout_fails_job() {
    let harness = TestHarness::new(2, 1);
    harness
        .transcoder
        .timeout_url("https://h/slow/index.m3u8")
        .await;
    let batch = fixtures::batch(
        &["https://h/slow/index.m3u8", "https://h/fast/index.m3u8"],
        "chat",
    );

    harness.pool.submit(batch).await;
    harness.pool.stop().await;

    let status = harness.pool.status().await;
    assert_eq!((status.done, status.failed), (1, 1));
    let failures = harness.transport.messages_containing("timed out").await;
    assert_eq!(failures.len(), 1);
    assert_eq!(harness.limiter.held(), 0);
}

#[tokio::test]
async fn test_video_rejected_falls_back_to_document() {
    let transport = MockTransport::new();
    transport.reject_upload_kind(UploadKind::Video).await;
    let harness = TestHarness::with_transport(1, 1, transport);

    harness
        .pool
        .submit(fixtures::batch(&["https://h/live/index.m3u8"], "chat"))
        .await;
    harness.pool.stop().await;

    let uploads = harness.transport.uploads().await;
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].kind, UploadKind::Document);
    assert_eq!(harness.pool.status().await.done, 1);
}

#[tokio::test]
async fn test_delivery_failure_fails_job_and_cleans_up() {
    let transport = MockTransport::new();
    transport.set_fail_uploads(true).await;
    let harness = TestHarness::with_transport(1, 1, transport);

    harness
        .pool
        .submit(fixtures::batch(&["https://h/a.pdf"], "chat"))
        .await;
    harness.pool.stop().await;

    assert_eq!(harness.pool.status().await.failed, 1);
    // Primary plus exactly one fallback.
    assert_eq!(harness.transport.upload_attempts().await, 2);
    assert!(harness.leftover_artifacts().is_empty());
    let failures = harness.transport.messages_containing("Failed #1/1").await;
    assert_eq!(failures.len(), 1);
}

#[tokio::test]
async fn test_progress_burst_sends_single_intermediate_message() {
    let harness = TestHarness::new(1, 1);
    harness.fetcher.set_progress_steps(100).await;
    harness.fetcher.set_delay(Duration::from_millis(200)).await;

    harness
        .pool
        .submit(fixtures::batch(&["https://h/big.zip"], "chat"))
        .await;
    harness.pool.stop().await;

    let intermediate = harness.transport.messages_containing("Downloading").await;
    assert_eq!(intermediate.len(), 1);
    let finals = harness.transport.messages_containing("Done #1/1").await;
    assert_eq!(finals.len(), 1);
}

#[tokio::test]
async fn test_batch_summary_sent_once() {
    let harness = TestHarness::new(2, 1);
    harness.fetcher.fail_url("https://h/c.pdf", 500).await;

    harness
        .pool
        .submit(fixtures::batch(
            &["https://h/a.pdf", "https://h/b.pdf", "https://h/c.pdf"],
            "chat",
        ))
        .await;
    harness.pool.stop().await;

    let summaries = harness.transport.messages_containing("Batch finished").await;
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].contains("2 of 3 completed, 1 failed"));
    assert!(summaries[0].contains("0003_c.pdf"));
}
