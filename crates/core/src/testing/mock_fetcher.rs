//! Mock fetcher for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

use crate::fetcher::{FetchError, FetchProgress, Fetcher};

/// Mock implementation of the Fetcher trait.
///
/// Provides controllable behavior for testing:
/// - Track fetched URLs for assertions
/// - Fail specific URLs with an HTTP status
/// - Panic on specific URLs
/// - Simulate download duration and progress
#[derive(Debug)]
pub struct MockFetcher {
    /// URLs passed to `fetch`, in call order.
    fetched: Arc<RwLock<Vec<String>>>,
    /// URLs that fail with the given HTTP status.
    failures: Arc<RwLock<HashMap<String, u16>>>,
    /// URLs that make the fetch panic.
    panics: Arc<RwLock<HashSet<String>>>,
    /// Body written for every successful fetch.
    body: Arc<RwLock<Vec<u8>>>,
    /// Simulated download duration.
    delay: Arc<RwLock<Duration>>,
    /// Number of progress updates published per fetch.
    progress_steps: Arc<RwLock<u64>>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    /// Create a new mock fetcher.
    pub fn new() -> Self {
        Self {
            fetched: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            panics: Arc::new(RwLock::new(HashSet::new())),
            body: Arc::new(RwLock::new(b"mock body".to_vec())),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            progress_steps: Arc::new(RwLock::new(4)),
        }
    }

    /// Get all fetched URLs.
    pub async fn fetched_urls(&self) -> Vec<String> {
        self.fetched.read().await.clone()
    }

    /// Make fetches of `url` fail with an HTTP status.
    pub async fn fail_url(&self, url: impl Into<String>, status: u16) {
        self.failures.write().await.insert(url.into(), status);
    }

    /// Make fetches of `url` panic.
    pub async fn panic_on(&self, url: impl Into<String>) {
        self.panics.write().await.insert(url.into());
    }

    /// Set the body written for successful fetches.
    pub async fn set_body(&self, body: impl Into<Vec<u8>>) {
        *self.body.write().await = body.into();
    }

    /// Set the simulated download duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Set how many progress updates each fetch publishes.
    pub async fn set_progress_steps(&self, steps: u64) {
        *self.progress_steps.write().await = steps;
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, url: &str, dest: &Path) -> Result<PathBuf, FetchError> {
        let (tx, _rx) = watch::channel(FetchProgress::default());
        self.fetch_with_progress(url, dest, tx).await
    }

    async fn fetch_with_progress(
        &self,
        url: &str,
        dest: &Path,
        progress_tx: watch::Sender<FetchProgress>,
    ) -> Result<PathBuf, FetchError> {
        self.fetched.write().await.push(url.to_string());

        if self.panics.read().await.contains(url) {
            panic!("mock fetcher panic for {}", url);
        }
        if let Some(status) = self.failures.read().await.get(url).copied() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status,
            });
        }

        let body = self.body.read().await.clone();
        let delay = *self.delay.read().await;
        let steps = (*self.progress_steps.read().await).max(1);
        let total = body.len() as u64;

        for step in 1..=steps {
            tokio::time::sleep(delay / steps as u32).await;
            progress_tx.send_replace(FetchProgress {
                downloaded_bytes: total * step / steps,
                total_bytes: Some(total),
            });
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::Write {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        tokio::fs::write(dest, &body)
            .await
            .map_err(|e| FetchError::Write {
                path: dest.to_path_buf(),
                source: e,
            })?;

        Ok(dest.to_path_buf())
    }
}
