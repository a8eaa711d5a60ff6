//! Mock transcoder for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::transcoder::{ConversionLimiter, TranscodeError, Transcoder};

/// Start and end of one mock conversion.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    pub url: String,
    pub started: Instant,
    pub finished: Instant,
}

/// Mock implementation of the Transcoder trait.
///
/// Provides controllable behavior for testing:
/// - Hold a slot from a shared `ConversionLimiter` like the real transcoder
/// - Track concurrent and peak conversions
/// - Simulate conversion duration, failures and timeouts
#[derive(Debug)]
pub struct MockTranscoder {
    limiter: Option<ConversionLimiter>,
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    /// URLs that fail with a nonzero exit.
    failures: Arc<RwLock<HashSet<String>>>,
    /// URLs that run into the conversion timeout.
    timeouts: Arc<RwLock<HashSet<String>>>,
    delay: Arc<RwLock<Duration>>,
}

impl Default for MockTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscoder {
    /// Create a mock transcoder without a limiter.
    pub fn new() -> Self {
        Self {
            limiter: None,
            conversions: Arc::new(RwLock::new(Vec::new())),
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            failures: Arc::new(RwLock::new(HashSet::new())),
            timeouts: Arc::new(RwLock::new(HashSet::new())),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Create a mock transcoder that holds a slot of `limiter` per call.
    pub fn with_limiter(limiter: ConversionLimiter) -> Self {
        Self {
            limiter: Some(limiter),
            ..Self::new()
        }
    }

    /// Get all finished conversions, in completion order.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    /// Highest number of conversions that ran at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Make conversions of `url` fail.
    pub async fn fail_url(&self, url: impl Into<String>) {
        self.failures.write().await.insert(url.into());
    }

    /// Make conversions of `url` time out.
    pub async fn timeout_url(&self, url: impl Into<String>) {
        self.timeouts.write().await.insert(url.into());
    }

    /// Set the simulated conversion duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn convert(
        &self,
        url: &str,
        dest: &Path,
        timeout: Option<Duration>,
    ) -> Result<PathBuf, TranscodeError> {
        let _slot = match &self.limiter {
            Some(limiter) => Some(limiter.acquire().await?),
            None => None,
        };

        let started = Instant::now();
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        let delay = *self.delay.read().await;
        tokio::time::sleep(delay).await;

        let result = if self.timeouts.read().await.contains(url) {
            Err(TranscodeError::Timeout {
                timeout_secs: timeout.map(|t| t.as_secs()).unwrap_or_default(),
            })
        } else if self.failures.read().await.contains(url) {
            Err(TranscodeError::conversion_failed(
                Some(1),
                "Invalid data found when processing input",
            ))
        } else {
            write_output(dest).await
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.conversions.write().await.push(RecordedConversion {
            url: url.to_string(),
            started,
            finished: Instant::now(),
        });

        result
    }
}

async fn write_output(dest: &Path) -> Result<PathBuf, TranscodeError> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(dest, b"mock mp4").await?;
    Ok(dest.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_convert_writes_output() {
        let dir = TempDir::new().unwrap();
        let transcoder = MockTranscoder::new();
        let dest = dir.path().join("0001_index.mp4");

        transcoder
            .convert("https://h/index.m3u8", &dest, None)
            .await
            .unwrap();
        assert!(dest.exists());
        assert_eq!(transcoder.recorded_conversions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_limiter_bounds_peak() {
        let dir = TempDir::new().unwrap();
        let transcoder = Arc::new(MockTranscoder::with_limiter(ConversionLimiter::new(2)));
        transcoder.set_delay(Duration::from_millis(20)).await;

        let mut tasks = Vec::new();
        for i in 0..6 {
            let transcoder = transcoder.clone();
            let dest = dir.path().join(format!("{:04}_s.mp4", i));
            tasks.push(tokio::spawn(async move {
                transcoder.convert("u", &dest, None).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(transcoder.peak(), 2);
    }
}
