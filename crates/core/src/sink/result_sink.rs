//! Artifact delivery and cleanup.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::job::Job;
use crate::metrics;
use crate::transport::{Transport, Upload, UploadKind};

use super::error::DeliveryError;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "mov", "m4v"];

/// Which attempt delivered the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStrategy {
    Primary,
    Fallback,
}

impl DeliveryStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

/// Successful delivery details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub strategy: DeliveryStrategy,
    pub kind: UploadKind,
}

/// Primary presentation for an artifact, by extension.
pub fn upload_kind_for(path: &Path) -> UploadKind {
    let is_video = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|video| ext.eq_ignore_ascii_case(video))
        })
        .unwrap_or(false);

    if is_video {
        UploadKind::Video
    } else {
        UploadKind::Document
    }
}

/// Hands artifacts to the transport.
pub struct ResultSink {
    transport: Arc<dyn Transport>,
    enable_fallback: bool,
}

impl ResultSink {
    pub fn new(transport: Arc<dyn Transport>, enable_fallback: bool) -> Self {
        Self {
            transport,
            enable_fallback,
        }
    }

    /// Uploads `path` to the job's destination.
    ///
    /// On primary failure, at most one fallback upload is attempted.
    pub async fn deliver(&self, path: &Path, job: &Job) -> Result<DeliveryReceipt, DeliveryError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| job.artifact_name());

        let kind = upload_kind_for(path);
        let primary = Upload {
            destination: job.destination.clone(),
            path: path.to_path_buf(),
            file_name: file_name.clone(),
            caption: job.caption.clone(),
            kind,
        };

        let primary_error = match self.transport.send_file(primary).await {
            Ok(()) => {
                record(DeliveryStrategy::Primary, "success");
                info!(job_id = %job.id, kind = kind.as_str(), "Artifact delivered");
                return Ok(DeliveryReceipt {
                    strategy: DeliveryStrategy::Primary,
                    kind,
                });
            }
            Err(e) => {
                record(DeliveryStrategy::Primary, "failed");
                e.to_string()
            }
        };

        if !self.enable_fallback {
            return Err(DeliveryError {
                destination: job.destination.clone(),
                primary: primary_error,
                fallback: None,
            });
        }

        warn!(job_id = %job.id, error = %primary_error, "Primary delivery failed, sending as document");
        let fallback = Upload {
            destination: job.destination.clone(),
            path: path.to_path_buf(),
            file_name,
            caption: None,
            kind: UploadKind::Document,
        };

        match self.transport.send_file(fallback).await {
            Ok(()) => {
                record(DeliveryStrategy::Fallback, "success");
                Ok(DeliveryReceipt {
                    strategy: DeliveryStrategy::Fallback,
                    kind: UploadKind::Document,
                })
            }
            Err(e) => {
                record(DeliveryStrategy::Fallback, "failed");
                Err(DeliveryError {
                    destination: job.destination.clone(),
                    primary: primary_error,
                    fallback: Some(e.to_string()),
                })
            }
        }
    }

    /// Removes a local artifact. Returns false if the file could not be
    /// removed; a missing file counts as removed.
    pub async fn cleanup(&self, path: &Path) -> bool {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed artifact");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove artifact");
                false
            }
        }
    }

    /// Removes a finished batch's directory and anything left inside it.
    ///
    /// Best effort like [`cleanup`](Self::cleanup); a missing directory counts
    /// as removed.
    pub async fn cleanup_dir(&self, dir: &Path) -> bool {
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => {
                debug!(dir = %dir.display(), "Removed batch directory");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Failed to remove batch directory");
                false
            }
        }
    }
}

fn record(strategy: DeliveryStrategy, result: &str) {
    metrics::DELIVERIES
        .with_label_values(&[strategy.as_str(), result])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobKind;
    use crate::testing::MockTransport;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn job() -> Job {
        Job::new("b", "https://h/live/index.m3u8", 1, 1, "chat", JobKind::Stream)
            .with_caption("Lecture 1")
    }

    fn artifact(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"data").unwrap();
        path
    }

    #[test]
    fn test_upload_kind_for() {
        assert_eq!(upload_kind_for(Path::new("0001_a.mp4")), UploadKind::Video);
        assert_eq!(upload_kind_for(Path::new("0001_a.MKV")), UploadKind::Video);
        assert_eq!(upload_kind_for(Path::new("0001_a.pdf")), UploadKind::Document);
        assert_eq!(upload_kind_for(Path::new("0001_file")), UploadKind::Document);
    }

    #[tokio::test]
    async fn test_primary_delivery() {
        let dir = TempDir::new().unwrap();
        let path = artifact(&dir, "0001_index.mp4");
        let transport = Arc::new(MockTransport::new());
        let sink = ResultSink::new(transport.clone(), true);

        let receipt = sink.deliver(&path, &job()).await.unwrap();
        assert_eq!(receipt.strategy, DeliveryStrategy::Primary);
        assert_eq!(receipt.kind, UploadKind::Video);

        let uploads = transport.uploads().await;
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].file_name, "0001_index.mp4");
        assert_eq!(uploads[0].caption.as_deref(), Some("Lecture 1"));
    }

    #[tokio::test]
    async fn test_fallback_after_video_rejected() {
        let dir = TempDir::new().unwrap();
        let path = artifact(&dir, "0001_index.mp4");
        let transport = Arc::new(MockTransport::new());
        transport.reject_upload_kind(UploadKind::Video).await;
        let sink = ResultSink::new(transport.clone(), true);

        let receipt = sink.deliver(&path, &job()).await.unwrap();
        assert_eq!(receipt.strategy, DeliveryStrategy::Fallback);

        let uploads = transport.uploads().await;
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].kind, UploadKind::Document);
        assert_eq!(uploads[0].caption, None);
        assert_eq!(transport.upload_attempts().await, 2);
    }

    #[tokio::test]
    async fn test_exactly_one_fallback_then_error() {
        let dir = TempDir::new().unwrap();
        let path = artifact(&dir, "0001_a.pdf");
        let transport = Arc::new(MockTransport::new());
        transport.set_fail_uploads(true).await;
        let sink = ResultSink::new(transport.clone(), true);

        let err = sink.deliver(&path, &job()).await.unwrap_err();
        assert!(err.fallback_attempted());
        assert_eq!(err.destination, "chat");
        assert_eq!(transport.upload_attempts().await, 2);
    }

    #[tokio::test]
    async fn test_no_fallback_when_disabled() {
        let dir = TempDir::new().unwrap();
        let path = artifact(&dir, "0001_a.pdf");
        let transport = Arc::new(MockTransport::new());
        transport.set_fail_uploads(true).await;
        let sink = ResultSink::new(transport.clone(), false);

        let err = sink.deliver(&path, &job()).await.unwrap_err();
        assert!(!err.fallback_attempted());
        assert_eq!(transport.upload_attempts().await, 1);
    }

    #[tokio::test]
    async fn test_cleanup() {
        let dir = TempDir::new().unwrap();
        let path = artifact(&dir, "0001_a.pdf");
        let sink = ResultSink::new(Arc::new(MockTransport::new()), true);

        assert!(sink.cleanup(&path).await);
        assert!(!path.exists());
        // Already gone
        assert!(sink.cleanup(&path).await);
        // A directory cannot be removed as a file
        assert!(!sink.cleanup(dir.path()).await);
    }

    #[tokio::test]
    async fn test_cleanup_dir() {
        let root = TempDir::new().unwrap();
        let batch_dir = root.path().join("batch-1");
        std::fs::create_dir_all(&batch_dir).unwrap();
        std::fs::write(batch_dir.join("0001_a.pdf.part"), b"partial").unwrap();
        let sink = ResultSink::new(Arc::new(MockTransport::new()), true);

        assert!(sink.cleanup_dir(&batch_dir).await);
        assert!(!batch_dir.exists());
        assert!(sink.cleanup_dir(&batch_dir).await);
    }
}
