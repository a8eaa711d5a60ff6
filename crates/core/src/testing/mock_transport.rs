//! Mock transport for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::job::Batch;
use crate::transport::{Transport, TransportError, Upload, UploadKind};

/// A recorded text message for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMessage {
    pub destination: String,
    pub text: String,
}

/// Mock implementation of the Transport trait.
///
/// Provides controllable behavior for testing:
/// - Queue batches returned by `receive_batch`
/// - Record messages and successful uploads
/// - Fail messages, all uploads, or uploads of one kind
///
/// # Example
///
/// ```rust,ignore
/// use batchfetch_core::testing::MockTransport;
///
/// let transport = Arc::new(MockTransport::new());
/// transport.reject_upload_kind(UploadKind::Video).await;
///
/// // Run the pool...
///
/// let uploads = transport.uploads().await;
/// assert_eq!(uploads[0].kind, UploadKind::Document);
/// ```
#[derive(Debug, Default)]
pub struct MockTransport {
    /// Batches handed out by `receive_batch`.
    batches: Arc<RwLock<VecDeque<Batch>>>,
    /// Recorded messages.
    messages: Arc<RwLock<Vec<RecordedMessage>>>,
    /// Uploads that succeeded.
    uploads: Arc<RwLock<Vec<Upload>>>,
    /// Every `send_file` call, successful or not.
    upload_attempts: Arc<RwLock<usize>>,
    fail_messages: Arc<RwLock<bool>>,
    fail_uploads: Arc<RwLock<bool>>,
    /// Upload kinds that are rejected.
    rejected_kinds: Arc<RwLock<Vec<UploadKind>>>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a batch for `receive_batch`.
    pub async fn push_batch(&self, batch: Batch) {
        self.batches.write().await.push_back(batch);
    }

    /// Get all recorded messages.
    pub async fn messages(&self) -> Vec<RecordedMessage> {
        self.messages.read().await.clone()
    }

    /// Get recorded message texts containing `needle`.
    pub async fn messages_containing(&self, needle: &str) -> Vec<String> {
        self.messages
            .read()
            .await
            .iter()
            .filter(|m| m.text.contains(needle))
            .map(|m| m.text.clone())
            .collect()
    }

    /// Get all successful uploads.
    pub async fn uploads(&self) -> Vec<Upload> {
        self.uploads.read().await.clone()
    }

    /// Get the number of `send_file` calls.
    pub async fn upload_attempts(&self) -> usize {
        *self.upload_attempts.read().await
    }

    /// Make every `send_message` fail.
    pub async fn set_fail_messages(&self, fail: bool) {
        *self.fail_messages.write().await = fail;
    }

    /// Make every `send_file` fail.
    pub async fn set_fail_uploads(&self, fail: bool) {
        *self.fail_uploads.write().await = fail;
    }

    /// Reject uploads of the given kind.
    pub async fn reject_upload_kind(&self, kind: UploadKind) {
        self.rejected_kinds.write().await.push(kind);
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn receive_batch(&self) -> Option<Batch> {
        self.batches.write().await.pop_front()
    }

    async fn send_message(&self, destination: &str, text: &str) -> Result<(), TransportError> {
        if *self.fail_messages.read().await {
            return Err(TransportError::Send {
                destination: destination.to_string(),
                reason: "mock send failure".to_string(),
            });
        }
        self.messages.write().await.push(RecordedMessage {
            destination: destination.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_file(&self, upload: Upload) -> Result<(), TransportError> {
        *self.upload_attempts.write().await += 1;

        if *self.fail_uploads.read().await {
            return Err(TransportError::upload(
                &upload.destination,
                &upload.path,
                "mock upload failure",
            ));
        }
        if self.rejected_kinds.read().await.contains(&upload.kind) {
            return Err(TransportError::upload(
                &upload.destination,
                &upload.path,
                format!("{} uploads rejected", upload.kind.as_str()),
            ));
        }
        // The artifact must still be on disk when it is handed over.
        if !tokio::fs::try_exists(&upload.path).await.unwrap_or(false) {
            return Err(TransportError::upload(
                &upload.destination,
                &upload.path,
                "file does not exist",
            ));
        }

        self.uploads.write().await.push(upload);
        Ok(())
    }
}
