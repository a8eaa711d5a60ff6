//! Trait definitions for the transport module.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::job::Batch;

use super::error::TransportError;

/// How an artifact is presented to the recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Playable media.
    Video,
    /// Generic file attachment.
    Document,
}

impl UploadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Document => "document",
        }
    }
}

/// A file to hand to a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub destination: String,
    pub path: PathBuf,
    /// Name shown to the recipient.
    pub file_name: String,
    pub caption: Option<String>,
    pub kind: UploadKind,
}

/// Source of batches and sink for messages and files.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns the name of this transport implementation.
    fn name(&self) -> &str;

    /// Waits for the next batch. `None` means no more batches will arrive.
    async fn receive_batch(&self) -> Option<Batch>;

    /// Sends a text message.
    async fn send_message(&self, destination: &str, text: &str) -> Result<(), TransportError>;

    /// Sends a file.
    async fn send_file(&self, upload: Upload) -> Result<(), TransportError>;
}
