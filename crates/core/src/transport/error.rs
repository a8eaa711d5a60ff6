//! Error types for the transport module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while talking to a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A text message could not be delivered.
    #[error("Failed to send message to {destination}: {reason}")]
    Send { destination: String, reason: String },

    /// A file upload was rejected.
    #[error("Failed to upload {path} to {destination}: {reason}")]
    Upload {
        destination: String,
        path: PathBuf,
        reason: String,
    },

    /// The batch source could not be read.
    #[error("Invalid batch source {path}: {reason}")]
    BatchSource { path: PathBuf, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Creates an upload error.
    pub fn upload(
        destination: impl Into<String>,
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Upload {
            destination: destination.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }
}
