//! Error types for the fetcher module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while downloading a resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    /// The connection failed or stalled before the body was complete.
    #[error("Transfer of {url} failed after {bytes_written} bytes: {reason}")]
    Transfer {
        url: String,
        bytes_written: u64,
        reason: String,
    },

    /// Writing the downloaded bytes to disk failed.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// Creates a transfer error.
    pub fn transfer(url: impl Into<String>, bytes_written: u64, reason: impl Into<String>) -> Self {
        Self::Transfer {
            url: url.into(),
            bytes_written,
            reason: reason.into(),
        }
    }
}
