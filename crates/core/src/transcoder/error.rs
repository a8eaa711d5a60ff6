//! Error types for the transcoder module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while remuxing a stream.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// The remux process exited unsuccessfully.
    #[error("Conversion failed with exit code {code:?}: {diagnostics}")]
    ConversionFailed {
        code: Option<i32>,
        /// Leading bytes of the process diagnostic output.
        diagnostics: String,
    },

    /// The remux process exceeded its deadline and was killed.
    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The process reported success but left no output file.
    #[error("Conversion produced no output at {path}")]
    MissingOutput { path: PathBuf },

    /// The limiter was closed while waiting for a slot.
    #[error("Conversion limiter closed")]
    LimiterClosed,

    /// I/O error while spawning or waiting on the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscodeError {
    /// Creates a conversion failed error.
    pub fn conversion_failed(code: Option<i32>, diagnostics: impl Into<String>) -> Self {
        Self::ConversionFailed {
            code,
            diagnostics: diagnostics.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_diagnostics() {
        let err = TranscodeError::conversion_failed(Some(1), "Invalid data found");
        assert_eq!(
            err.to_string(),
            "Conversion failed with exit code Some(1): Invalid data found"
        );
    }
}
