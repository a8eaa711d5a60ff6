//! Error types for job processing.

use thiserror::Error;

use crate::fetcher::FetchError;
use crate::sink::DeliveryError;
use crate::transcoder::TranscodeError;

/// Why a job ended in `Failed`. Caught at the worker boundary.
#[derive(Debug, Error)]
pub enum JobError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    /// The transfer broke off or could not be written.
    #[error("{0}")]
    Transfer(String),

    /// The remux process failed.
    #[error("{0}")]
    Conversion(String),

    /// The remux process ran past its deadline.
    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The artifact could not be handed over.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// Local I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Processing panicked.
    #[error("Job panicked: {0}")]
    Panicked(String),
}

impl JobError {
    /// Error category name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::Transfer(_) => "transfer",
            Self::Conversion(_) => "conversion",
            Self::Timeout { .. } => "timeout",
            Self::Delivery(_) => "delivery",
            Self::Io(_) => "io",
            Self::Panicked(_) => "panic",
        }
    }

    /// Builds a panic error from a `catch_unwind` payload.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        Self::Panicked(message)
    }
}

impl From<FetchError> for JobError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Http { url, status } => Self::Http { url, status },
            other => Self::Transfer(other.to_string()),
        }
    }
}

impl From<TranscodeError> for JobError {
    fn from(err: TranscodeError) -> Self {
        match err {
            TranscodeError::Timeout { timeout_secs } => Self::Timeout { timeout_secs },
            other => Self::Conversion(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_errors_map_to_kinds() {
        let http: JobError = FetchError::Http {
            url: "https://h/a".to_string(),
            status: 404,
        }
        .into();
        assert_eq!(http.kind(), "http");
        assert_eq!(http.to_string(), "HTTP 404 from https://h/a");

        let transfer: JobError = FetchError::transfer("https://h/a", 10, "reset").into();
        assert_eq!(transfer.kind(), "transfer");
    }

    #[test]
    fn test_transcode_errors_map_to_kinds() {
        let timeout: JobError = TranscodeError::Timeout { timeout_secs: 5 }.into();
        assert_eq!(timeout.kind(), "timeout");

        let failed: JobError = TranscodeError::conversion_failed(Some(1), "bad input").into();
        assert_eq!(failed.kind(), "conversion");
        assert!(failed.to_string().contains("bad input"));

        let spawn: JobError = TranscodeError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "permission denied",
        ))
        .into();
        assert_eq!(spawn.kind(), "conversion");
        assert!(spawn.to_string().contains("permission denied"));
    }

    #[test]
    fn test_from_panic() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(JobError::from_panic(payload.as_ref()).to_string(), "Job panicked: boom");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(JobError::from_panic(payload.as_ref()).kind(), "panic");

        let payload: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(
            JobError::from_panic(payload.as_ref()).to_string(),
            "Job panicked: unknown panic"
        );
    }
}
