//! Trait definitions for the fetcher module.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::watch;

use super::error::FetchError;

/// Byte-level progress of a running download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchProgress {
    pub downloaded_bytes: u64,
    /// From `Content-Length`, when the server sent one.
    pub total_bytes: Option<u64>,
}

impl FetchProgress {
    /// Completion percentage, when the total size is known.
    pub fn percent(&self) -> Option<f32> {
        match self.total_bytes {
            Some(total) if total > 0 => {
                Some((self.downloaded_bytes as f32 / total as f32 * 100.0).min(100.0))
            }
            _ => None,
        }
    }
}

/// A fetcher that can download a resource to a local file.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Downloads `url` into `dest`.
    ///
    /// Returns immediately when `dest` already exists.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<PathBuf, FetchError>;

    /// Downloads `url` into `dest`, publishing progress as it goes.
    ///
    /// Only the latest progress value is kept in the channel; slow readers
    /// skip intermediate values. The sender is dropped when the download ends.
    async fn fetch_with_progress(
        &self,
        url: &str,
        dest: &Path,
        progress_tx: watch::Sender<FetchProgress>,
    ) -> Result<PathBuf, FetchError>;
}
