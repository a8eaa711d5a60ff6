//! Trait definitions for the transcoder module.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::TranscodeError;

/// A transcoder that turns a streaming playlist into a single local file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Remuxes `url` into `dest`.
    ///
    /// Implementations hold one conversion slot for the whole call and kill
    /// the underlying process when `timeout` elapses.
    async fn convert(
        &self,
        url: &str,
        dest: &Path,
        timeout: Option<Duration>,
    ) -> Result<PathBuf, TranscodeError>;

    /// Validates that the transcoder is properly configured and ready.
    async fn validate(&self) -> Result<(), TranscodeError> {
        Ok(())
    }
}
