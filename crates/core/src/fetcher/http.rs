//! reqwest based fetcher implementation.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::debug;

use crate::config::FetchConfig;
use crate::metrics;

use super::error::FetchError;
use super::traits::{FetchProgress, Fetcher};

/// Streams HTTP bodies to disk using one shared `reqwest::Client`.
///
/// `Client` is internally reference counted, so clones of this fetcher share
/// one connection pool across all workers.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Creates a fetcher with its own client.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Temporary file the body is streamed into before the final rename.
    fn part_path(dest: &Path) -> PathBuf {
        let mut name = dest.as_os_str().to_owned();
        name.push(".part");
        PathBuf::from(name)
    }

    fn write_error(path: &Path, source: std::io::Error) -> FetchError {
        FetchError::Write {
            path: path.to_path_buf(),
            source,
        }
    }

    async fn run_fetch(
        &self,
        url: &str,
        dest: &Path,
        progress_tx: Option<&watch::Sender<FetchProgress>>,
    ) -> Result<PathBuf, FetchError> {
        if fs::try_exists(dest).await.unwrap_or(false) {
            debug!(url, dest = %dest.display(), "Destination already present, skipping download");
            return Ok(dest.to_path_buf());
        }

        let request = self.client.get(url).header(ACCEPT, "*/*");
        let response = timeout(self.config.timeout(), request.send())
            .await
            .map_err(|_| {
                FetchError::transfer(
                    url,
                    0,
                    format!("no response within {}s", self.config.timeout_secs),
                )
            })?
            .map_err(|e| FetchError::transfer(url, 0, error_chain(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::write_error(parent, e))?;
        }

        let part = Self::part_path(dest);
        match self.stream_body(url, response, &part, progress_tx).await {
            Ok(bytes) => {
                fs::rename(&part, dest)
                    .await
                    .map_err(|e| Self::write_error(dest, e))?;
                metrics::BYTES_FETCHED.inc_by(bytes);
                debug!(url, bytes, dest = %dest.display(), "Download complete");
                Ok(dest.to_path_buf())
            }
            Err(e) => {
                let _ = fs::remove_file(&part).await;
                Err(e)
            }
        }
    }

    /// Copies the response body into `part` in fixed-size writes.
    async fn stream_body(
        &self,
        url: &str,
        response: Response,
        part: &Path,
        progress_tx: Option<&watch::Sender<FetchProgress>>,
    ) -> Result<u64, FetchError> {
        let total_bytes = response.content_length();
        let mut file = File::create(part)
            .await
            .map_err(|e| Self::write_error(part, e))?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        loop {
            let next = timeout(self.config.timeout(), stream.next())
                .await
                .map_err(|_| {
                    FetchError::transfer(
                        url,
                        written,
                        format!("stalled for {}s", self.config.timeout_secs),
                    )
                })?;

            let Some(chunk) = next else { break };
            let chunk = chunk.map_err(|e| FetchError::transfer(url, written, error_chain(&e)))?;

            for piece in chunk.chunks(self.config.chunk_size) {
                file.write_all(piece)
                    .await
                    .map_err(|e| Self::write_error(part, e))?;
            }
            written += chunk.len() as u64;

            if let Some(tx) = progress_tx {
                tx.send_replace(FetchProgress {
                    downloaded_bytes: written,
                    total_bytes,
                });
            }
        }

        file.flush().await.map_err(|e| Self::write_error(part, e))?;

        if let Some(expected) = total_bytes {
            if written < expected {
                return Err(FetchError::transfer(
                    url,
                    written,
                    format!("body ended early, expected {} bytes", expected),
                ));
            }
        }

        Ok(written)
    }
}

/// Renders an error together with its sources; reqwest's top-level message
/// alone rarely says what went wrong.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str, dest: &Path) -> Result<PathBuf, FetchError> {
        self.run_fetch(url, dest, None).await
    }

    async fn fetch_with_progress(
        &self,
        url: &str,
        dest: &Path,
        progress_tx: watch::Sender<FetchProgress>,
    ) -> Result<PathBuf, FetchError> {
        self.run_fetch(url, dest, Some(&progress_tx)).await
    }
}
