//! FFmpeg-based transcoder implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::TranscodeConfig;
use crate::metrics;

use super::error::TranscodeError;
use super::limiter::ConversionLimiter;
use super::traits::Transcoder;

/// Maximum number of diagnostic bytes kept from a failed process.
pub const DIAGNOSTIC_LIMIT: usize = 400;

/// Remuxes streams by running one `ffmpeg -c copy` process per call.
pub struct FfmpegTranscoder {
    config: TranscodeConfig,
    limiter: ConversionLimiter,
}

impl FfmpegTranscoder {
    /// Creates a transcoder that draws slots from `limiter`.
    pub fn new(config: TranscodeConfig, limiter: ConversionLimiter) -> Self {
        Self { config, limiter }
    }

    /// Builds ffmpeg arguments for a stream copy into `dest`.
    fn build_args(&self, url: &str, dest: &Path) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            self.config.log_level.clone(),
            "-y".to_string(), // Overwrite output
            "-i".to_string(),
            url.to_string(),
            "-c".to_string(),
            "copy".to_string(),
        ];

        args.extend(self.config.extra_args.iter().cloned());
        args.push(dest.to_string_lossy().to_string());

        args
    }

    /// Runs one remux process. The caller holds the limiter slot.
    async fn run_process(
        &self,
        url: &str,
        dest: &Path,
        limit: Option<Duration>,
    ) -> Result<PathBuf, TranscodeError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = self.build_args(url, dest);
        debug!(ffmpeg = %self.config.ffmpeg_path.display(), ?args, "Spawning remux process");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    TranscodeError::Io(e)
                }
            })?;
        metrics::CONVERSIONS_STARTED.inc();

        let stderr = child.stderr.take();
        let run = async {
            let (status, diagnostics) =
                tokio::join!(child.wait(), read_diagnostics(stderr, DIAGNOSTIC_LIMIT));
            Ok::<_, std::io::Error>((status?, diagnostics))
        };

        let result = match limit {
            Some(limit) => tokio::time::timeout(limit, run).await,
            None => Ok(run.await),
        };

        let (status, diagnostics) = match result {
            Ok(Ok(done)) => done,
            Ok(Err(e)) => return Err(TranscodeError::Io(e)),
            Err(_) => {
                // Kill the process on timeout
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed out remux process");
                }
                return Err(TranscodeError::Timeout {
                    timeout_secs: limit.map(|l| l.as_secs()).unwrap_or_default(),
                });
            }
        };

        if !status.success() {
            return Err(TranscodeError::conversion_failed(status.code(), diagnostics));
        }

        if !tokio::fs::try_exists(dest).await.unwrap_or(false) {
            return Err(TranscodeError::MissingOutput {
                path: dest.to_path_buf(),
            });
        }

        Ok(dest.to_path_buf())
    }
}

/// Drains `reader` to EOF, keeping at most `limit` leading bytes.
///
/// The pipe must be drained fully or a chatty process blocks on a full pipe
/// and never exits.
async fn read_diagnostics<R: AsyncRead + Unpin>(reader: Option<R>, limit: usize) -> String {
    let Some(mut reader) = reader else {
        return String::new();
    };

    let mut kept = Vec::with_capacity(limit);
    let mut buf = [0u8; 1024];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = limit.saturating_sub(kept.len());
                kept.extend_from_slice(&buf[..n.min(room)]);
            }
        }
    }

    String::from_utf8_lossy(&kept).trim().to_string()
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn convert(
        &self,
        url: &str,
        dest: &Path,
        timeout: Option<Duration>,
    ) -> Result<PathBuf, TranscodeError> {
        let _slot = self.limiter.acquire().await?;
        let start = Instant::now();
        info!(url, dest = %dest.display(), "Starting remux");

        let result = self.run_process(url, dest, timeout).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }

        let outcome = if result.is_ok() { "success" } else { "failed" };
        metrics::CONVERSION_DURATION
            .with_label_values(&[outcome])
            .observe(start.elapsed().as_secs_f64());

        result
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await;

        match output {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TranscodeError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                })
            }
            Err(e) => Err(TranscodeError::Io(e)),
        }
    }
}
