//! File-backed transport for running batches without a chat service.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::TransportConfig;
use crate::job::Batch;

use super::error::TransportError;
use super::traits::{Transport, Upload};

const MESSAGE_LOG: &str = "messages.log";

/// Batch file contents: a single batch or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum BatchFile {
    Many(Vec<Batch>),
    One(Batch),
}

/// Reads batches from a JSON file and writes everything it is asked to send
/// under `outbox_dir/<destination>/`.
pub struct LocalTransport {
    outbox_dir: PathBuf,
    pending: Mutex<VecDeque<Batch>>,
}

impl LocalTransport {
    /// Creates a transport with no pending batches.
    pub fn new(outbox_dir: impl Into<PathBuf>) -> Self {
        Self {
            outbox_dir: outbox_dir.into(),
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Creates a transport and loads the configured batch file, if any.
    pub async fn from_config(config: &TransportConfig) -> Result<Self, TransportError> {
        let transport = Self::new(config.outbox_dir.clone());
        if let Some(path) = &config.batch_file {
            let batches = load_batches(path).await?;
            info!(path = %path.display(), batches = batches.len(), "Loaded batch file");
            transport.pending.lock().await.extend(batches);
        }
        Ok(transport)
    }

    /// Queues batches to be returned by `receive_batch`.
    pub fn with_batches(self, batches: Vec<Batch>) -> Self {
        Self {
            outbox_dir: self.outbox_dir,
            pending: Mutex::new(batches.into()),
        }
    }

    pub fn outbox_dir(&self) -> &Path {
        &self.outbox_dir
    }

    /// Outbox folder for a destination, with unsafe characters replaced.
    pub fn destination_dir(&self, destination: &str) -> PathBuf {
        let safe: String = destination
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let safe = if safe.is_empty() {
            "_".to_string()
        } else {
            safe
        };
        self.outbox_dir.join(safe)
    }
}

/// Parses batch file JSON.
pub(crate) fn parse_batches(text: &str) -> Result<Vec<Batch>, serde_json::Error> {
    Ok(match serde_json::from_str::<BatchFile>(text)? {
        BatchFile::Many(batches) => batches,
        BatchFile::One(batch) => vec![batch],
    })
}

async fn load_batches(path: &Path) -> Result<Vec<Batch>, TransportError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| TransportError::BatchSource {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    parse_batches(&text).map_err(|e| TransportError::BatchSource {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl Transport for LocalTransport {
    fn name(&self) -> &str {
        "local"
    }

    async fn receive_batch(&self) -> Option<Batch> {
        self.pending.lock().await.pop_front()
    }

    async fn send_message(&self, destination: &str, text: &str) -> Result<(), TransportError> {
        info!(destination, "{}", text);

        let dir = self.destination_dir(destination);
        tokio::fs::create_dir_all(&dir).await?;
        let mut log = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(MESSAGE_LOG))
            .await?;
        let line = format!("{} {}\n", chrono::Utc::now().to_rfc3339(), text);
        log.write_all(line.as_bytes()).await?;
        log.flush().await?;
        Ok(())
    }

    async fn send_file(&self, upload: Upload) -> Result<(), TransportError> {
        if !tokio::fs::try_exists(&upload.path).await.unwrap_or(false) {
            return Err(TransportError::upload(
                &upload.destination,
                &upload.path,
                "file does not exist",
            ));
        }

        let dir = self.destination_dir(&upload.destination);
        tokio::fs::create_dir_all(&dir).await?;
        let target = dir.join(&upload.file_name);
        tokio::fs::copy(&upload.path, &target)
            .await
            .map_err(|e| TransportError::upload(&upload.destination, &upload.path, e.to_string()))?;

        debug!(
            destination = %upload.destination,
            kind = upload.kind.as_str(),
            caption = upload.caption.as_deref().unwrap_or(""),
            target = %target.display(),
            "File written to outbox"
        );
        Ok(())
    }
}
