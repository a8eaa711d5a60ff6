//! Job, batch and status types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::naming::{artifact_basename, batch_dir_name, detect_kind};

/// Unique job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a link is turned into an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Downloaded byte for byte.
    Plain,
    /// Streaming playlist remuxed into a single file by an external process.
    Stream,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Plain => "plain",
            JobKind::Stream => "stream",
        }
    }
}

/// Lifecycle of a job. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Done,
    Failed,
}

impl JobStatus {
    /// Whether no further transitions can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::InProgress)
                | (JobStatus::InProgress, JobStatus::Done)
                | (JobStatus::InProgress, JobStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::InProgress => "in_progress",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }
}

/// Rejected status change.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid job transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// One unit of work: a single link to fetch or remux.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Identifier of the batch this job was submitted with.
    pub batch_id: String,
    pub source_url: String,
    /// 1-based position within the batch.
    pub sequence_index: usize,
    pub total_in_batch: usize,
    /// Where progress and the artifact are sent.
    pub destination: String,
    pub kind: JobKind,
    /// Optional caption attached to the delivered file.
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    status: JobStatus,
}

impl Job {
    /// Creates a queued job.
    pub fn new(
        batch_id: impl Into<String>,
        source_url: impl Into<String>,
        sequence_index: usize,
        total_in_batch: usize,
        destination: impl Into<String>,
        kind: JobKind,
    ) -> Self {
        Self {
            id: JobId::new(),
            batch_id: batch_id.into(),
            source_url: source_url.into(),
            sequence_index,
            total_in_batch,
            destination: destination.into(),
            kind,
            caption: None,
            created_at: Utc::now(),
            status: JobStatus::Queued,
        }
    }

    /// Sets the delivery caption.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Moves the job to `next`, rejecting backwards or post-terminal moves.
    pub fn advance(&mut self, next: JobStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Artifact file name: `{sequence_index:04}_{basename}`.
    pub fn artifact_name(&self) -> String {
        format!(
            "{:04}_{}",
            self.sequence_index,
            artifact_basename(&self.source_url, self.kind)
        )
    }

    /// Directory inside `work_dir` shared by every job of this job's batch.
    pub fn batch_dir(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(batch_dir_name(&self.batch_id))
    }

    /// Artifact location inside the batch directory.
    pub fn artifact_path(&self, work_dir: &Path) -> PathBuf {
        self.batch_dir(work_dir).join(self.artifact_name())
    }

    /// Short human label, e.g. `#2/5 0002_lecture.pdf`.
    pub fn label(&self) -> String {
        format!(
            "#{}/{} {}",
            self.sequence_index,
            self.total_in_batch,
            self.artifact_name()
        )
    }
}

/// A single link in a submitted batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub url: String,
    pub destination: String,
    #[serde(default)]
    pub caption: Option<String>,
    /// Overrides kind detection from the URL.
    #[serde(default)]
    pub kind: Option<JobKind>,
}

impl BatchItem {
    pub fn new(url: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            caption: None,
            kind: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_kind(mut self, kind: JobKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// An ordered set of links submitted together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    #[serde(default = "new_batch_id")]
    pub id: String,
    pub items: Vec<BatchItem>,
}

fn new_batch_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Batch {
    pub fn new(items: Vec<BatchItem>) -> Self {
        Self {
            id: new_batch_id(),
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Splits the batch into queued jobs tagged with position and batch size.
    pub fn into_jobs(self) -> Vec<Job> {
        let total = self.items.len();
        let batch_id = self.id;
        self.items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| {
                let kind = item.kind.unwrap_or_else(|| detect_kind(&item.url));
                let job = Job::new(
                    batch_id.clone(),
                    item.url,
                    idx + 1,
                    total,
                    item.destination,
                    kind,
                );
                match item.caption {
                    Some(caption) => job.with_caption(caption),
                    None => job,
                }
            })
            .collect()
    }
}
