//! Human-readable progress and outcome messages.

use crate::fetcher::FetchProgress;
use crate::job::{Job, JobKind};
use crate::pool::BatchSummary;

/// Width of the progress bar in cells.
pub const BAR_CELLS: usize = 20;

const FILLED: char = '█';
const EMPTY: char = '░';

/// Renders a fixed-width bar for `percent` (clamped to 0..=100).
pub fn progress_bar(percent: f32) -> String {
    let percent = percent.clamp(0.0, 100.0);
    let filled = ((percent / 100.0) * BAR_CELLS as f32).round() as usize;
    let filled = filled.min(BAR_CELLS);

    let mut bar = String::with_capacity(BAR_CELLS * 3);
    bar.extend(std::iter::repeat(FILLED).take(filled));
    bar.extend(std::iter::repeat(EMPTY).take(BAR_CELLS - filled));
    bar
}

/// Formats a byte count with a binary unit, e.g. `1.5 MB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Message sent when a worker picks up a job.
pub fn started_text(job: &Job) -> String {
    match job.kind {
        JobKind::Plain => format!("Downloading {}", job.label()),
        JobKind::Stream => format!("Converting stream {}", job.label()),
    }
}

/// Intermediate download progress line.
pub fn progress_text(job: &Job, progress: &FetchProgress) -> String {
    match (progress.percent(), progress.total_bytes) {
        (Some(percent), Some(total)) => format!(
            "Downloading {}\n[{}] {:.0}% ({} / {})",
            job.label(),
            progress_bar(percent),
            percent,
            format_bytes(progress.downloaded_bytes),
            format_bytes(total)
        ),
        _ => format!(
            "Downloading {}\n{} received",
            job.label(),
            format_bytes(progress.downloaded_bytes)
        ),
    }
}

/// Final message for a delivered job.
pub fn succeeded_text(job: &Job) -> String {
    format!("Done {}", job.label())
}

/// Final message for a failed job.
pub fn failed_text(job: &Job, reason: &str) -> String {
    format!("Failed {}: {}", job.label(), reason)
}

/// Batch completion message.
pub fn summary_text(summary: &BatchSummary) -> String {
    let mut text = format!(
        "Batch finished: {} of {} completed, {} failed",
        summary.done, summary.total, summary.failed
    );
    if !summary.failed_labels.is_empty() {
        text.push_str("\nFailed: ");
        text.push_str(&summary.failed_labels.join(", "));
    }
    text
}
