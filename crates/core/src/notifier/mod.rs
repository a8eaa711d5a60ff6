//! Notifier module for rate-limited progress reporting.
//!
//! Intermediate updates are throttled per reporting context: the first
//! update in a window is sent, the rest are dropped until the interval has
//! passed. Final per-job messages and batch announcements are never
//! throttled.

mod progress;
mod throttle;

pub use progress::{
    failed_text, format_bytes, progress_bar, progress_text, started_text, succeeded_text,
    summary_text, BAR_CELLS,
};
pub use throttle::Notifier;
