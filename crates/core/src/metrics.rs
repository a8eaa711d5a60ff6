//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Jobs (outcomes by kind, duration)
//! - Fetching and remuxing (bytes, active conversions)
//! - Notifications and deliveries

use once_cell::sync::Lazy;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

// =============================================================================
// Job Metrics
// =============================================================================

/// Jobs finished total by kind and result.
pub static JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("batchfetch_jobs_total", "Total jobs finished"),
        &["kind", "result"], // kind: "plain", "stream"; result: "done", "failed"
    )
    .unwrap()
});

/// Job duration in seconds, from dequeue to terminal state.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("batchfetch_job_duration_seconds", "Duration of jobs").buckets(vec![
            0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 3600.0,
        ]),
        &["kind"],
    )
    .unwrap()
});

/// Jobs currently being processed by a worker.
pub static JOBS_IN_PROGRESS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "batchfetch_jobs_in_progress",
        "Jobs currently held by a worker",
    )
    .unwrap()
});

// =============================================================================
// Fetch / Remux Metrics
// =============================================================================

/// Body bytes written to disk by the fetcher.
pub static BYTES_FETCHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("batchfetch_bytes_fetched_total", "Total bytes fetched").unwrap()
});

/// Remux processes started total.
pub static CONVERSIONS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "batchfetch_conversions_started_total",
        "Total remux processes started",
    )
    .unwrap()
});

/// Conversion slots currently held.
pub static CONVERSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "batchfetch_conversions_active",
        "Conversion limiter slots currently held",
    )
    .unwrap()
});

/// Conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "batchfetch_conversion_duration_seconds",
            "Duration of stream remuxes",
        )
        .buckets(vec![
            1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0,
        ]),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

// =============================================================================
// Reporting Metrics
// =============================================================================

/// Progress notifications by outcome.
pub static NOTIFICATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("batchfetch_notifications_total", "Total progress notifications"),
        &["outcome"], // "sent", "suppressed", "failed"
    )
    .unwrap()
});

/// Artifact deliveries by strategy and result.
pub static DELIVERIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("batchfetch_deliveries_total", "Total artifact deliveries"),
        &["strategy", "result"], // strategy: "primary", "fallback"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_TOTAL.clone()),
        Box::new(JOB_DURATION.clone()),
        Box::new(JOBS_IN_PROGRESS.clone()),
        // Fetch / remux
        Box::new(BYTES_FETCHED.clone()),
        Box::new(CONVERSIONS_STARTED.clone()),
        Box::new(CONVERSIONS_ACTIVE.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        // Reporting
        Box::new(NOTIFICATIONS.clone()),
        Box::new(DELIVERIES.clone()),
    ]
}

/// Builds a registry holding every core metric.
pub fn registry() -> Result<Registry, prometheus::Error> {
    let registry = Registry::new();
    for metric in all_metrics() {
        registry.register(metric)?;
    }
    Ok(registry)
}
