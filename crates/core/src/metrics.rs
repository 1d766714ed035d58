//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Scratch storage (bytes ingested, artifacts left resident)
//! - Conversions (count and duration per stage)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Storage Metrics
// =============================================================================

/// Upload bytes written to scratch storage.
pub static BYTES_INGESTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "previewer_bytes_ingested_total",
        "Total upload bytes written to scratch storage",
    )
    .unwrap()
});

/// Previews currently registered for retrieval.
pub static ARTIFACTS_REGISTERED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "previewer_artifacts_registered",
        "Number of previews currently registered for retrieval",
    )
    .unwrap()
});

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Conversions total by stage and result.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("previewer_conversions_total", "Total conversions"),
        &["stage", "result"], // stage: "intermediate", "preview"; result: "success", "failed"
    )
    .unwrap()
});

/// Conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "previewer_conversion_duration_seconds",
            "Duration of a single ffmpeg conversion",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 900.0]),
        &["stage"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Storage
        Box::new(BYTES_INGESTED.clone()),
        Box::new(ARTIFACTS_REGISTERED.clone()),
        // Conversions
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
    ]
}
