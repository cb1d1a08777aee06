//! Observability module for logging setup, spans and metrics recording.
//!
//! This module provides:
//! - Structured logging with configurable levels (pretty or JSON output)
//! - Span helpers for transcription requests and individual strips
//! - Metric recording through the `metrics` facade
//!
//! No metrics exporter is installed here; without a global recorder the
//! metric calls are no-ops.

use anyhow::Result;
use tracing_subscriber::prelude::*;

use crate::config::{LogFormat, LoggingConfig};

/// Initialize structured logging with tracing and configuration
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;

    // Pretty formatting for development, JSON for everything else
    if config.is_development() || config.format == LogFormat::Pretty {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        "Tracing initialized with structured logging"
    );

    Ok(())
}

/// Filter honouring `RUST_LOG`, with the crate and preprocessing targets at
/// the configured level.
pub fn build_filter(config: &LoggingConfig) -> Result<tracing_subscriber::EnvFilter> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("transcribex={}", config.log_level).parse()?)
        .add_directive(format!("ocr_preprocessing={}", config.log_level).parse()?);
    Ok(filter)
}

/// Create a span for OCR operations
pub fn ocr_span(operation: &str) -> tracing::Span {
    tracing::info_span!("ocr_operation", operation = operation, component = "ocr")
}

/// Create a span for the recognition of one strip
pub fn strip_span(index: usize, strip_count: usize) -> tracing::Span {
    tracing::info_span!(
        "ocr_strip",
        strip = index,
        strip_count = strip_count,
        component = "ocr"
    )
}

/// Record OCR operation metrics
pub fn record_ocr_metrics(success: bool, duration: std::time::Duration, image_size: u64) {
    metrics::counter!("ocr_operations_total", "result" => if success { "success" } else { "failure" }).increment(1);
    metrics::histogram!("ocr_duration_seconds").record(duration.as_secs_f64());
    metrics::histogram!("ocr_image_size_bytes").record(image_size as f64);
}

/// Record the outcome of one strip
pub fn record_strip_metrics(success: bool, duration: std::time::Duration) {
    metrics::counter!("ocr_strips_total", "result" => if success { "success" } else { "failure" }).increment(1);
    metrics::histogram!("ocr_strip_duration_seconds").record(duration.as_secs_f64());
}
