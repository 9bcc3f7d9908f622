//! Prometheus metrics for colorin
//!
//! This module provides metrics tracking for:
//! - Engine: assignments created per source, failures per operation and kind,
//!   operation latency, current distribution spread
//! - HTTP API: requests per endpoint and status, request latency
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for engine metrics
struct EngineMetrics {
    assignments_created: CounterVec,
    assignment_failures: CounterVec,
    operation_duration: HistogramVec,
    distribution_spread: Gauge,
}

/// Container for HTTP metrics
struct ApiMetrics {
    requests: CounterVec,
    duration: HistogramVec,
}

static ENGINE_METRICS: OnceLock<EngineMetrics> = OnceLock::new();

static API_METRICS: OnceLock<ApiMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

/// Where an assignment came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentSource {
    Auto,
    Bulk,
    Manual,
}

impl AssignmentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Bulk => "bulk",
            Self::Manual => "manual",
        }
    }
}

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// Safe to call more than once; only the first call registers anything.
/// If registration fails, subsequent metric operations become no-ops.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = colorin::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let engine = EngineMetrics {
        assignments_created: register_counter_vec!(
            "colorin_assignments_created_total",
            "Total assignments created by source",
            &["source"]
        )?,
        assignment_failures: register_counter_vec!(
            "colorin_assignment_failures_total",
            "Total failed assignment operations by operation and error kind",
            &["operation", "kind"]
        )?,
        operation_duration: register_histogram_vec!(
            "colorin_operation_duration_seconds",
            "Engine operation duration in seconds",
            &["operation"],
            vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]
        )?,
        distribution_spread: register_gauge!(
            "colorin_distribution_spread",
            "Difference between the most and least loaded active teacher"
        )?,
    };

    let api = ApiMetrics {
        requests: register_counter_vec!(
            "colorin_api_requests_total",
            "Total API requests by endpoint and status",
            &["endpoint", "status"]
        )?,
        duration: register_histogram_vec!(
            "colorin_api_request_duration_seconds",
            "API request duration in seconds",
            &["endpoint"],
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
        )?,
    };

    ENGINE_METRICS
        .set(engine)
        .map_err(|_| "Engine metrics already initialized")?;
    API_METRICS
        .set(api)
        .map_err(|_| "API metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    ENGINE_METRICS.get().is_some() && API_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record newly created assignments
pub fn record_assignments_created(source: AssignmentSource, count: usize) {
    if count == 0 {
        return;
    }
    if let Some(m) = ENGINE_METRICS.get() {
        m.assignments_created
            .with_label_values(&[source.as_str()])
            .inc_by(count as f64);
    }
}

/// Record a failed engine operation
pub fn record_assignment_failure(operation: &str, kind: &str) {
    if let Some(m) = ENGINE_METRICS.get() {
        m.assignment_failures
            .with_label_values(&[operation, kind])
            .inc();
    }
}

/// Publish the latest distribution spread
pub fn update_distribution_spread(diff: u32) {
    if let Some(m) = ENGINE_METRICS.get() {
        m.distribution_spread.set(f64::from(diff));
    }
}

/// Record API request
pub fn record_api_request(endpoint: &str, status: u16, duration_secs: f64) {
    let Some(m) = API_METRICS.get() else {
        return;
    };

    let status_str = status.to_string();
    m.requests
        .with_label_values(&[endpoint, &status_str])
        .inc();
    m.duration
        .with_label_values(&[endpoint])
        .observe(duration_secs);
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Start timing an engine operation
pub fn start_operation_timer(operation: &str) -> MetricsTimer {
    match ENGINE_METRICS.get() {
        Some(m) => MetricsTimer::new(
            m.operation_duration
                .with_label_values(&[operation])
                .start_timer(),
        ),
        None => MetricsTimer::noop(),
    }
}

// ============================================================================
// Tests
// ============================================================================
