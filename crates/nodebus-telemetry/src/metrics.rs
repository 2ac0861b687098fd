//! Prometheus metrics for the node runtime.
//!
//! All metrics follow the naming convention: `nodebus_<metric>_<unit>`
//!
//! Metrics are process-wide statics; updating one that was never registered
//! is harmless, it simply never shows up in [`encode_metrics`].

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Loop checks that returned "continue", per node
    pub static ref LOOP_ITERATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("nodebus_loop_iterations_total", "Loop checks that let the node continue"),
        &["node"]
    ).expect("metric creation failed");

    /// Loop iterations whose body exceeded the node's period
    pub static ref LOOP_OVERRUNS: IntCounterVec = IntCounterVec::new(
        Opts::new("nodebus_loop_overruns_total", "Loop iterations that exceeded the period"),
        &["node"]
    ).expect("metric creation failed");

    /// Node threads currently inside their run body
    pub static ref NODES_RUNNING: IntGauge = IntGauge::new(
        "nodebus_nodes_running",
        "Number of node threads currently running"
    ).expect("metric creation failed");

    /// Pacing sleep per loop check
    pub static ref LOOP_SLEEP: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "nodebus_loop_sleep_seconds",
            "Time slept by the loop check to hold the node's period"
        ).buckets(exponential_buckets(0.0001, 2.0, 16).expect("valid buckets"))
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; metrics already registered are skipped.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(LOOP_ITERATIONS.clone()),
        Box::new(LOOP_OVERRUNS.clone()),
        Box::new(NODES_RUNNING.clone()),
        Box::new(LOOP_SLEEP.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all registered metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
