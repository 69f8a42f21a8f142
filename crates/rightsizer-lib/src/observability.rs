//! Observability infrastructure for the rightsizer
//!
//! Provides:
//! - Prometheus metrics (tick latency, failures by kind, resizes, utilization)
//! - Structured JSON event records with tracing

use crate::models::{ContainerResourceSpec, ResizeDecision, UtilizationReport};
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    GaugeVec, Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for tick latency (in seconds)
const TICK_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ResizerMetricsInner> = OnceLock::new();

struct ResizerMetricsInner {
    tick_duration_seconds: Histogram,
    ticks_total: IntCounter,
    tick_failures_total: IntCounterVec,
    resizes_total: IntCounterVec,
    utilization_percent: GaugeVec,
    request_canonical: GaugeVec,
}

impl ResizerMetricsInner {
    fn new() -> Self {
        Self {
            tick_duration_seconds: register_histogram!(
                "rightsizer_tick_duration_seconds",
                "Time spent in one control tick, sleep excluded",
                TICK_BUCKETS.to_vec()
            )
            .expect("Failed to register tick_duration_seconds"),

            ticks_total: register_int_counter!(
                "rightsizer_ticks_total",
                "Control ticks started"
            )
            .expect("Failed to register ticks_total"),

            tick_failures_total: register_int_counter_vec!(
                "rightsizer_tick_failures_total",
                "Control ticks that ended early, by error kind",
                &["kind"]
            )
            .expect("Failed to register tick_failures_total"),

            resizes_total: register_int_counter_vec!(
                "rightsizer_resizes_total",
                "Request updates applied",
                &["resource", "direction"]
            )
            .expect("Failed to register resizes_total"),

            utilization_percent: register_gauge_vec!(
                "rightsizer_utilization_percent",
                "Last observed usage as a percentage of request",
                &["container", "resource"]
            )
            .expect("Failed to register utilization_percent"),

            request_canonical: register_gauge_vec!(
                "rightsizer_request_canonical",
                "Last observed request in canonical units (millicores, MiB)",
                &["container", "resource"]
            )
            .expect("Failed to register request_canonical"),
        }
    }
}

/// Controller metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct ResizerMetrics {
    _private: (),
}

impl Default for ResizerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ResizerMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ResizerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ResizerMetricsInner {
        GLOBAL_METRICS.get_or_init(ResizerMetricsInner::new)
    }

    pub fn inc_ticks(&self) {
        self.inner().ticks_total.inc();
    }

    pub fn observe_tick_duration(&self, duration_secs: f64) {
        self.inner().tick_duration_seconds.observe(duration_secs);
    }

    pub fn inc_tick_failure(&self, kind: &str) {
        self.inner()
            .tick_failures_total
            .with_label_values(&[kind])
            .inc();
    }

    pub fn inc_resize(&self, decision: &ResizeDecision) {
        self.inner()
            .resizes_total
            .with_label_values(&[decision.kind.request_key(), decision.reason.as_str()])
            .inc();
    }

    /// Record the utilization and requests observed for one container
    pub fn set_container_state(&self, report: &UtilizationReport, spec: &ContainerResourceSpec) {
        let inner = self.inner();
        let name = report.container_name.as_str();

        inner
            .utilization_percent
            .with_label_values(&[name, "cpu"])
            .set(report.cpu_pct);
        inner
            .utilization_percent
            .with_label_values(&[name, "memory"])
            .set(report.mem_pct);
        inner
            .request_canonical
            .with_label_values(&[name, "cpu"])
            .set(spec.cpu_request);
        inner
            .request_canonical
            .with_label_values(&[name, "memory"])
            .set(spec.memory_request);
    }
}

/// Structured logger for controller events
///
/// Every record carries an `event` field and the target pod, so the JSON
/// output can be filtered per controller instance.
#[derive(Clone)]
pub struct StructuredLogger {
    namespace: String,
    pod_name: String,
}

impl StructuredLogger {
    pub fn new(namespace: impl Into<String>, pod_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            pod_name: pod_name.into(),
        }
    }

    /// The per-container, per-tick utilization record
    pub fn log_utilization(&self, report: &UtilizationReport, spec: &ContainerResourceSpec) {
        info!(
            event = "utilization_sampled",
            namespace = %self.namespace,
            pod = %self.pod_name,
            container = %report.container_name,
            cpu_pct = report.cpu_pct,
            cpu_request = %spec.raw_cpu_request,
            mem_pct = report.mem_pct,
            mem_request = %spec.raw_memory_request,
            "Container utilization"
        );
    }

    pub fn log_resize(
        &self,
        container: &str,
        decision: &ResizeDecision,
        previous: f64,
        quantity: &str,
        applied_to: &[String],
    ) {
        info!(
            event = "resize_applied",
            namespace = %self.namespace,
            pod = %self.pod_name,
            container = %container,
            resource = %decision.kind,
            reason = decision.reason.as_str(),
            previous_request = previous,
            new_request = decision.new_value,
            unit = decision.kind.canonical_unit(),
            quantity = %quantity,
            applied_to = ?applied_to,
            "Updated resource request"
        );
    }

    pub fn log_tick_failure(&self, kind: &str, retryable: bool, error: &str) {
        warn!(
            event = "tick_failed",
            namespace = %self.namespace,
            pod = %self.pod_name,
            kind = %kind,
            retryable = retryable,
            error = %error,
            "Control tick failed"
        );
    }

    /// Same failure kind repeated across consecutive ticks
    pub fn log_failure_escalated(&self, kind: &str, consecutive: u32, error: &str) {
        error!(
            event = "failure_escalated",
            namespace = %self.namespace,
            pod = %self.pod_name,
            kind = %kind,
            consecutive_failures = consecutive,
            error = %error,
            "Control tick keeps failing the same way, check target and permissions"
        );
    }

    pub fn log_startup(&self, version: &str, interval_secs: u64) {
        info!(
            event = "controller_started",
            namespace = %self.namespace,
            pod = %self.pod_name,
            version = %version,
            poll_interval_secs = interval_secs,
            "Pod rightsizer started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "controller_shutdown",
            namespace = %self.namespace,
            pod = %self.pod_name,
            reason = %reason,
            "Pod rightsizer shutting down"
        );
    }
}
