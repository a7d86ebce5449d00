//! Metrics collection and exposition.

use std::sync::OnceLock;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Histogram buckets for request duration: exponential from 1 ms.
const DURATION_BUCKETS_MS: [f64; 15] = [
    1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0, 256.0, 512.0, 1024.0, 2048.0, 4096.0, 8192.0,
    16384.0,
];

/// Install the global Prometheus recorder and return a render handle for
/// the `/metrics` route.
///
/// The recorder is process-global, so installation happens once; later
/// calls return the same handle (integration tests build several
/// servers in one process).
pub fn install() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .set_buckets_for_metric(
                    Matcher::Full("lb_request_duration_ms".to_string()),
                    &DURATION_BUCKETS_MS,
                )
                .expect("duration buckets must be non-empty")
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

/// Count one dispatched request; `worker` is `"none"` when the eligible
/// set was empty.
pub fn record_request(worker: &str, status: &str) {
    let labels = [
        ("worker", worker.to_string()),
        ("status", status.to_string()),
    ];
    counter!("lb_requests_total", &labels).increment(1);
}

pub fn record_duration(worker: &str, millis: f64) {
    histogram!("lb_request_duration_ms", "worker" => worker.to_string()).record(millis);
}

pub fn record_worker_health(worker: &str, healthy: bool) {
    let value = if healthy { 1.0 } else { 0.0 };
    gauge!("lb_worker_health", "worker" => worker.to_string()).set(value);
}

pub fn record_worker_load(worker: &str, load: i64) {
    gauge!("lb_worker_active_connections", "worker" => worker.to_string()).set(load as f64);
}
