//! Worker state and load accounting.
//!
//! # Responsibilities
//! - Represent a single backend worker
//! - Track in-flight forwards and request counters with atomics
//! - Pair every load increment with exactly one decrement

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

/// Static identity and initial settings for one backend worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub name: String,
    pub url: Url,
    /// Opaque UI hint carried through snapshots and task responses.
    pub color: String,
    pub weight: u32,
    pub max_load: u32,
}

/// A single backend worker.
///
/// Identity fields are immutable for the process lifetime. Operational
/// fields are atomics so the forwarding hot path never contends on the
/// registry's structural lock.
#[derive(Debug)]
pub struct Worker {
    pub name: String,
    pub url: Url,
    pub color: String,
    pub max_load: u32,
    weight: AtomicU32,
    enabled: AtomicBool,
    healthy: AtomicBool,
    circuit_open: AtomicBool,
    current_load: AtomicI64,
    total_requests: AtomicU64,
    failed_requests: AtomicU64,
    consec_failures: AtomicU32,
    probe_inflight: AtomicBool,
}

impl Worker {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            name: config.name,
            url: config.url,
            color: config.color,
            max_load: config.max_load,
            weight: AtomicU32::new(config.weight),
            enabled: AtomicBool::new(true),
            healthy: AtomicBool::new(true),
            circuit_open: AtomicBool::new(false),
            current_load: AtomicI64::new(0),
            total_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            consec_failures: AtomicU32::new(0),
            probe_inflight: AtomicBool::new(false),
        }
    }

    /// Endpoint URL for a worker route such as `/task` or `/health`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url.as_str().trim_end_matches('/'), path)
    }

    /// A worker receives traffic only while enabled, healthy, and with a
    /// closed circuit.
    pub fn is_eligible(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
            && self.healthy.load(Ordering::Relaxed)
            && !self.circuit_open.load(Ordering::Relaxed)
    }

    pub fn weight(&self) -> u32 {
        self.weight.load(Ordering::Relaxed)
    }

    pub(crate) fn set_weight(&self, weight: u32) {
        self.weight.store(weight, Ordering::Relaxed);
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn circuit_open(&self) -> bool {
        self.circuit_open.load(Ordering::Relaxed)
    }

    pub fn current_load(&self) -> i64 {
        self.current_load.load(Ordering::Relaxed)
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    pub fn consec_failures(&self) -> u32 {
        self.consec_failures.load(Ordering::Relaxed)
    }

    /// Begin a forward: bumps the request counter and returns a guard
    /// holding one unit of load until dropped.
    pub fn begin_forward(self: &Arc<Self>) -> LoadGuard {
        self.current_load.fetch_add(1, Ordering::Relaxed);
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        LoadGuard {
            worker: Arc::clone(self),
        }
    }

    pub(crate) fn record_failed_forward(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Clear failure state after a successful probe or forward. Returns
    /// true when this flipped the worker back into the eligible set.
    pub(crate) fn note_success(&self) -> bool {
        self.consec_failures.store(0, Ordering::Relaxed);
        let was_open = self.circuit_open.swap(false, Ordering::Relaxed);
        let was_unhealthy = !self.healthy.swap(true, Ordering::Relaxed);
        was_open || was_unhealthy
    }

    /// Count one failure; opens the circuit at `threshold` consecutive
    /// failures. Returns true when the circuit transitioned to open.
    pub(crate) fn note_failure(&self, threshold: u32) -> bool {
        let failures = self.consec_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= threshold {
            self.healthy.store(false, Ordering::Relaxed);
            !self.circuit_open.swap(true, Ordering::Relaxed)
        } else {
            false
        }
    }

    /// Claim the probe slot. A worker whose previous probe has not
    /// completed is skipped on the next tick.
    pub(crate) fn try_begin_probe(&self) -> bool {
        self.probe_inflight
            .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }

    pub(crate) fn end_probe(&self) {
        self.probe_inflight.store(false, Ordering::Relaxed);
    }

    /// Value copy of the externally observable fields, counters read
    /// atomically.
    pub fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot {
            name: self.name.clone(),
            url: self.url.to_string(),
            color: self.color.clone(),
            weight: self.weight(),
            max_load: self.max_load,
            healthy: self.healthy(),
            current_load: self.current_load(),
            enabled: self.enabled(),
            total_requests: self.total_requests(),
            failed_requests: self.failed_requests(),
            circuit_open: self.circuit_open(),
        }
    }
}

/// RAII guard pairing the load increment with exactly one decrement,
/// on every exit path including panic unwinds.
#[derive(Debug)]
pub struct LoadGuard {
    worker: Arc<Worker>,
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        self.worker.current_load.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Per-worker slice of a status snapshot, serialized with the wire field
/// names the dashboard expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSnapshot {
    pub name: String,
    pub url: String,
    pub color: String,
    pub weight: u32,
    pub max_load: u32,
    pub healthy: bool,
    pub current_load: i64,
    pub enabled: bool,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub circuit_open: bool,
}
