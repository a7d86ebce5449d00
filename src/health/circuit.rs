//! Per-worker circuit breaker.
//!
//! # States
//! - Closed/Healthy: worker receives traffic
//! - Open: worker excluded from selection
//!
//! # State Transitions
//! ```text
//! Closed → Open: consec_failures reaches the threshold
//! Open → Closed: the next successful probe or forward
//! ```
//!
//! # Design Decisions
//! - Probe and forward outcomes feed the same counter
//! - Recovery is on-next-success; there is no recovery timer, an open
//!   circuit stays open until a probe or forward succeeds

use crate::registry::Worker;

pub const DEFAULT_CIRCUIT_THRESHOLD: u32 = 3;

/// Folds probe and forward outcomes into the per-worker failure counter
/// and circuit flag.
#[derive(Debug, Clone)]
pub struct CircuitTracker {
    threshold: u32,
}

impl CircuitTracker {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    /// Any success closes the circuit, restores health, and zeroes the
    /// consecutive-failure counter.
    pub fn record_success(&self, worker: &Worker) {
        if worker.note_success() {
            tracing::info!(worker = %worker.name, "worker recovered, circuit closed");
        }
    }

    /// Any failure bumps the counter; the circuit opens at the threshold
    /// and the worker leaves the eligible set.
    pub fn record_failure(&self, worker: &Worker) {
        if worker.note_failure(self.threshold) {
            tracing::warn!(
                worker = %worker.name,
                threshold = self.threshold,
                "circuit opened after consecutive failures"
            );
        }
    }
}

impl Default for CircuitTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CIRCUIT_THRESHOLD)
    }
}
