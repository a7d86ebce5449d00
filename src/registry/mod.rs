//! Worker registry.
//!
//! # Responsibilities
//! - Own the canonical worker list and the active algorithm
//! - Expose reads as consistent value-copy snapshots
//! - Guard structural mutations with one reader/writer lock
//!
//! # Design Decisions
//! - The list shape and algorithm share a single `RwLock`; counters are
//!   atomics on the workers themselves, so the forwarding path only ever
//!   takes the read side
//! - Workers are appended at startup and live for the process lifetime

mod worker;

pub use worker::{LoadGuard, Worker, WorkerConfig, WorkerSnapshot};

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::balancer::Algorithm;

/// Immutable value copy of the dispatcher's externally observable state,
/// used for `/status` replies and push-stream frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub algorithm: Algorithm,
    pub workers: Vec<WorkerSnapshot>,
}

struct Inner {
    workers: Vec<Arc<Worker>>,
    algorithm: Algorithm,
}

/// Owns worker state; see module docs for the locking discipline.
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            inner: RwLock::new(Inner {
                workers: Vec::new(),
                algorithm,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a worker. Startup only; there is no runtime add or remove.
    pub fn add_worker(&self, config: WorkerConfig) {
        self.write().workers.push(Arc::new(Worker::new(config)));
    }

    pub fn workers(&self) -> Vec<Arc<Worker>> {
        self.read().workers.clone()
    }

    pub fn find(&self, name: &str) -> Option<Arc<Worker>> {
        self.read().workers.iter().find(|w| w.name == name).cloned()
    }

    pub fn algorithm(&self) -> Algorithm {
        self.read().algorithm
    }

    pub fn set_algorithm(&self, algorithm: Algorithm) {
        self.write().algorithm = algorithm;
    }

    /// Algorithm and worker list captured under a single read lock, so a
    /// selection pass works from one consistent view.
    pub fn selection_view(&self) -> (Algorithm, Vec<Arc<Worker>>) {
        let inner = self.read();
        (inner.algorithm, inner.workers.clone())
    }

    /// Apply operator changes to a worker. `enabled` applies
    /// unconditionally; `weight` only when strictly positive, preserving
    /// the previous weight otherwise. Returns false for unknown names.
    pub fn update_worker(&self, name: &str, enabled: Option<bool>, weight: Option<i64>) -> bool {
        let inner = self.write();
        let Some(worker) = inner.workers.iter().find(|w| w.name == name) else {
            return false;
        };
        if let Some(enabled) = enabled {
            worker.set_enabled(enabled);
        }
        if let Some(weight) = weight {
            if let Ok(weight) = u32::try_from(weight) {
                if weight > 0 {
                    worker.set_weight(weight);
                }
            }
        }
        true
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let inner = self.read();
        StatusSnapshot {
            algorithm: inner.algorithm,
            workers: inner.workers.iter().map(|w| w.snapshot()).collect(),
        }
    }
}
