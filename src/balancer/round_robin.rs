//! Round-robin selection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::balancer::Strategy;
use crate::registry::Worker;

/// Cycles an atomic 64-bit cursor over the full worker list, returning
/// the first eligible worker at or after the cursor position. The scan
/// is bounded by the list length, so an empty eligible set yields `None`
/// rather than spinning.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicU64,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for RoundRobin {
    fn pick(&self, workers: &[Arc<Worker>]) -> Option<Arc<Worker>> {
        if workers.is_empty() {
            return None;
        }
        let n = workers.len() as u64;
        let start = self.cursor.fetch_add(1, Ordering::Relaxed).wrapping_add(1);

        for i in 0..n {
            let worker = &workers[(start.wrapping_add(i) % n) as usize];
            if worker.is_eligible() {
                return Some(Arc::clone(worker));
            }
        }
        None
    }
}
