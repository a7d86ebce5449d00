//! Least-connections selection.

use std::sync::Arc;

use crate::balancer::Strategy;
use crate::registry::Worker;

/// Selects the eligible worker with the fewest in-flight forwards.
/// Ties resolve to the earliest-registered worker.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for LeastConnections {
    fn pick(&self, workers: &[Arc<Worker>]) -> Option<Arc<Worker>> {
        let mut selected: Option<&Arc<Worker>> = None;
        let mut min_load = i64::MAX;

        for worker in workers {
            if !worker.is_eligible() {
                continue;
            }
            let load = worker.current_load();
            if load < min_load {
                min_load = load;
                selected = Some(worker);
            }
        }
        selected.cloned()
    }
}
