//! Weighted random selection.

use std::sync::Arc;

use rand::Rng;

use crate::balancer::Strategy;
use crate::registry::Worker;

/// Draws a worker with probability proportional to its weight. Weights
/// are captured once per selection so a concurrent weight change cannot
/// desynchronize the walk from the drawn value.
///
/// A zero-weight worker is never chosen while any positive-weight worker
/// is eligible; when every eligible weight is zero the first eligible
/// worker is returned.
#[derive(Debug, Default)]
pub struct Weighted;

impl Weighted {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for Weighted {
    fn pick(&self, workers: &[Arc<Worker>]) -> Option<Arc<Worker>> {
        let eligible: Vec<(&Arc<Worker>, u64)> = workers
            .iter()
            .filter(|w| w.is_eligible())
            .map(|w| (w, u64::from(w.weight())))
            .collect();
        if eligible.is_empty() {
            return None;
        }

        let total: u64 = eligible.iter().map(|(_, weight)| weight).sum();
        if total == 0 {
            return Some(Arc::clone(eligible[0].0));
        }

        let mut r = rand::thread_rng().gen_range(0..total);
        for (worker, weight) in &eligible {
            if r < *weight {
                return Some(Arc::clone(worker));
            }
            r -= weight;
        }
        None
    }
}
