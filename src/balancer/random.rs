//! Uniform random selection.

use std::sync::Arc;

use rand::Rng;

use crate::balancer::Strategy;
use crate::registry::Worker;

/// Picks uniformly from the eligible set.
#[derive(Debug, Default)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for Random {
    fn pick(&self, workers: &[Arc<Worker>]) -> Option<Arc<Worker>> {
        let eligible: Vec<&Arc<Worker>> = workers.iter().filter(|w| w.is_eligible()).collect();
        if eligible.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..eligible.len());
        Some(Arc::clone(eligible[idx]))
    }
}
