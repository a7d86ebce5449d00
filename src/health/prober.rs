//! Active health probing.
//!
//! # Responsibilities
//! - Probe every registered worker's `/health` on a tick
//! - Feed outcomes to the circuit tracker
//! - Refresh the per-worker health and load gauges
//!
//! # Design Decisions
//! - Dedicated client with a short timeout, distinct from forwarding
//! - At most one in-flight probe per worker: a slow worker does not
//!   accumulate probe tasks across ticks
//! - Runs as a background task and exits on the shutdown signal

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::health::CircuitTracker;
use crate::observability::metrics;
use crate::registry::{Registry, Worker};

/// Periodic driver for the circuit tracker's active signal source.
pub struct HealthProber {
    registry: Arc<Registry>,
    tracker: CircuitTracker,
    client: reqwest::Client,
    interval: Duration,
}

impl HealthProber {
    pub fn new(
        registry: Arc<Registry>,
        tracker: CircuitTracker,
        interval: Duration,
        probe_timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(probe_timeout)
            .build()
            .expect("failed to build health probe client");
        Self {
            registry,
            tracker,
            client,
            interval,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.probe_all(),
                _ = shutdown.recv() => {
                    tracing::debug!("health prober stopping");
                    return;
                }
            }
        }
    }

    fn probe_all(&self) {
        for worker in self.registry.workers() {
            if !worker.try_begin_probe() {
                tracing::debug!(worker = %worker.name, "previous probe still in flight, skipping");
                continue;
            }
            let tracker = self.tracker.clone();
            let client = self.client.clone();
            tokio::spawn(async move {
                probe_worker(&client, &tracker, &worker).await;
                worker.end_probe();
            });
        }
    }
}

/// One probe: 200 is healthy, anything else (including transport errors
/// and timeouts) counts as a failure.
async fn probe_worker(client: &reqwest::Client, tracker: &CircuitTracker, worker: &Worker) {
    let healthy = match client.get(worker.endpoint("/health")).send().await {
        Ok(response) => response.status() == reqwest::StatusCode::OK,
        Err(err) => {
            tracing::debug!(worker = %worker.name, error = %err, "health probe failed");
            false
        }
    };

    if healthy {
        tracker.record_success(worker);
    } else {
        tracker.record_failure(worker);
    }

    metrics::record_worker_health(&worker.name, healthy);
    metrics::record_worker_load(&worker.name, worker.current_load());
}
