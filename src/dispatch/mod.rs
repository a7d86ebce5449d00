//! Task forwarding: the hot path.
//!
//! # Data Flow
//! ```text
//! POST /task body (normalized JSON)
//!     → select an eligible worker (balancer)
//!     → account load + request counters (RAII guard)
//!     → POST {worker}/task with a 30 s timeout
//!     → observe latency, release load
//!     → classify outcome, feed the circuit tracker
//!     → augment the worker's body and respond
//! ```
//!
//! # Design Decisions
//! - The load guard decrements on every exit path, so the net change to
//!   `current_load` is zero for every forward
//! - Transport errors and status ≥ 500 are failures; 4xx is passed
//!   through as a worker-level success
//! - At-most-once forwarding: the dispatcher never retries

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};

use crate::balancer::Selector;
use crate::broadcast::Broadcaster;
use crate::error::DispatchError;
use crate::health::CircuitTracker;
use crate::observability::metrics;
use crate::registry::{Registry, Worker};

/// Executes the select → forward → respond path for one task.
pub struct Forwarder {
    registry: Arc<Registry>,
    selector: Selector,
    tracker: CircuitTracker,
    broadcaster: Arc<Broadcaster>,
    client: reqwest::Client,
}

impl Forwarder {
    pub fn new(
        registry: Arc<Registry>,
        tracker: CircuitTracker,
        broadcaster: Arc<Broadcaster>,
        forward_timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(forward_timeout)
            .build()
            .expect("failed to build forwarding client");
        Self {
            registry,
            selector: Selector::new(),
            tracker,
            broadcaster,
            client,
        }
    }

    /// Dispatch one task to a selected worker. On success, returns the
    /// worker's JSON body augmented with `worker`, `workerColor`, and
    /// `processingTimeMs`.
    pub async fn dispatch(&self, payload: Value) -> Result<Value, DispatchError> {
        let (algorithm, workers) = self.registry.selection_view();
        let Some(worker) = self.selector.pick(algorithm, &workers) else {
            metrics::record_request("none", "error");
            return Err(DispatchError::NoHealthyWorkers);
        };

        let guard = worker.begin_forward();
        let start = Instant::now();
        let result = self
            .client
            .post(worker.endpoint("/task"))
            .json(&payload)
            .send()
            .await;
        let elapsed = start.elapsed();
        metrics::record_duration(&worker.name, elapsed.as_secs_f64() * 1000.0);
        drop(guard);

        match result {
            Ok(response) if !response.status().is_server_error() => {
                self.tracker.record_success(&worker);
                metrics::record_request(&worker.name, "success");

                // A non-JSON or non-object body is tolerated as {}.
                let mut body = match response.json::<Value>().await {
                    Ok(Value::Object(map)) => map,
                    _ => Map::new(),
                };
                body.insert("worker".to_string(), Value::from(worker.name.clone()));
                body.insert("workerColor".to_string(), Value::from(worker.color.clone()));
                body.insert(
                    "processingTimeMs".to_string(),
                    Value::from(elapsed.as_millis() as u64),
                );

                self.broadcaster.broadcast();
                Ok(Value::Object(body))
            }
            Ok(response) => {
                tracing::warn!(
                    worker = %worker.name,
                    status = %response.status(),
                    "worker returned a server error"
                );
                self.record_forward_failure(&worker);
                Err(DispatchError::WorkerFailed)
            }
            Err(err) => {
                tracing::warn!(worker = %worker.name, error = %err, "forward failed");
                self.record_forward_failure(&worker);
                Err(DispatchError::WorkerFailed)
            }
        }
    }

    fn record_forward_failure(&self, worker: &Worker) {
        worker.record_failed_forward();
        self.tracker.record_failure(worker);
        metrics::record_request(&worker.name, "error");
    }
}
