//! Snapshot fan-out to push-stream subscribers.
//!
//! # Responsibilities
//! - Track subscribed push-stream clients
//! - Serialize the registry snapshot once per broadcast
//! - Deliver frames without letting one slow client stall the rest
//!
//! # Design Decisions
//! - The subscriber map is independent of the registry lock
//! - Each subscriber gets a bounded send queue drained by its own writer
//!   task; a full or closed queue drops the subscriber
//! - Frames are complete snapshots, never diffs

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::registry::Registry;

/// Queue depth per subscriber; a client this far behind is dropped
/// rather than back-pressuring the dispatcher.
const SUBSCRIBER_QUEUE_DEPTH: usize = 32;

/// Multiplexes registry snapshots to all subscribed clients.
pub struct Broadcaster {
    registry: Arc<Registry>,
    subscribers: DashMap<u64, mpsc::Sender<String>>,
    next_id: AtomicU64,
}

impl Broadcaster {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a push-stream client. The first snapshot is queued
    /// immediately so the client never waits for a tick.
    pub fn subscribe(&self) -> (u64, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_DEPTH);
        match self.serialize_snapshot() {
            Ok(frame) => {
                let _ = tx.try_send(frame);
            }
            Err(err) => tracing::error!(error = %err, "failed to serialize initial snapshot"),
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.insert(id, tx);
        tracing::debug!(subscriber = id, "push-stream client subscribed");
        (id, rx)
    }

    pub fn unsubscribe(&self, id: u64) {
        if self.subscribers.remove(&id).is_some() {
            tracing::debug!(subscriber = id, "push-stream client unsubscribed");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Serialize the current snapshot once and queue it to every
    /// subscriber.
    pub fn broadcast(&self) {
        if self.subscribers.is_empty() {
            return;
        }
        let frame = match self.serialize_snapshot() {
            Ok(frame) => frame,
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize snapshot");
                return;
            }
        };
        self.subscribers.retain(|id, tx| match tx.try_send(frame.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(subscriber = id, "subscriber queue full, dropping client");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }

    /// Periodic broadcast loop; exits when the shutdown signal fires.
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.broadcast(),
                _ = shutdown.recv() => {
                    tracing::debug!("broadcaster stopping");
                    return;
                }
            }
        }
    }

    fn serialize_snapshot(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.registry.snapshot())
    }
}
