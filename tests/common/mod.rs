//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use url::Url;

use task_dispatcher::config::DispatcherConfig;
use task_dispatcher::registry::WorkerConfig;
use task_dispatcher::{HttpServer, Shutdown};

/// A scripted backend worker with programmable task and health status.
pub struct MockWorker {
    pub addr: SocketAddr,
    task_status: Arc<AtomicU16>,
    health_status: Arc<AtomicU16>,
    task_hits: Arc<AtomicUsize>,
}

impl MockWorker {
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).unwrap()
    }

    pub fn task_hits(&self) -> usize {
        self.task_hits.load(Ordering::SeqCst)
    }

    pub fn set_task_status(&self, code: u16) {
        self.task_status.store(code, Ordering::SeqCst);
    }

    pub fn set_health_status(&self, code: u16) {
        self.health_status.store(code, Ordering::SeqCst);
    }
}

/// Start a mock worker. `/task` answers with the given status and echoes
/// the task id; `/health` starts healthy; `/config` serves a small
/// settings document.
pub async fn spawn_worker(task_status_code: u16) -> MockWorker {
    let task_status = Arc::new(AtomicU16::new(task_status_code));
    let health_status = Arc::new(AtomicU16::new(200));
    let task_hits = Arc::new(AtomicUsize::new(0));

    let task_handler = {
        let status = task_status.clone();
        let hits = task_hits.clone();
        move |body: Bytes| {
            let status = status.clone();
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                let code = StatusCode::from_u16(status.load(Ordering::SeqCst)).unwrap();
                let request: Value = serde_json::from_slice(&body).unwrap_or_else(|_| json!({}));
                let id = request.get("id").cloned().unwrap_or(Value::Null);
                (code, Json(json!({ "id": id, "result": "done" })))
            }
        }
    };
    let health_handler = {
        let status = health_status.clone();
        move || {
            let status = status.clone();
            async move {
                let code = StatusCode::from_u16(status.load(Ordering::SeqCst)).unwrap();
                (code, Json(json!({ "status": "ok" })))
            }
        }
    };

    let app = Router::new()
        .route("/task", post(task_handler))
        .route("/health", get(health_handler))
        .route(
            "/config",
            get(|| async { Json(json!({ "mode": "standard", "delayMs": 25 })) })
                .put(|| async { Json(json!({ "status": "accepted" })) })
                .post(|| async { Json(json!({ "status": "accepted" })) }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockWorker {
        addr,
        task_status,
        health_status,
        task_hits,
    }
}

pub fn worker_config(name: &str, worker: &MockWorker, weight: u32) -> WorkerConfig {
    WorkerConfig {
        name: name.to_string(),
        url: worker.url(),
        color: "#3B82F6".to_string(),
        weight,
        max_load: 3,
    }
}

/// Configuration for tests: given workers, active probing off so the
/// scenario controls every outcome signal.
pub fn base_config(workers: Vec<WorkerConfig>) -> DispatcherConfig {
    let mut config = DispatcherConfig::default();
    config.workers = workers;
    config.health.enabled = false;
    config
}

pub struct TestDispatcher {
    pub base_url: String,
    pub shutdown: Shutdown,
}

impl TestDispatcher {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Bind an ephemeral port and run a dispatcher on it.
pub async fn spawn_dispatcher(config: DispatcherConfig) -> TestDispatcher {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let run_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, run_shutdown).await;
    });

    TestDispatcher {
        base_url: format!("http://{}", addr),
        shutdown,
    }
}
