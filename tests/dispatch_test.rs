//! End-to-end dispatch scenarios.

mod common;

use std::time::Duration;

use serde_json::{json, Value};
use task_dispatcher::registry::{StatusSnapshot, WorkerSnapshot};

use common::{base_config, spawn_dispatcher, spawn_worker, worker_config};

async fn fetch_status(client: &reqwest::Client, dispatcher: &common::TestDispatcher) -> StatusSnapshot {
    client
        .get(dispatcher.url("/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

fn worker_named<'a>(snapshot: &'a StatusSnapshot, name: &str) -> &'a WorkerSnapshot {
    snapshot
        .workers
        .iter()
        .find(|w| w.name == name)
        .unwrap_or_else(|| panic!("worker {name} missing from snapshot"))
}

#[tokio::test]
async fn task_is_refused_when_no_workers_are_registered() {
    let dispatcher = spawn_dispatcher(base_config(vec![])).await;
    let client = reqwest::Client::new();

    let response = client
        .post(dispatcher.url("/task"))
        .json(&json!({ "id": "t1", "weight": 1.0 }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 503);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "No healthy workers available" }));

    let metrics = client
        .get(dispatcher.url("/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let line = metrics
        .lines()
        .find(|l| {
            l.starts_with("lb_requests_total")
                && l.contains(r#"worker="none""#)
                && l.contains(r#"status="error""#)
        })
        .expect("none-worker error counter exposed");
    let value: f64 = line.rsplit(' ').next().unwrap().parse().unwrap();
    assert!(value >= 1.0);

    dispatcher.shutdown.trigger();
}

#[tokio::test]
async fn happy_path_augments_the_worker_response() {
    let worker = spawn_worker(200).await;
    let dispatcher =
        spawn_dispatcher(base_config(vec![worker_config("w1", &worker, 1)])).await;
    let client = reqwest::Client::new();

    let response = client
        .post(dispatcher.url("/task"))
        .json(&json!({ "id": "t1", "weight": 1.0 }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["id"], "t1");
    assert_eq!(body["worker"], "w1");
    assert_eq!(body["workerColor"], "#3B82F6");
    assert!(body["processingTimeMs"].as_u64().is_some());

    let snapshot = fetch_status(&client, &dispatcher).await;
    let w1 = worker_named(&snapshot, "w1");
    assert_eq!(w1.total_requests, 1);
    assert_eq!(w1.failed_requests, 0);
    assert_eq!(w1.current_load, 0);
    assert!(w1.healthy);
    assert!(!w1.circuit_open);

    dispatcher.shutdown.trigger();
}

#[tokio::test]
async fn malformed_task_body_is_tolerated() {
    let worker = spawn_worker(200).await;
    let dispatcher =
        spawn_dispatcher(base_config(vec![worker_config("w1", &worker, 1)])).await;
    let client = reqwest::Client::new();

    let response = client
        .post(dispatcher.url("/task"))
        .body("this is not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["worker"], "w1");

    dispatcher.shutdown.trigger();
}

// A worker answering 500 trips its breaker after the third failure and
// is excluded until it recovers.
#[tokio::test]
async fn repeated_failures_open_the_circuit_and_exclude_the_worker() {
    let w1 = spawn_worker(500).await;
    let w2 = spawn_worker(200).await;
    let w3 = spawn_worker(200).await;
    let dispatcher = spawn_dispatcher(base_config(vec![
        worker_config("w1", &w1, 1),
        worker_config("w2", &w2, 1),
        worker_config("w3", &w3, 1),
    ]))
    .await;
    let client = reqwest::Client::new();

    let mut failures = 0;
    for _ in 0..9 {
        let response = client
            .post(dispatcher.url("/task"))
            .json(&json!({ "id": "t", "weight": 1.0 }))
            .send()
            .await
            .unwrap();
        if response.status() == 503 {
            let body: Value = response.json().await.unwrap();
            assert_eq!(body, json!({ "error": "Worker failed" }));
            failures += 1;
        }
    }
    assert_eq!(failures, 3);
    assert_eq!(w1.task_hits(), 3);

    let snapshot = fetch_status(&client, &dispatcher).await;
    let snap_w1 = worker_named(&snapshot, "w1");
    assert!(snap_w1.circuit_open);
    assert!(!snap_w1.healthy);
    assert_eq!(snap_w1.total_requests, 3);
    assert_eq!(snap_w1.failed_requests, 3);

    // The open circuit sheds all further traffic from w1.
    for _ in 0..6 {
        let response = client
            .post(dispatcher.url("/task"))
            .json(&json!({ "id": "t", "weight": 1.0 }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }
    assert_eq!(w1.task_hits(), 3);

    dispatcher.shutdown.trigger();
}

// Three healthy equal-weight workers split nine requests evenly.
#[tokio::test]
async fn round_robin_spreads_requests_evenly() {
    let w1 = spawn_worker(200).await;
    let w2 = spawn_worker(200).await;
    let w3 = spawn_worker(200).await;
    let dispatcher = spawn_dispatcher(base_config(vec![
        worker_config("w1", &w1, 1),
        worker_config("w2", &w2, 1),
        worker_config("w3", &w3, 1),
    ]))
    .await;
    let client = reqwest::Client::new();

    for _ in 0..9 {
        let response = client
            .post(dispatcher.url("/task"))
            .json(&json!({ "id": "t", "weight": 1.0 }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    assert_eq!(w1.task_hits(), 3);
    assert_eq!(w2.task_hits(), 3);
    assert_eq!(w3.task_hits(), 3);

    dispatcher.shutdown.trigger();
}

// For all forward outcomes the net change to currentLoad is zero.
#[tokio::test]
async fn load_returns_to_zero_on_every_outcome() {
    let worker = spawn_worker(500).await;
    let dispatcher =
        spawn_dispatcher(base_config(vec![worker_config("w1", &worker, 1)])).await;
    let client = reqwest::Client::new();

    let mut worker_failures = 0;
    let mut shed = 0;
    for _ in 0..5 {
        let response = client
            .post(dispatcher.url("/task"))
            .json(&json!({ "id": "t", "weight": 1.0 }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 503);
        let body: Value = response.json().await.unwrap();
        match body["error"].as_str().unwrap() {
            "Worker failed" => worker_failures += 1,
            "No healthy workers available" => shed += 1,
            other => panic!("unexpected error body: {other}"),
        }
    }
    // Breaker threshold is 3: the last two requests find nothing eligible.
    assert_eq!(worker_failures, 3);
    assert_eq!(shed, 2);

    let snapshot = fetch_status(&client, &dispatcher).await;
    let w1 = worker_named(&snapshot, "w1");
    assert_eq!(w1.current_load, 0);
    assert_eq!(w1.total_requests, 3);
    assert_eq!(w1.failed_requests, 3);

    dispatcher.shutdown.trigger();
}

#[tokio::test]
async fn disabled_worker_receives_no_traffic() {
    let w1 = spawn_worker(200).await;
    let w2 = spawn_worker(200).await;
    let dispatcher = spawn_dispatcher(base_config(vec![
        worker_config("w1", &w1, 1),
        worker_config("w2", &w2, 1),
    ]))
    .await;
    let client = reqwest::Client::new();

    let response = client
        .patch(dispatcher.url("/workers/w1"))
        .json(&json!({ "enabled": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    for _ in 0..4 {
        let response = client
            .post(dispatcher.url("/task"))
            .json(&json!({ "id": "t", "weight": 1.0 }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }
    assert_eq!(w1.task_hits(), 0);
    assert_eq!(w2.task_hits(), 4);

    dispatcher.shutdown.trigger();
}

// Probe failures and recovery drive the same breaker as forwards.
#[tokio::test]
async fn failing_probes_open_the_circuit_and_recovery_closes_it() {
    let worker = spawn_worker(200).await;
    worker.set_health_status(500);

    let mut config = base_config(vec![worker_config("w1", &worker, 1)]);
    config.health.enabled = true;
    config.health.interval = Duration::from_millis(50);
    let dispatcher = spawn_dispatcher(config).await;
    let client = reqwest::Client::new();

    tokio::time::sleep(Duration::from_secs(1)).await;
    let snapshot = fetch_status(&client, &dispatcher).await;
    let w1 = worker_named(&snapshot, "w1");
    assert!(w1.circuit_open);
    assert!(!w1.healthy);

    let response = client
        .post(dispatcher.url("/task"))
        .json(&json!({ "id": "t", "weight": 1.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);

    worker.set_health_status(200);
    tokio::time::sleep(Duration::from_millis(500)).await;
    let snapshot = fetch_status(&client, &dispatcher).await;
    let w1 = worker_named(&snapshot, "w1");
    assert!(!w1.circuit_open);
    assert!(w1.healthy);

    let response = client
        .post(dispatcher.url("/task"))
        .json(&json!({ "id": "t", "weight": 1.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    dispatcher.shutdown.trigger();
}
