//! Dispatcher API handlers.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::balancer::Algorithm;
use crate::error::DispatchError;
use crate::http::server::AppState;
use crate::registry::StatusSnapshot;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.registry.snapshot())
}

/// `POST /task`: normalize the body, dispatch, and relay the augmented
/// worker response.
pub async fn submit_task(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, DispatchError> {
    let payload = normalize_task(&body);
    let result = state.forwarder.dispatch(payload).await?;
    Ok(Json(result))
}

/// A missing or malformed task body is tolerated, defaulting the weight.
fn normalize_task(body: &[u8]) -> Value {
    match serde_json::from_slice::<Map<String, Value>>(body) {
        Ok(map) => Value::Object(map),
        Err(_) => json!({ "weight": 1.0 }),
    }
}

pub async fn get_algorithm(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "algorithm": state.registry.algorithm(),
        "available": Algorithm::names(),
    }))
}

#[derive(Debug, Deserialize)]
struct AlgorithmRequest {
    algorithm: String,
}

/// `PUT`/`POST /algorithm`: validate, switch, broadcast, echo.
pub async fn set_algorithm(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, DispatchError> {
    let request: AlgorithmRequest =
        serde_json::from_slice(&body).map_err(|_| DispatchError::InvalidBody)?;
    let algorithm: Algorithm = request.algorithm.parse()?;

    state.registry.set_algorithm(algorithm);
    tracing::info!(algorithm = %algorithm, "selection algorithm changed");
    state.broadcaster.broadcast();

    Ok(Json(json!({
        "algorithm": algorithm,
        "available": Algorithm::names(),
    })))
}

#[derive(Debug, Deserialize)]
struct UpdateWorkerRequest {
    enabled: Option<bool>,
    weight: Option<i64>,
}

/// `PATCH /workers/{name}`: operator toggle and weight change.
pub async fn update_worker(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, DispatchError> {
    let request: UpdateWorkerRequest =
        serde_json::from_slice(&body).map_err(|_| DispatchError::InvalidBody)?;

    if !state
        .registry
        .update_worker(&name, request.enabled, request.weight)
    {
        return Err(DispatchError::WorkerNotFound(name));
    }

    tracing::info!(
        worker = %name,
        enabled = ?request.enabled,
        weight = ?request.weight,
        "worker updated"
    );
    state.broadcaster.broadcast();
    Ok(Json(json!({ "status": "updated" })))
}

/// `GET`/`PUT`/`POST /workers/{name}/config`: transparent proxy to the
/// worker's own `/config`. JSON object responses are augmented with the
/// worker name; anything else passes through unchanged.
pub async fn worker_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
    method: Method,
    body: Bytes,
) -> Result<Response, DispatchError> {
    let worker = state
        .registry
        .find(&name)
        .ok_or_else(|| DispatchError::WorkerNotFound(name.clone()))?;
    let url = worker.endpoint("/config");

    let request = if method == Method::GET {
        state.config_client.get(&url)
    } else if method == Method::PUT {
        state
            .config_client
            .put(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
    } else {
        state
            .config_client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
    };

    let response = request.send().await.map_err(|err| {
        tracing::warn!(worker = %worker.name, error = %err, "config proxy failed");
        DispatchError::WorkerUnreachable(err)
    })?;

    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let bytes = response
        .bytes()
        .await
        .map_err(DispatchError::WorkerUnreachable)?;

    match serde_json::from_slice::<Map<String, Value>>(&bytes) {
        Ok(mut map) => {
            map.insert("worker".to_string(), Value::from(worker.name.clone()));
            Ok((status, Json(Value::Object(map))).into_response())
        }
        Err(_) => {
            let content_type =
                content_type.unwrap_or_else(|| "application/octet-stream".to_string());
            Ok((status, [(header::CONTENT_TYPE, content_type)], bytes).into_response())
        }
    }
}

pub async fn render_metrics(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
        .into_response()
}
