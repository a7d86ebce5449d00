//! Dispatcher error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the dispatch core and its HTTP surface.
///
/// Display strings double as the wire-level `error` field, so the
/// client-visible messages live here rather than in the handlers.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Request body could not be decoded.
    #[error("Invalid request")]
    InvalidBody,

    /// Algorithm name outside the known set.
    #[error("Invalid algorithm: {0}")]
    UnknownAlgorithm(String),

    /// No registered worker matches the given name.
    #[error("Worker not found: {0}")]
    WorkerNotFound(String),

    /// The eligible set was empty at selection time.
    #[error("No healthy workers available")]
    NoHealthyWorkers,

    /// The selected worker returned a server error or was unreachable.
    #[error("Worker failed")]
    WorkerFailed,

    /// A worker could not be reached on the config proxy route.
    #[error("Failed to reach worker")]
    WorkerUnreachable(#[source] reqwest::Error),
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::InvalidBody | DispatchError::UnknownAlgorithm(_) => {
                StatusCode::BAD_REQUEST
            }
            DispatchError::WorkerNotFound(_) => StatusCode::NOT_FOUND,
            DispatchError::NoHealthyWorkers | DispatchError::WorkerFailed => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            DispatchError::WorkerUnreachable(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
