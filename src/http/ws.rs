//! Push-stream subscriptions.
//!
//! On connect the client immediately receives one snapshot frame, then a
//! complete snapshot per broadcast. Inbound frames are drained and
//! ignored; a read error, a write error, or a missed write deadline ends
//! the subscription.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};

use crate::broadcast::Broadcaster;
use crate::http::server::AppState;

/// Per-frame write deadline; a client that cannot accept a frame within
/// this window is dropped.
const WRITE_DEADLINE: Duration = Duration::from_secs(5);

pub async fn handle_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    if !origin_allowed(&state.allowed_origins, &headers) {
        tracing::warn!("push-stream connection rejected: origin not allowed");
        return StatusCode::FORBIDDEN.into_response();
    }
    let broadcaster = state.broadcaster.clone();
    ws.on_upgrade(move |socket| subscriber_session(socket, broadcaster))
}

/// With no configured origins every connection is accepted (development
/// default); otherwise the Origin header must match one exactly.
fn origin_allowed(allowed: &[String], headers: &HeaderMap) -> bool {
    if allowed.is_empty() {
        return true;
    }
    match headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
        Some(origin) => allowed.iter().any(|a| a == origin),
        None => false,
    }
}

async fn subscriber_session(socket: WebSocket, broadcaster: Arc<Broadcaster>) {
    let (id, mut frames) = broadcaster.subscribe();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(frame) = frame else { break };
                let write = tokio::time::timeout(WRITE_DEADLINE, sink.send(Message::Text(frame.into())));
                match write.await {
                    Ok(Ok(())) => {}
                    _ => {
                        tracing::debug!(subscriber = id, "push-stream write failed");
                        break;
                    }
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(_)) => {} // client frames are drained
                    _ => break,
                }
            }
        }
    }

    broadcaster.unsubscribe(id);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_origin(origin: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, origin.parse().unwrap());
        headers
    }

    #[test]
    fn empty_allow_list_accepts_everything() {
        assert!(origin_allowed(&[], &HeaderMap::new()));
        assert!(origin_allowed(
            &[],
            &headers_with_origin("http://anywhere.test")
        ));
    }

    #[test]
    fn configured_origins_match_exactly() {
        let allowed = vec!["http://dash.internal".to_string()];
        assert!(origin_allowed(
            &allowed,
            &headers_with_origin("http://dash.internal")
        ));
        assert!(!origin_allowed(
            &allowed,
            &headers_with_origin("http://evil.test")
        ));
        assert!(!origin_allowed(&allowed, &HeaderMap::new()));
    }
}
