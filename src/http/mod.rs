//! HTTP surface for the dispatcher.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → server.rs (Axum router, CORS, tracing)
//!     → handlers.rs (status / task / algorithm / workers / metrics)
//!       or ws.rs (push-stream subscription)
//!     → dispatch / registry / broadcast components
//! ```

pub mod handlers;
pub mod server;
pub mod ws;

pub use server::{AppState, HttpServer};
