//! Educational L7 task dispatcher.
//!
//! Accepts client tasks over HTTP, selects a backend worker according to
//! a runtime-switchable policy, forwards the task, and streams live
//! operational state to observers over WebSocket.
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!                 │                 DISPATCHER                   │
//!   POST /task    │  ┌──────┐   ┌──────────┐   ┌────────────┐   │
//!   ──────────────┼─▶│ http │──▶│ balancer │──▶│  dispatch  │───┼──▶ worker /task
//!                 │  └──────┘   └────┬─────┘   └─────┬──────┘   │
//!                 │                  │               │          │
//!                 │             ┌────▼─────┐   ┌─────▼──────┐   │
//!                 │             │ registry │◀──│   health   │◀──┼──▶ worker /health
//!                 │             └────┬─────┘   └────────────┘   │
//!   GET /ws       │             ┌────▼─────┐                    │
//!   ◀─────────────┼─────────────│broadcast │                    │
//!                 │             └──────────┘                    │
//!                 └──────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod balancer;
pub mod dispatch;
pub mod http;
pub mod registry;

// State distribution
pub mod broadcast;
pub mod health;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::DispatcherConfig;
pub use error::DispatchError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
