//! Dispatcher configuration.
//!
//! Static settings come from environment variables (see `env.rs` for
//! the variable table); `schema.rs` defines the structure and defaults.

mod env;
mod schema;

pub use schema::{CircuitConfig, DispatcherConfig, HealthConfig, TimeoutConfig};
