//! Health tracking subsystem.
//!
//! # Data Flow
//! ```text
//! Active probes (prober.rs):
//!     Periodic timer
//!     → GET {worker}/health per worker, one probe in flight each
//!     → circuit.rs records the outcome
//!
//! Passive observation (dispatch):
//!     Forward outcome observed
//!     → circuit.rs records the outcome
//!
//! Circuit state (circuit.rs):
//!     Both sources share one consecutive-failure counter, so a worker
//!     returning 5xx under load is shed even while /health still answers
//! ```

pub mod circuit;
pub mod prober;

pub use circuit::CircuitTracker;
pub use prober::HealthProber;
