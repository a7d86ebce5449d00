//! Worker selection policies.
//!
//! # Data Flow
//! ```text
//! POST /task → registry.selection_view() (one consistent read)
//!     → Selector dispatches on the active algorithm:
//!         - round_robin.rs (atomic cursor over the full list)
//!         - least_conn.rs (minimum in-flight load)
//!         - weighted.rs (draw proportional to weight)
//!         - random.rs (uniform over the eligible set)
//!     → Return an eligible worker or none
//! ```
//!
//! # Design Decisions
//! - Strategies are pure over the worker list except for the round-robin
//!   cursor; eligibility is checked per worker at scan time
//! - Ineligible workers (disabled, unhealthy, open circuit) are skipped
//! - Algorithm switches take effect on the next selection

mod least_conn;
mod random;
mod round_robin;
mod weighted;

pub use least_conn::LeastConnections;
pub use random::Random;
pub use round_robin::RoundRobin;
pub use weighted::Weighted;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::registry::Worker;

/// The four runtime-switchable selection policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    RoundRobin,
    LeastConnections,
    Weighted,
    Random,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::RoundRobin,
        Algorithm::LeastConnections,
        Algorithm::Weighted,
        Algorithm::Random,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::RoundRobin => "round-robin",
            Algorithm::LeastConnections => "least-connections",
            Algorithm::Weighted => "weighted",
            Algorithm::Random => "random",
        }
    }

    /// Wire names, in the order advertised by `GET /algorithm`.
    pub fn names() -> [&'static str; 4] {
        Algorithm::ALL.map(|a| a.as_str())
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round-robin" => Ok(Algorithm::RoundRobin),
            "least-connections" => Ok(Algorithm::LeastConnections),
            "weighted" => Ok(Algorithm::Weighted),
            "random" => Ok(Algorithm::Random),
            other => Err(DispatchError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// A selection policy over the registered worker list.
pub trait Strategy: Send + Sync {
    /// Pick one eligible worker, or `None` when no worker is eligible.
    fn pick(&self, workers: &[Arc<Worker>]) -> Option<Arc<Worker>>;
}

/// Holds one instance of every strategy and dispatches on the active
/// algorithm, so the round-robin cursor survives algorithm switches.
#[derive(Debug, Default)]
pub struct Selector {
    round_robin: RoundRobin,
    least_conn: LeastConnections,
    weighted: Weighted,
    random: Random,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pick(&self, algorithm: Algorithm, workers: &[Arc<Worker>]) -> Option<Arc<Worker>> {
        match algorithm {
            Algorithm::RoundRobin => self.round_robin.pick(workers),
            Algorithm::LeastConnections => self.least_conn.pick(workers),
            Algorithm::Weighted => self.weighted.pick(workers),
            Algorithm::Random => self.random.pick(workers),
        }
    }
}
