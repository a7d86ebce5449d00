//! Configuration schema definitions.

use std::time::Duration;

use crate::balancer::Algorithm;
use crate::health::circuit::DEFAULT_CIRCUIT_THRESHOLD;
use crate::registry::WorkerConfig;

/// Root configuration for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Listen port for the HTTP surface.
    pub port: u16,

    /// Initial selection algorithm.
    pub algorithm: Algorithm,

    /// Origins accepted on CORS and push-stream upgrades; empty allows
    /// all (development default).
    pub allowed_origins: Vec<String>,

    /// Workers registered at startup.
    pub workers: Vec<WorkerConfig>,

    /// Active health probing settings.
    pub health: HealthConfig,

    /// Downstream call timeouts.
    pub timeouts: TimeoutConfig,

    /// Circuit breaker settings.
    pub circuit: CircuitConfig,

    /// Push-stream broadcast tick.
    pub broadcast_interval: Duration,

    /// Bound on draining in-flight requests at shutdown.
    pub shutdown_grace: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            algorithm: Algorithm::RoundRobin,
            allowed_origins: Vec::new(),
            workers: Vec::new(),
            health: HealthConfig::default(),
            timeouts: TimeoutConfig::default(),
            circuit: CircuitConfig::default(),
            broadcast_interval: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

/// Active health probing settings.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub probe_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(2),
        }
    }
}

/// Timeouts for downstream HTTP calls.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Forwarding a task to a worker.
    pub forward: Duration,
    /// Proxying `/config` requests to a worker.
    pub config_proxy: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            forward: Duration::from_secs(30),
            config_proxy: Duration::from_secs(5),
        }
    }
}

/// Circuit breaker settings.
#[derive(Debug, Clone)]
pub struct CircuitConfig {
    /// Consecutive failures before the circuit opens.
    pub threshold: u32,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CIRCUIT_THRESHOLD,
        }
    }
}
