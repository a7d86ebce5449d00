//! Environment-driven configuration loading.

use url::Url;

use crate::config::DispatcherConfig;
use crate::registry::WorkerConfig;

/// Well-known workers: URL variable, name, UI color, default weight,
/// max load. A missing URL variable omits the worker.
const WELL_KNOWN_WORKERS: [(&str, &str, &str, u32, u32); 6] = [
    ("WORKER_GO_1_URL", "go-worker-1", "#3B82F6", 5, 3),
    ("WORKER_GO_2_URL", "go-worker-2", "#6366F1", 2, 3),
    ("WORKER_RUST_1_URL", "rust-worker-1", "#F97316", 6, 3),
    ("WORKER_RUST_2_URL", "rust-worker-2", "#EAB308", 1, 3),
    ("WORKER_PYTHON_1_URL", "python-worker-1", "#10B981", 1, 3),
    ("WORKER_PYTHON_2_URL", "python-worker-2", "#14B8A6", 3, 3),
];

impl DispatcherConfig {
    /// Build configuration from process environment variables: `PORT`,
    /// `LB_ALGORITHM`, `ALLOWED_ORIGINS`, the worker URL table, and
    /// per-worker `<NAME>_WEIGHT` overrides.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(port) = get("PORT").and_then(|v| v.parse().ok()) {
            config.port = port;
        }

        if let Some(raw) = get("LB_ALGORITHM") {
            match raw.parse() {
                Ok(algorithm) => config.algorithm = algorithm,
                Err(_) => {
                    tracing::warn!(algorithm = %raw, "ignoring unknown LB_ALGORITHM");
                }
            }
        }

        if let Some(origins) = get("ALLOWED_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
        }

        for (url_var, name, color, default_weight, max_load) in WELL_KNOWN_WORKERS {
            let Some(raw_url) = get(url_var) else {
                continue;
            };
            let url = match Url::parse(&raw_url) {
                Ok(url) => url,
                Err(err) => {
                    tracing::warn!(worker = name, url = %raw_url, error = %err, "skipping worker with invalid URL");
                    continue;
                }
            };

            let weight_var = format!("{}_WEIGHT", name.to_uppercase().replace('-', "_"));
            let weight = get(&weight_var)
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|w| *w > 0)
                .unwrap_or(default_weight);

            config.workers.push(WorkerConfig {
                name: name.to_string(),
                url,
                color: color.to_string(),
                weight,
                max_load,
            });
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::balancer::Algorithm;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn defaults_apply_with_an_empty_environment() {
        let config = DispatcherConfig::from_lookup(lookup(&[]));
        assert_eq!(config.port, 8000);
        assert_eq!(config.algorithm, Algorithm::RoundRobin);
        assert!(config.allowed_origins.is_empty());
        assert!(config.workers.is_empty());
    }

    #[test]
    fn workers_come_from_the_url_table() {
        let config = DispatcherConfig::from_lookup(lookup(&[
            ("WORKER_GO_1_URL", "http://go-1:8001"),
            ("WORKER_RUST_1_URL", "http://rust-1:8003"),
        ]));

        assert_eq!(config.workers.len(), 2);
        assert_eq!(config.workers[0].name, "go-worker-1");
        assert_eq!(config.workers[0].weight, 5);
        assert_eq!(config.workers[1].name, "rust-worker-1");
        assert_eq!(config.workers[1].color, "#F97316");
    }

    #[test]
    fn weight_override_applies_when_positive() {
        let config = DispatcherConfig::from_lookup(lookup(&[
            ("WORKER_GO_1_URL", "http://go-1:8001"),
            ("GO_WORKER_1_WEIGHT", "9"),
        ]));
        assert_eq!(config.workers[0].weight, 9);

        let config = DispatcherConfig::from_lookup(lookup(&[
            ("WORKER_GO_1_URL", "http://go-1:8001"),
            ("GO_WORKER_1_WEIGHT", "0"),
        ]));
        assert_eq!(config.workers[0].weight, 5);

        let config = DispatcherConfig::from_lookup(lookup(&[
            ("WORKER_GO_1_URL", "http://go-1:8001"),
            ("GO_WORKER_1_WEIGHT", "lots"),
        ]));
        assert_eq!(config.workers[0].weight, 5);
    }

    #[test]
    fn invalid_worker_url_is_skipped() {
        let config =
            DispatcherConfig::from_lookup(lookup(&[("WORKER_GO_1_URL", "not a url")]));
        assert!(config.workers.is_empty());
    }

    #[test]
    fn allowed_origins_are_split_and_trimmed() {
        let config = DispatcherConfig::from_lookup(lookup(&[(
            "ALLOWED_ORIGINS",
            "http://localhost:3000, http://dash.internal ,",
        )]));
        assert_eq!(
            config.allowed_origins,
            vec!["http://localhost:3000", "http://dash.internal"]
        );
    }

    #[test]
    fn algorithm_and_port_parse_from_env() {
        let config = DispatcherConfig::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("LB_ALGORITHM", "weighted"),
        ]));
        assert_eq!(config.port, 9000);
        assert_eq!(config.algorithm, Algorithm::Weighted);

        let config = DispatcherConfig::from_lookup(lookup(&[("LB_ALGORITHM", "fastest")]));
        assert_eq!(config.algorithm, Algorithm::RoundRobin);
    }
}
