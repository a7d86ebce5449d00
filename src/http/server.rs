//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with all dispatcher routes
//! - Wire up middleware (tracing, CORS)
//! - Spawn the health prober and broadcast ticker
//! - Serve with graceful shutdown, bounded by the drain grace period

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, patch, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::broadcast::Broadcaster;
use crate::config::DispatcherConfig;
use crate::dispatch::Forwarder;
use crate::health::{CircuitTracker, HealthProber};
use crate::http::{handlers, ws};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::registry::Registry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub forwarder: Arc<Forwarder>,
    pub broadcaster: Arc<Broadcaster>,
    pub metrics: PrometheusHandle,
    /// Client for the `/workers/{name}/config` proxy route.
    pub config_client: reqwest::Client,
    pub allowed_origins: Arc<Vec<String>>,
}

/// HTTP server for the dispatcher.
pub struct HttpServer {
    router: Router,
    registry: Arc<Registry>,
    broadcaster: Arc<Broadcaster>,
    tracker: CircuitTracker,
    config: DispatcherConfig,
}

impl HttpServer {
    /// Assemble all components from configuration.
    pub fn new(config: DispatcherConfig) -> Self {
        let registry = Arc::new(Registry::new(config.algorithm));
        for worker in &config.workers {
            tracing::info!(
                worker = %worker.name,
                url = %worker.url,
                weight = worker.weight,
                max_load = worker.max_load,
                "worker registered"
            );
            registry.add_worker(worker.clone());
        }

        let tracker = CircuitTracker::new(config.circuit.threshold);
        let broadcaster = Arc::new(Broadcaster::new(registry.clone()));
        let forwarder = Arc::new(Forwarder::new(
            registry.clone(),
            tracker.clone(),
            broadcaster.clone(),
            config.timeouts.forward,
        ));
        let config_client = reqwest::Client::builder()
            .timeout(config.timeouts.config_proxy)
            .build()
            .expect("failed to build config proxy client");

        let state = AppState {
            registry: registry.clone(),
            forwarder,
            broadcaster: broadcaster.clone(),
            metrics: metrics::install(),
            config_client,
            allowed_origins: Arc::new(config.allowed_origins.clone()),
        };
        let router = build_router(state, &config.allowed_origins);

        Self {
            router,
            registry,
            broadcaster,
            tracker,
            config,
        }
    }

    /// Run the server on the given listener until shutdown triggers,
    /// then drain in-flight requests within the grace period.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> std::io::Result<()> {
        let HttpServer {
            router,
            registry,
            broadcaster,
            tracker,
            config,
        } = self;

        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            algorithm = %config.algorithm,
            "dispatcher listening"
        );

        if config.health.enabled {
            let prober = HealthProber::new(
                registry,
                tracker,
                config.health.interval,
                config.health.probe_timeout,
            );
            tokio::spawn(prober.run(shutdown.subscribe()));
        }
        tokio::spawn(broadcaster.run(config.broadcast_interval, shutdown.subscribe()));

        let mut graceful = shutdown.subscribe();
        let server = async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = graceful.recv().await;
                })
                .await
        };

        let mut drain = shutdown.subscribe();
        let grace = config.shutdown_grace;
        tokio::select! {
            result = server => result?,
            _ = async move {
                let _ = drain.recv().await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(grace_secs = grace.as_secs(), "drain grace period elapsed with requests in flight");
            }
        }

        tracing::info!("dispatcher stopped");
        Ok(())
    }
}

fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/task", post(handlers::submit_task))
        .route(
            "/algorithm",
            get(handlers::get_algorithm)
                .put(handlers::set_algorithm)
                .post(handlers::set_algorithm),
        )
        .route("/workers/{name}", patch(handlers::update_worker))
        .route(
            "/workers/{name}/config",
            get(handlers::worker_config)
                .put(handlers::worker_config)
                .post(handlers::worker_config),
        )
        .route("/metrics", get(handlers::render_metrics))
        .route("/ws", get(ws::handle_upgrade))
        .with_state(state)
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// CORS contract: configured origins, or any origin when none are
/// configured (development default).
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "ignoring unparsable allowed origin");
                    None
                }
            })
            .collect();
        layer.allow_origin(origins)
    }
}
