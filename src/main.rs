use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use task_dispatcher::{DispatcherConfig, HttpServer, Shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "task_dispatcher=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DispatcherConfig::from_env();
    tracing::info!(
        port = config.port,
        algorithm = %config.algorithm,
        workers = config.workers.len(),
        "configuration loaded"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    let shutdown = Shutdown::new();
    shutdown.listen_for_signals();

    let server = HttpServer::new(config);
    server.run(listener, shutdown).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
