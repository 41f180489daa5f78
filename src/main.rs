//! Waypoint daemon entrypoint.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use waypoint::config;
use waypoint::{ProxyServer, Shutdown};

#[derive(Parser)]
#[command(name = "waypoint", version, about = "HTTP/1.1 reverse proxy")]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "waypoint.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = config::load_config(&args.config)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "waypoint={},tower_http=warn",
                    config.observability.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "waypoint starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => waypoint::observability::metrics::init_metrics(addr),
            Err(error) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    error = %error,
                    "invalid metrics address, metrics disabled"
                );
            }
        }
    }

    let listener = TcpListener::bind(&config.server.listen).await?;

    let shutdown = Arc::new(Shutdown::new());
    let signal = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            signal.trigger();
        }
    });

    let server = ProxyServer::new(config);
    server.run(listener, &shutdown).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
