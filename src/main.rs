//! This file defines the mapmaker binary entry point.

use mapmaker::app;
use mapmaker::cli;
use mapmaker::metrics;
use mapmaker::server;
use mapmaker::tracing;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    tracing::init_tracing(&args);
    ::tracing::debug!("{:?}", args);
    metrics::register_metrics();
    let service = app::service(&args);
    server::serve(&args, service).await;
    tracing::shutdown_tracing();
}
