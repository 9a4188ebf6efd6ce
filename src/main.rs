use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use order_analytics::api::{router, ApiState};
use order_analytics::batch::{BatchOrchestrator, BatchScheduler};
use order_analytics::config::Config;
use order_analytics::db::Databases;
use order_analytics::error::Result;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let databases = Databases::connect(&cfg).await?;
    databases.migrate().await?;

    // --- Batch orchestration ---
    let orchestrator = Arc::new(BatchOrchestrator::new(
        databases.clone(),
        cfg.forecasting.clone(),
    ));
    let scheduler = Arc::new(BatchScheduler::new(
        Arc::clone(&orchestrator),
        cfg.scheduler.clone(),
    ));
    scheduler.start();

    // --- HTTP API server ---
    let api_state = ApiState {
        reader: databases.reader(),
        orchestrator,
        scheduler: Arc::clone(&scheduler),
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop();
    info!("Analytics service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        return;
    }
    info!("Shutdown signal received");
}
