//! One-shot batch run outside the schedule. Exits 1 on any failure.

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use order_analytics::batch::{BatchOrchestrator, BatchOutcome};
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

    info!("Manual batch execution");
    match run(cfg).await {
        Ok(BatchOutcome::Completed(report)) => {
            info!(
                target_date = %report.target_date,
                elapsed_ms = report.elapsed_ms,
                "Manual batch execution completed",
            );
        }
        Ok(BatchOutcome::Skipped) => {
            warn!("Another batch run is in progress, nothing done");
        }
        Err(e) => {
            error!("Batch execution failed: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(cfg: Config) -> Result<BatchOutcome> {
    let databases = Databases::connect(&cfg).await?;
    databases.migrate().await?;

    let orchestrator = BatchOrchestrator::new(databases, cfg.forecasting);
    orchestrator.run_batch_job().await
}
