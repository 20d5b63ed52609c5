//! fraudscore entrypoint.
//!
//! `fraudscore train <labeled.csv> <out_dir>` runs one offline training job and
//! publishes the result; `fraudscore serve` starts the scoring API.

use fraudscore::{
    config::AppConfig,
    logging::StructuredLogger,
    registry::SqliteRegistry,
    serving::{self, InferenceService},
    training,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const USAGE: &str = "usage: fraudscore train <labeled.csv> <out_dir> | fraudscore serve";

fn train(config: &AppConfig, source: &Path, out_dir: &Path) -> Result<(), BoxError> {
    let registry = SqliteRegistry::open(&config.registry.path)?;
    let report = training::run_training(config, source, out_dir, &registry)?;
    info!(
        run_id = %report.run_id,
        model = %report.model_name,
        version = report.version.0,
        roc_auc = report.metrics.roc_auc,
        f1_score = report.metrics.f1_score,
        "training complete"
    );
    Ok(())
}

async fn serve(config: &AppConfig) -> Result<(), BoxError> {
    let model_uri = config.serve.model_uri()?;
    let registry = Arc::new(SqliteRegistry::open(&config.registry.path)?);
    let service = Arc::new(InferenceService::new(registry, model_uri));

    // Startup load failures leave the service Degraded but still listening.
    service.load_in_background().await;

    let app = serving::router(Arc::clone(&service));
    let listener = tokio::net::TcpListener::bind(&config.serve.bind_addr).await?;
    info!(addr = %config.serve.bind_addr, uri = %service.model_uri(), "scoring API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await?;

    service.shutdown();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config_path = std::env::var("FRAUDSCORE_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    let config = AppConfig::load(&config_path).apply_env();

    StructuredLogger::init(config.log.json, &config.log.level);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["train", source, out_dir] => {
            let (config, source, out_dir) = (config.clone(), PathBuf::from(source), PathBuf::from(out_dir));
            tokio::task::spawn_blocking(move || train(&config, &source, &out_dir)).await?
        }
        ["serve"] => serve(&config).await,
        _ => Err(USAGE.into()),
    }
}
