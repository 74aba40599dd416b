//! Energy predictor driver.
//!
//! One-shot Tokio binary that runs the prediction store end to end:
//! 1. Reads the request file (appliances + date range)
//! 2. Fetches a prediction (cache-aware, retry-wrapped endpoint call)
//! 3. Projects a next-period forecast
//! 4. Loads the user's prediction history

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};

use common::clock::SystemClock;
use common::{AuthUser, Error, PredictionRequest};
use predict_client::{PredictClient, RetryPolicy};
use storage_client::StorageClient;
use store::{
    CacheMirror, EnergyStore, LocalBackend, MemoryCache, PredictionBackend, PredictionCache,
    RemoteBackend,
};

/// Household energy consumption predictor
#[derive(Parser)]
#[command(name = "energy-predictor", about = "Household energy consumption predictor")]
struct Cli {
    /// Ping the prediction endpoint and exit.
    #[arg(long)]
    health_check: bool,

    /// Compute predictions locally instead of calling the endpoint.
    #[arg(long)]
    offline: bool,

    /// TOML file describing the appliances and date range.
    #[arg(long, default_value = "request.toml")]
    request: PathBuf,
}

fn read_request(path: &Path) -> Result<PredictionRequest, Error> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "energy_predictor=info,store=info,predict_client=info,storage_client=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("⚡ Energy predictor starting up...");

    // Load configuration.
    let mut cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    if cli.offline {
        cfg.offline = true;
    }

    let policy = RetryPolicy::from_config(&cfg.retry);
    let predict = PredictClient::new(&cfg.predictor.base_url, policy);

    // ── Health-check mode ────────────────────────────────────────────
    if cli.health_check {
        info!("Checking prediction endpoint at {}...", cfg.predictor.base_url);
        match predict.health_check().await {
            Ok(()) => info!("✅ Prediction endpoint is healthy"),
            Err(e) => {
                error!("❌ Health check failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let request = match read_request(&cli.request) {
        Ok(r) => r,
        Err(e) => {
            error!("Request error: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Request: {} → {}, {} appliance kinds",
        request.start_date,
        request.end_date,
        request.appliances.len()
    );

    // ── Wire the store ───────────────────────────────────────────────
    let storage = Arc::new(StorageClient::new(
        &cfg.storage.base_url,
        &cfg.storage.api_key,
    ));
    let memory = MemoryCache::new(
        cfg.cache.max_entries,
        chrono::Duration::seconds(cfg.cache.ttl_secs as i64),
        Arc::new(SystemClock),
    );
    let mirror: Arc<dyn CacheMirror> = storage.clone();
    let cache = PredictionCache::new(memory, Some(mirror));

    let backend: Arc<dyn PredictionBackend> = if cfg.offline {
        info!("Offline mode: computing predictions locally");
        Arc::new(LocalBackend::new(StdRng::from_entropy()))
    } else {
        info!("Prediction endpoint: {}", cfg.predictor.base_url);
        Arc::new(RemoteBackend::new(predict))
    };

    let user = AuthUser {
        id: cfg.user.auth_id.clone(),
        email: cfg.user.email.clone(),
    };
    let mut store = EnergyStore::new(cache, backend, storage, StdRng::from_entropy());

    // ── Run the flow ─────────────────────────────────────────────────
    let prediction = match store.fetch_prediction(&user, &request).await {
        Ok(p) => p,
        Err(e) => {
            error!("Prediction failed: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Consumption: {:.1} kWh over {} days ({} appliances)",
        prediction.consumption, prediction.days, prediction.total_appliances
    );

    match store.fetch_forecast(&user).await {
        Ok(f) => info!(
            "Forecast: {:.1} kWh next period, {} ({:+.1}%)",
            f.consumption, f.trend, f.percentage_change
        ),
        Err(e) => warn!("Forecast failed: {}", e),
    }

    match store.fetch_prediction_history(&user).await {
        Ok(history) => {
            info!("History: {} predictions", history.len());
            for p in history.iter().take(10) {
                info!(
                    "  {} → {}: {:.1} kWh ({} days)",
                    p.start_date, p.end_date, p.consumption, p.days
                );
            }
        }
        Err(e) => warn!("History fetch failed: {}", e),
    }
}
