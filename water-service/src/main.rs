use anyhow::Result;
use water_service::{config::AppConfig, http, metrics_server, observability, store::open_store};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let store = open_store(cfg.database.as_ref()).await?;
    tracing::info!(
        spike_window = cfg.spike.window,
        spike_threshold = cfg.spike.threshold,
        "starting water service"
    );

    let state = http::AppState::new(store, cfg.spike);
    http::serve(&cfg.http.bind_addr, state).await
}
