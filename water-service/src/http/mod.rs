//! JSON surface over the engine, analyzer and dashboard.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::{net::TcpListener, signal};
use water_client::WaterStore;

use crate::{analyzer::CostAnalyzer, config::SpikeConfig, engine::ConsumptionEngine};

pub mod error;
pub mod extract;
pub mod routes;

pub use error::AppError;
pub use extract::{CurrentUser, USER_ID_HEADER};

pub struct AppState {
    pub store: Arc<dyn WaterStore>,
    pub engine: ConsumptionEngine,
    pub analyzer: CostAnalyzer,
}

impl AppState {
    pub fn new(store: Arc<dyn WaterStore>, spike: SpikeConfig) -> Arc<Self> {
        Arc::new(Self {
            store,
            engine: ConsumptionEngine::new(spike),
            analyzer: CostAnalyzer::new(spike.window),
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(routes::healthz))
        .route("/dashboard", get(routes::dashboard))
        .route("/readings", get(routes::list_readings).post(routes::add_reading))
        .route("/readings/:id", delete(routes::delete_reading))
        .route("/cost", get(routes::cost_analysis))
        .route("/tariff", post(routes::update_tariff))
        .route("/users", post(routes::register_user))
        .route("/users/me", delete(routes::delete_current_user))
        .with_state(state)
}

pub async fn serve(bind_addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid http.bind_addr: {bind_addr}"))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "water service listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("water service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received terminate signal, shutting down"),
    }
}
