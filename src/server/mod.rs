// Thu Oct 15 2026 - Alex

pub mod routes;

pub use routes::{AnalyzeResponse, ErrorResponse};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::engine::{AnalysisService, Engine};
use crate::history;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AnalysisService>,
    pub timeout: Duration,
}

impl AppState {
    pub fn new(service: Arc<AnalysisService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    /// Builds the catalog, engine and history store described by `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let catalog = Arc::new(Catalog::load(config.catalog_path.as_deref())?);
        let engine = Arc::new(Engine::new(catalog, config.engine_options())?);
        let history = history::open_store(config.history_path.as_deref())?;

        let service = AnalysisService::new(engine, history)
            .with_limits(config.upload_limits())
            .with_report_dir(config.report_dir.clone());

        Ok(Self::new(Arc::new(service), config.timeout()))
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let body_limit = state.service.limits().max_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/api", get(routes::root))
        .route("/api/", get(routes::root))
        .route("/api/analyze", post(routes::analyze))
        .route("/api/download-results", get(routes::download_results))
        .route("/api/analysis-history", get(routes::analysis_history))
        .route("/api/signatures", get(routes::signatures))
        .layer(cors)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    let app = router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    log::info!("Offset finder API listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
