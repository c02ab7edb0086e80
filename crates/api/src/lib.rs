//! Battery Fleet API Server
//!
//! REST API for the fleet dashboard, backed by the fleet evaluation engine.

use axum::{
    extract::State,
    http::HeaderValue,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use fleet_engine::{EvaluationScheduler, FleetEngine};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tower_governor::GovernorLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

pub mod config;
mod error;
pub mod rate_limit;
mod routes;

pub use crate::config::{AppConfig, ConfigError, LoggingConfig, ServerConfig};
pub use error::ApiError;

/// Application state shared across handlers
pub struct AppState {
    pub engine: Arc<FleetEngine>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    /// Prometheus handle, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(engine: Arc<FleetEngine>) -> Self {
        Self {
            engine,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime_seconds: u64,
    pub battery_count: usize,
    /// Completion of the last scheduler cycle
    pub last_cycle: Option<DateTime<Utc>>,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    use routes::{alerts, analytics, batteries, stats};

    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/stats", get(stats::get_stats))
        .route("/api/v1/alerts", get(alerts::get_alerts))
        .route("/api/v1/alerts/:id/acknowledge", post(alerts::acknowledge_alert))
        .route(
            "/api/v1/batteries",
            get(batteries::list_batteries).post(batteries::create_battery),
        )
        .route(
            "/api/v1/batteries/:id",
            get(batteries::get_battery)
                .put(batteries::update_battery)
                .delete(batteries::delete_battery),
        )
        .route("/api/v1/batteries/:id/status", patch(batteries::update_status))
        .route("/api/v1/batteries/:id/readings", post(batteries::submit_reading))
        .route("/api/v1/batteries/:id/evaluate", post(batteries::evaluate_battery))
        .route("/api/v1/batteries/:id/summary", get(batteries::get_summary))
        .route("/api/v1/analytics", get(analytics::get_analytics))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the dashboard origins; any origin when the list is empty
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        battery_count: state.engine.battery_count(),
        last_cycle: state.engine.last_cycle(),
    })
}

/// Prometheus exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => ApiError::Unavailable("metrics recorder not installed".into()).into_response(),
    }
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let builder = FmtSubscriber::builder()
        .with_max_level(config.level())
        .with_target(true);

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Run the server and the evaluation scheduler until Ctrl-C
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let engine = Arc::new(FleetEngine::new(config.engine.clone())?);
    let metrics = PrometheusBuilder::new().install_recorder()?;
    let state = Arc::new(AppState::new(Arc::clone(&engine)).with_metrics(metrics));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = tokio::spawn(EvaluationScheduler::new(engine).run(shutdown_rx));

    let mut app = create_router(state).layer(cors_layer(&config.server.cors_origins));
    if config.server.rate_limit.enabled {
        let governor = rate_limit::create_governor_config(&config.server.rate_limit)
            .ok_or_else(|| anyhow::anyhow!("invalid rate limit configuration"))?;
        app = app.layer(GovernorLayer { config: governor });
    }

    info!("Starting API server on {}", config.server.addr);

    let listener = tokio::net::TcpListener::bind(&config.server.addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Let an in-flight cycle finish before exiting
    let _ = shutdown_tx.send(true);
    scheduler.await?;
    info!("Server stopped");

    Ok(())
}
