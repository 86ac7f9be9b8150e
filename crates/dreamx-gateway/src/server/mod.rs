//! Gateway server setup

mod handler;
mod state;

pub use handler::{gateway_handler, HEARTBEAT_TIMEOUT_MS};
pub use state::GatewayState;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use dreamx_common::{AppConfig, AppError, JwtService};
use dreamx_db::{create_pool, SqliteUserRepository};
use dreamx_realtime::create_event_bus;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::connection::ConnectionManager;

/// `/gateway` route bound to its state, ready to merge into another router
pub fn gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route("/gateway", get(gateway_handler))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

/// Standalone gateway application
pub fn create_app(state: GatewayState) -> Router {
    gateway_router(state)
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
}

/// Build a standalone gateway with its own pool and bus, and start fan-out
pub async fn create_gateway_state(config: &AppConfig) -> Result<GatewayState, AppError> {
    tracing::info!("Connecting to database...");
    let pool = create_pool(&config.database)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let event_bus =
        create_event_bus(&config.realtime, &config.redis).map_err(|e| AppError::Realtime(e.to_string()))?;
    if event_bus.name() == "memory" {
        tracing::warn!("Standalone gateway on the in-process bus only sees events published by itself; use the redis backend");
    }

    let jwt_service = Arc::new(JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expiry,
        config.jwt.refresh_token_expiry,
    ));

    let state = GatewayState::new(
        jwt_service,
        Arc::new(SqliteUserRepository::new(pool)),
        event_bus,
        ConnectionManager::new_shared(),
        config.realtime.heartbeat_interval_ms,
    );
    state.start();
    Ok(state)
}

pub async fn run_server(app: Router, addr: &str) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on ws://{}/gateway", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))
}

/// Run the standalone gateway with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let state = create_gateway_state(&config).await?;
    run_server(create_app(state), &config.gateway.address()).await
}
