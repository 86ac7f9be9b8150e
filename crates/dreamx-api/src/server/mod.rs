//! Server setup and initialization
//!
//! Provides the main application builder and server runner.

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, Router};
use dreamx_common::{AppConfig, AppError, JwtService};
use dreamx_core::SnowflakeGenerator;
use dreamx_db::{create_pool, run_migrations};
use dreamx_gateway::{gateway_router, ConnectionManager, GatewayState};
use dreamx_integrations::{create_mailer, create_payment_processor, create_push_sender, IdentityProviders};
use dreamx_realtime::create_event_bus;
use dreamx_service::services::{AdminService, Repositories};
use dreamx_service::{ServiceContextBuilder, UPLOADS_PATH};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::info;

use crate::middleware::apply_middleware_with_config;
use crate::routes::{create_router, health_routes};
use crate::state::AppState;

/// Room for multipart framing on top of the largest accepted file
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the complete Axum application: API, health probes, uploaded files
/// and the WebSocket gateway
pub fn create_app(state: AppState) -> Router {
    let config = state.config();

    let api = apply_middleware_with_config(
        create_router(),
        &config.rate_limit,
        &config.cors,
        config.app.env.is_production(),
    )
    .layer(DefaultBodyLimit::max(
        config.storage.max_file_size_bytes() + MULTIPART_OVERHEAD,
    ));

    let uploads = ServeDir::new(&config.storage.upload_dir);
    let gateway = gateway_router(state.gateway().clone());

    api.merge(health_routes())
        .nest_service(UPLOADS_PATH, uploads)
        .with_state(state)
        .merge(gateway)
}

/// Initialize all dependencies and create AppState
///
/// Runs migrations, starts the gateway fan-out and seeds the admin account.
pub async fn create_app_state(config: AppConfig) -> Result<AppState, AppError> {
    info!(url = %config.database.url, "Opening database...");
    let pool = create_pool(&config.database)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    run_migrations(&pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("Database ready");

    let event_bus = create_event_bus(&config.realtime, &config.redis)
        .map_err(|e| AppError::Realtime(e.to_string()))?;
    info!(backend = event_bus.name(), "Realtime bus ready");

    let payments =
        create_payment_processor(&config.payments).map_err(|e| AppError::Config(e.to_string()))?;
    let mailer = create_mailer(&config.mail).map_err(|e| AppError::Config(e.to_string()))?;
    let push_sender = create_push_sender(&config.push)
        .await
        .map_err(|e| AppError::Config(e.to_string()))?;
    let identity_providers =
        IdentityProviders::from_config(&config.oauth).map_err(|e| AppError::Config(e.to_string()))?;

    let jwt_service = Arc::new(JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expiry,
        config.jwt.refresh_token_expiry,
    ));
    let snowflake_generator = Arc::new(SnowflakeGenerator::new(config.snowflake.worker_id));
    let repositories = Repositories::sqlite(&pool);
    let users = Arc::clone(&repositories.users);
    let config = Arc::new(config);

    let service_context = ServiceContextBuilder::new()
        .pool(pool)
        .repositories(repositories)
        .jwt_service(Arc::clone(&jwt_service))
        .snowflake_generator(snowflake_generator)
        .event_bus(Arc::clone(&event_bus))
        .payments(payments)
        .identity_providers(identity_providers)
        .mailer(mailer)
        .push_sender(push_sender)
        .config(Arc::clone(&config))
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    if let Some(admin_id) = AdminService::new(&service_context).seed_admin().await? {
        info!(user_id = %admin_id, "Admin account ready");
    }

    let gateway = GatewayState::new(
        jwt_service,
        users,
        event_bus,
        ConnectionManager::new_shared(),
        config.realtime.heartbeat_interval_ms,
    );
    gateway.start();

    Ok(AppState::new(service_context, config, gateway))
}

/// Run the HTTP server on an already bound listener
pub async fn run_server(app: Router, listener: TcpListener) -> Result<(), AppError> {
    let addr = listener
        .local_addr()
        .map_err(|e| AppError::Config(format!("Failed to read listener address: {e}")))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = config.api.address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    let state = create_app_state(config).await?;
    run_server(create_app(state), listener).await
}
