//! Health check handlers
//!
//! Endpoints for liveness and readiness probes.

use axum::{extract::State, http::StatusCode, Json};
use dreamx_service::dto::{HealthResponse, ReadinessResponse};

use crate::state::AppState;

/// Basic health check (liveness probe)
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Readiness check with dependency health
///
/// GET /health/ready
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let ctx = state.service_context();

    let db_healthy = ctx.pool().acquire().await.is_ok();

    let bus = ctx.event_bus();
    let realtime_healthy = match bus.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, backend = bus.name(), "Realtime bus unhealthy");
            false
        }
    };

    let response = ReadinessResponse::ready(db_healthy, realtime_healthy, bus.name());
    let status = if response.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
