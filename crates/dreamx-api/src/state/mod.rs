//! Application state
//!
//! Holds the shared state for the Axum application: the service context,
//! the configuration and the WebSocket gateway mounted next to the API.

use std::sync::Arc;

use dreamx_common::{AppConfig, JwtService};
use dreamx_gateway::GatewayState;
use dreamx_service::ServiceContext;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Service context containing all dependencies
    service_context: Arc<ServiceContext>,
    /// Application configuration
    config: Arc<AppConfig>,
    /// Gateway sharing this process's event bus
    gateway: GatewayState,
}

impl AppState {
    pub fn new(service_context: ServiceContext, config: Arc<AppConfig>, gateway: GatewayState) -> Self {
        Self {
            service_context: Arc::new(service_context),
            config,
            gateway,
        }
    }

    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn gateway(&self) -> &GatewayState {
        &self.gateway
    }

    /// Get the JWT service from the service context
    pub fn jwt_service(&self) -> &JwtService {
        self.service_context.jwt_service()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service_context", &"ServiceContext")
            .field("config", &"AppConfig")
            .field("connections", &self.gateway.registry().connection_count())
            .finish()
    }
}
