//! Gateway state

use std::sync::Arc;

use dreamx_common::JwtService;
use dreamx_core::UserRepository;
use dreamx_realtime::EventBus;
use tokio::task::JoinHandle;

use crate::broadcast::EventDispatcher;
use crate::connection::ConnectionRegistry;

/// Shared dependencies of the socket handlers
#[derive(Clone)]
pub struct GatewayState {
    jwt_service: Arc<JwtService>,
    user_repo: Arc<dyn UserRepository>,
    event_bus: Arc<dyn EventBus>,
    registry: Arc<dyn ConnectionRegistry>,
    event_dispatcher: Arc<EventDispatcher>,
    heartbeat_interval_ms: u64,
}

impl GatewayState {
    pub fn new(
        jwt_service: Arc<JwtService>,
        user_repo: Arc<dyn UserRepository>,
        event_bus: Arc<dyn EventBus>,
        registry: Arc<dyn ConnectionRegistry>,
        heartbeat_interval_ms: u64,
    ) -> Self {
        let event_dispatcher = Arc::new(EventDispatcher::new(Arc::clone(&event_bus), Arc::clone(&registry)));
        Self {
            jwt_service,
            user_repo,
            event_bus,
            registry,
            event_dispatcher,
            heartbeat_interval_ms,
        }
    }

    /// Start forwarding bus events to sockets
    pub fn start(&self) -> Option<JoinHandle<()>> {
        Arc::clone(&self.event_dispatcher).start()
    }

    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    pub fn user_repo(&self) -> &dyn UserRepository {
        self.user_repo.as_ref()
    }

    pub fn event_bus(&self) -> &dyn EventBus {
        self.event_bus.as_ref()
    }

    pub fn registry(&self) -> &dyn ConnectionRegistry {
        self.registry.as_ref()
    }

    pub fn event_dispatcher(&self) -> &EventDispatcher {
        &self.event_dispatcher
    }

    pub fn heartbeat_interval_ms(&self) -> u64 {
        self.heartbeat_interval_ms
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("connections", &self.registry.connection_count())
            .field("event_bus", &self.event_bus.name())
            .field("heartbeat_interval_ms", &self.heartbeat_interval_ms)
            .finish_non_exhaustive()
    }
}
