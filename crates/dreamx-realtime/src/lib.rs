//! # dreamx-realtime
//!
//! Realtime event bus for Dream X.
//!
//! Events are addressed to rooms: `user:<id>` for one user's connections and
//! `broadcast` for everyone. Two backends implement [`EventBus`]:
//!
//! - [`LocalEventBus`]: in-process `tokio::sync::broadcast`, for a single
//!   process running both the API and the gateway
//! - [`RedisEventBus`]: Redis pub/sub, so several gateway processes can share
//!   one event stream
//!
//! The backend is chosen from configuration with [`create_event_bus`].

pub mod bus;
pub mod local;
pub mod message;
pub mod pubsub;
pub mod room;

use std::sync::Arc;

use dreamx_common::{RealtimeBackend, RealtimeConfig, RedisConfig};

pub use bus::{BusError, BusResult, EventBus};
pub use local::LocalEventBus;
pub use message::BusMessage;
pub use pubsub::{RedisEventBus, RedisPool, RedisPoolConfig, SubscriberConfig};
pub use room::{Room, BROADCAST_ROOM, USER_ROOM_PREFIX};

/// Build the configured event bus
pub fn create_event_bus(
    realtime: &RealtimeConfig,
    redis: &RedisConfig,
) -> BusResult<Arc<dyn EventBus>> {
    match realtime.backend {
        RealtimeBackend::Memory => {
            tracing::info!("Using in-process event bus");
            Ok(Arc::new(LocalEventBus::default()))
        }
        RealtimeBackend::Redis => {
            let config = RedisPoolConfig::from_config(redis)?;
            tracing::info!(url = %config.safe_url(), "Using Redis event bus");
            let bus = RedisEventBus::connect(&config, SubscriberConfig::default())?;
            Ok(Arc::new(bus))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn realtime(backend: RealtimeBackend) -> RealtimeConfig {
        RealtimeConfig {
            backend,
            queue_capacity: 16,
            heartbeat_interval_ms: 41_250,
        }
    }

    #[tokio::test]
    async fn test_memory_backend() {
        let redis = RedisConfig { url: None, max_connections: 4 };
        let bus = create_event_bus(&realtime(RealtimeBackend::Memory), &redis).unwrap();
        assert_eq!(bus.name(), "memory");
        assert!(bus.health_check().await.is_ok());
    }

    #[test]
    fn test_redis_backend_requires_url() {
        let redis = RedisConfig { url: None, max_connections: 4 };
        let result = create_event_bus(&realtime(RealtimeBackend::Redis), &redis);
        assert!(matches!(result, Err(BusError::NotConfigured(_))));
    }
}
