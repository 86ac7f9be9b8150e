//! Event bus interface
//!
//! Services publish to rooms; gateways subscribe and fan out to the
//! connections registered in each room. Delivery is fire-and-forget.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::message::BusMessage;

/// Error type for bus operations
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Failed to get connection from pool: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("Failed to create Redis pool: {0}")]
    CreatePool(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bus not configured: {0}")]
    NotConfigured(String),
}

pub type BusResult<T> = Result<T, BusError>;

#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish one message to its room
    async fn publish(&self, message: BusMessage) -> BusResult<()>;

    /// Receive every message published on the bus
    fn subscribe(&self) -> broadcast::Receiver<BusMessage>;

    /// Backend name for health reports
    fn name(&self) -> &'static str;

    async fn health_check(&self) -> BusResult<()>;
}
