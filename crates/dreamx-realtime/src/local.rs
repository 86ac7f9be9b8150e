//! In-process event bus

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::trace;

use crate::bus::{BusResult, EventBus};
use crate::message::BusMessage;

/// Default broadcast buffer
pub const DEFAULT_BUFFER: usize = 1024;

/// `tokio::sync::broadcast` bus for a single process
#[derive(Debug, Clone)]
pub struct LocalEventBus {
    tx: broadcast::Sender<BusMessage>,
}

impl LocalEventBus {
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self { tx }
    }
}

impl Default for LocalEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER)
    }
}

#[async_trait]
impl EventBus for LocalEventBus {
    async fn publish(&self, message: BusMessage) -> BusResult<()> {
        // no receivers is not an error; nobody is connected
        let receivers = self.tx.send(message).unwrap_or(0);
        trace!(receivers, "Published local event");
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.tx.subscribe()
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> BusResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::Room;
    use dreamx_core::Snowflake;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = LocalEventBus::default();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let room = Room::user(Snowflake::new(1));
        bus.publish(BusMessage::new(room, "PING", serde_json::json!({})))
            .await
            .unwrap();

        assert_eq!(first.recv().await.unwrap().room, room);
        assert_eq!(second.recv().await.unwrap().event_type, "PING");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = LocalEventBus::new(4);
        bus.publish(BusMessage::new(Room::Broadcast, "PING", serde_json::Value::Null))
            .await
            .unwrap();
    }
}
