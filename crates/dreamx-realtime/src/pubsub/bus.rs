//! Redis-backed event bus
//!
//! `PUBLISH` goes through the pooled connections. A background task holds a
//! dedicated pub/sub connection with `PSUBSCRIBE user:*` and `SUBSCRIBE
//! broadcast`, forwarding everything into a local broadcast channel, and
//! reconnects after a delay whenever the connection drops.

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::{AsyncCommands, Client};
use tokio::sync::broadcast;
use tokio::time::{sleep, Duration};

use crate::bus::{BusResult, EventBus};
use crate::message::BusMessage;
use crate::room::{Room, BROADCAST_ROOM, USER_ROOM_PREFIX};

use super::pool::{RedisPool, RedisPoolConfig};

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// Channel buffer size for the local broadcast
    pub broadcast_buffer: usize,
    /// Reconnection delay in milliseconds
    pub reconnect_delay_ms: u64,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            broadcast_buffer: 1024,
            reconnect_delay_ms: 1000,
        }
    }
}

#[derive(Clone)]
pub struct RedisEventBus {
    pool: RedisPool,
    tx: broadcast::Sender<BusMessage>,
}

impl RedisEventBus {
    /// Create the bus and start the background subscriber
    pub fn connect(config: &RedisPoolConfig, subscriber: SubscriberConfig) -> BusResult<Self> {
        let pool = RedisPool::new(config)?;
        let client = Client::open(config.url.as_str())?;
        let (tx, _) = broadcast::channel(subscriber.broadcast_buffer.max(1));

        tokio::spawn(listener_loop(client, tx.clone(), subscriber.reconnect_delay_ms));

        Ok(Self { pool, tx })
    }
}

/// Decode one pub/sub payload; the room comes from the channel name
fn decode(channel: &str, payload: &str) -> Option<BusMessage> {
    let room = Room::parse(channel)?;
    let mut message: BusMessage = serde_json::from_str(payload).ok()?;
    message.room = room;
    Some(message)
}

async fn listener_loop(client: Client, tx: broadcast::Sender<BusMessage>, reconnect_delay_ms: u64) {
    loop {
        match run_listener(&client, &tx).await {
            Ok(()) => tracing::warn!("Pub/Sub stream ended, reconnecting..."),
            Err(e) => tracing::error!(error = %e, "Subscriber error, reconnecting..."),
        }
        sleep(Duration::from_millis(reconnect_delay_ms)).await;
    }
}

async fn run_listener(client: &Client, tx: &broadcast::Sender<BusMessage>) -> BusResult<()> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.psubscribe(format!("{USER_ROOM_PREFIX}*")).await?;
    pubsub.subscribe(BROADCAST_ROOM).await?;

    tracing::info!("Subscriber connected to Redis");

    let mut stream = pubsub.into_on_message();
    while let Some(msg) = stream.next().await {
        let channel = msg.get_channel_name().to_string();
        let payload: String = msg.get_payload().unwrap_or_default();

        match decode(&channel, &payload) {
            Some(message) => {
                // no local receivers is fine
                let _ = tx.send(message);
                tracing::trace!(channel = %channel, "Received Pub/Sub message");
            }
            None => tracing::warn!(channel = %channel, "Dropping undecodable Pub/Sub message"),
        }
    }

    Ok(())
}

#[async_trait]
impl EventBus for RedisEventBus {
    async fn publish(&self, message: BusMessage) -> BusResult<()> {
        let mut conn = self.pool.get().await?;
        let channel = message.room.name();
        let payload = message.to_json()?;

        let receivers: u32 = conn.publish(&channel, &payload).await?;

        tracing::debug!(
            channel = %channel,
            event_type = %message.event_type,
            receivers = receivers,
            "Published event"
        );

        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.tx.subscribe()
    }

    fn name(&self) -> &'static str {
        "redis"
    }

    async fn health_check(&self) -> BusResult<()> {
        self.pool.health_check().await
    }
}
