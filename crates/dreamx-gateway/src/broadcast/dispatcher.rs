//! Event dispatcher
//!
//! Reads every message from the event bus and forwards it as a DISPATCH to
//! the connections in the message's room. Delivery is best effort: a slow
//! socket with a full buffer loses the event.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dreamx_realtime::{BusMessage, EventBus};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::connection::ConnectionRegistry;

/// Routes bus messages to room members
pub struct EventDispatcher {
    bus: Arc<dyn EventBus>,
    registry: Arc<dyn ConnectionRegistry>,
    running: AtomicBool,
}

impl EventDispatcher {
    pub fn new(bus: Arc<dyn EventBus>, registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self {
            bus,
            registry,
            running: AtomicBool::new(false),
        }
    }

    /// Spawn the fan-out loop; `None` if it is already running
    pub fn start(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Event dispatcher is already running");
            return None;
        }

        // Subscribe before spawning so nothing published after start() is missed
        let receiver = self.bus.subscribe();
        let dispatcher = Arc::clone(&self);
        let handle = tokio::spawn(async move { dispatcher.run(receiver).await });

        tracing::info!(backend = self.bus.name(), "Event dispatcher started");
        Some(handle)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn run(&self, mut receiver: broadcast::Receiver<BusMessage>) {
        loop {
            match receiver.recv().await {
                Ok(message) => {
                    self.route(&message);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "Event dispatcher lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::warn!("Event bus closed");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Event dispatcher loop ended");
    }

    /// Deliver one message; returns how many connections accepted it
    pub fn route(&self, message: &BusMessage) -> usize {
        let connections = self.registry.connections_in(&message.room);
        let mut delivered = 0;

        for connection in &connections {
            match connection.try_dispatch(&message.event_type, message.data.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::debug!(
                        session_id = %connection.session_id(),
                        event_type = %message.event_type,
                        error = %e,
                        "Dropped event for connection"
                    );
                }
            }
        }

        tracing::trace!(
            room = %message.room,
            event_type = %message.event_type,
            delivered,
            "Event routed"
        );
        delivered
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("backend", &self.bus.name())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dreamx_core::Snowflake;
    use dreamx_realtime::{LocalEventBus, Room};
    use tokio::sync::mpsc;

    use super::*;
    use crate::connection::{ConnectionManager, Outbound};
    use crate::protocol::OpCode;

    fn setup() -> (Arc<dyn EventBus>, Arc<ConnectionManager>, Arc<EventDispatcher>) {
        let bus: Arc<dyn EventBus> = Arc::new(LocalEventBus::default());
        let registry = ConnectionManager::new_shared();
        let dispatcher = Arc::new(EventDispatcher::new(Arc::clone(&bus), registry.clone()));
        (bus, registry, dispatcher)
    }

    fn identified(registry: &ConnectionManager, session_id: &str, user: i64) -> mpsc::Receiver<Outbound> {
        let (tx, rx) = mpsc::channel(4);
        registry.add_connection(session_id.to_string(), tx);
        registry.authenticate(session_id, Snowflake::new(user));
        rx
    }

    #[test]
    fn test_route_targets_user_room() {
        let (_, registry, dispatcher) = setup();
        let mut ana = identified(&registry, "ana", 1);
        let mut bo = identified(&registry, "bo", 2);

        let message = BusMessage::new(Room::user(Snowflake::new(1)), "NOTIFICATION_CREATE", serde_json::json!({"n": 1}));
        assert_eq!(dispatcher.route(&message), 1);

        let Ok(Outbound::Message(frame)) = ana.try_recv() else { panic!("expected dispatch") };
        assert_eq!(frame.op, OpCode::Dispatch);
        assert_eq!(frame.t.as_deref(), Some("NOTIFICATION_CREATE"));
        assert_eq!(frame.s, Some(1));
        assert!(bo.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_reaches_everyone() {
        let (_, registry, dispatcher) = setup();
        let _ana = identified(&registry, "ana", 1);
        let _bo = identified(&registry, "bo", 2);

        let message = BusMessage::new(Room::Broadcast, "ANNOUNCEMENT", serde_json::json!({}));
        assert_eq!(dispatcher.route(&message), 2);
    }

    #[test]
    fn test_full_buffer_drops_event() {
        let (_, registry, dispatcher) = setup();
        let _ana = identified(&registry, "ana", 1);
        let message = BusMessage::new(Room::user(Snowflake::new(1)), "X", serde_json::json!({}));

        for _ in 0..4 {
            assert_eq!(dispatcher.route(&message), 1);
        }
        assert_eq!(dispatcher.route(&message), 0);
    }

    #[tokio::test]
    async fn test_started_dispatcher_forwards_bus_messages() {
        let (bus, registry, dispatcher) = setup();
        let mut ana = identified(&registry, "ana", 1);

        assert!(Arc::clone(&dispatcher).start().is_some());
        assert!(Arc::clone(&dispatcher).start().is_none());

        bus.publish(BusMessage::new(Room::user(Snowflake::new(1)), "MESSAGE_CREATE", serde_json::json!({"id": "7"})))
            .await
            .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(1), ana.recv()).await.unwrap();
        let Some(Outbound::Message(frame)) = received else { panic!("expected dispatch") };
        assert_eq!(frame.t.as_deref(), Some("MESSAGE_CREATE"));
        assert_eq!(frame.d.unwrap()["id"], "7");
    }
}
