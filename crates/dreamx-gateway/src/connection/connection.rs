//! Individual WebSocket connection

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dreamx_core::Snowflake;
use dreamx_realtime::Room;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use crate::protocol::{CloseCode, GatewayMessage};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket open, waiting for Identify
    Connecting,
    /// Identified and sitting in its rooms
    Connected,
    Disconnected,
}

/// Item queued for the socket writer
#[derive(Debug, Clone)]
pub enum Outbound {
    Message(GatewayMessage),
    /// Send a close frame and stop writing
    Close(CloseCode),
}

/// A single WebSocket connection
pub struct Connection {
    session_id: String,
    user_id: RwLock<Option<Snowflake>>,
    state: RwLock<ConnectionState>,
    sender: mpsc::Sender<Outbound>,
    /// Last dispatch sequence sent
    sequence: AtomicU64,
    last_heartbeat: Mutex<Instant>,
    rooms: RwLock<HashSet<Room>>,
    created_at: Instant,
}

impl Connection {
    pub fn new(session_id: String, sender: mpsc::Sender<Outbound>) -> Arc<Self> {
        Arc::new(Self {
            session_id,
            user_id: RwLock::new(None),
            state: RwLock::new(ConnectionState::Connecting),
            sender,
            sequence: AtomicU64::new(0),
            last_heartbeat: Mutex::new(Instant::now()),
            rooms: RwLock::new(HashSet::new()),
            created_at: Instant::now(),
        })
    }

    /// Random session id handed out in READY
    #[must_use]
    pub fn generate_session_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> Option<Snowflake> {
        *self.user_id.read()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.read().is_some()
    }

    /// Link the connection to a user; false when it already was
    pub(crate) fn authenticate(&self, user_id: Snowflake) -> bool {
        let mut slot = self.user_id.write();
        if slot.is_some() {
            return false;
        }
        *slot = Some(user_id);
        *self.state.write() = ConnectionState::Connected;
        true
    }

    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    pub fn record_heartbeat(&self) {
        *self.last_heartbeat.lock() = Instant::now();
    }

    pub fn time_since_heartbeat(&self) -> Duration {
        self.last_heartbeat.lock().elapsed()
    }

    pub(crate) fn join(&self, room: Room) {
        self.rooms.write().insert(room);
    }

    pub fn rooms(&self) -> Vec<Room> {
        self.rooms.read().iter().copied().collect()
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Queue a message, waiting for buffer space
    pub async fn send(&self, message: GatewayMessage) -> Result<(), mpsc::error::SendError<Outbound>> {
        self.sender.send(Outbound::Message(message)).await
    }

    /// Queue a message without waiting; fails when the buffer is full
    pub fn try_send(&self, message: GatewayMessage) -> Result<(), mpsc::error::TrySendError<Outbound>> {
        self.sender.try_send(Outbound::Message(message))
    }

    /// Queue a dispatch stamped with the next sequence number
    pub fn try_dispatch(
        &self,
        event_type: &str,
        data: serde_json::Value,
    ) -> Result<(), mpsc::error::TrySendError<Outbound>> {
        let sequence = self.next_sequence();
        self.try_send(GatewayMessage::dispatch(event_type, sequence, data))
    }

    /// Ask the writer to close the socket with `code`
    pub fn close(&self, code: CloseCode) {
        if self.sender.try_send(Outbound::Close(code)).is_err() {
            tracing::debug!(session_id = %self.session_id, code = %code, "Close frame not queued");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id())
            .field("sequence", &self.current_sequence())
            .finish_non_exhaustive()
    }
}
