//! Connection registry
//!
//! Rooms live behind [`ConnectionRegistry`] so the in-process
//! [`ConnectionManager`] can be replaced by a shared store without touching
//! the socket loop or the fan-out.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use dreamx_core::Snowflake;
use dreamx_realtime::Room;
use tokio::sync::mpsc;

use super::{Connection, Outbound};

/// Room membership for live connections
pub trait ConnectionRegistry: Send + Sync {
    /// Track a freshly opened connection
    fn add_connection(&self, session_id: String, sender: mpsc::Sender<Outbound>) -> Arc<Connection>;

    /// Forget a connection and leave all its rooms
    fn remove_connection(&self, session_id: &str) -> Option<Arc<Connection>>;

    /// Bind a connection to a user and join the user's room
    ///
    /// Returns false when the session is unknown or already identified.
    fn authenticate(&self, session_id: &str, user_id: Snowflake) -> bool;

    /// Identified connections in a room; the broadcast room holds all of them
    fn connections_in(&self, room: &Room) -> Vec<Arc<Connection>>;

    fn connection_count(&self) -> usize;
}

/// In-process registry using `DashMap`
#[derive(Default)]
pub struct ConnectionManager {
    /// Active connections by session ID
    connections: DashMap<String, Arc<Connection>>,
    /// Room to session IDs
    rooms: DashMap<Room, HashSet<String>>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn get_connection(&self, session_id: &str) -> Option<Arc<Connection>> {
        self.connections.get(session_id).map(|r| Arc::clone(r.value()))
    }

    fn join(&self, connection: &Connection, room: Room) {
        connection.join(room);
        self.rooms
            .entry(room)
            .or_default()
            .insert(connection.session_id().to_string());
    }
}

impl ConnectionRegistry for ConnectionManager {
    fn add_connection(&self, session_id: String, sender: mpsc::Sender<Outbound>) -> Arc<Connection> {
        let connection = Connection::new(session_id.clone(), sender);
        self.connections.insert(session_id.clone(), Arc::clone(&connection));
        tracing::debug!(session_id = %session_id, "Connection added");
        connection
    }

    fn remove_connection(&self, session_id: &str) -> Option<Arc<Connection>> {
        let (_, connection) = self.connections.remove(session_id)?;

        for room in connection.rooms() {
            self.rooms.alter(&room, |_, mut sessions| {
                sessions.remove(session_id);
                sessions
            });
        }
        self.rooms.retain(|_, sessions| !sessions.is_empty());

        tracing::debug!(session_id = %session_id, "Connection removed");
        Some(connection)
    }

    fn authenticate(&self, session_id: &str, user_id: Snowflake) -> bool {
        let Some(connection) = self.get_connection(session_id) else {
            return false;
        };
        if !connection.authenticate(user_id) {
            return false;
        }
        self.join(&connection, Room::user(user_id));

        tracing::debug!(session_id = %session_id, user_id = %user_id, "Connection authenticated");
        true
    }

    fn connections_in(&self, room: &Room) -> Vec<Arc<Connection>> {
        match room {
            Room::Broadcast => self
                .connections
                .iter()
                .filter(|c| c.is_authenticated())
                .map(|c| Arc::clone(c.value()))
                .collect(),
            Room::User(_) => {
                let Some(sessions) = self.rooms.get(room) else {
                    return Vec::new();
                };
                sessions
                    .iter()
                    .filter_map(|session_id| self.get_connection(session_id))
                    .collect()
            }
        }
    }

    fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .field("rooms", &self.rooms.len())
            .finish()
    }
}
