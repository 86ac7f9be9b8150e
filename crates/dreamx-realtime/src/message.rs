//! Bus message envelope

use serde::{Deserialize, Serialize};

use crate::room::Room;

/// Event carried by the bus to one room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusMessage {
    pub room: Room,
    /// Event type name (e.g. `MESSAGE_CREATE`, `NOTIFICATION_CREATE`)
    pub event_type: String,
    pub data: serde_json::Value,
}

impl BusMessage {
    #[must_use]
    pub fn new(room: Room, event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            room,
            event_type: event_type.into(),
            data,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
