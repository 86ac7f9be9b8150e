//! Room naming
//!
//! Every connected client sits in its user room; the broadcast room reaches
//! every connection. Room names double as Redis channel names.

use dreamx_core::Snowflake;

/// Channel prefix for user-specific events
pub const USER_ROOM_PREFIX: &str = "user:";
/// Room for events that go to every connected client
pub const BROADCAST_ROOM: &str = "broadcast";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    /// All sessions of one user
    User(Snowflake),
    Broadcast,
}

impl Room {
    #[must_use]
    pub fn user(user_id: Snowflake) -> Self {
        Self::User(user_id)
    }

    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::User(id) => format!("{USER_ROOM_PREFIX}{id}"),
            Self::Broadcast => BROADCAST_ROOM.to_string(),
        }
    }

    /// Parse a room name; unknown names yield `None`
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        if name == BROADCAST_ROOM {
            return Some(Self::Broadcast);
        }
        name.strip_prefix(USER_ROOM_PREFIX)
            .and_then(|id| id.parse::<i64>().ok())
            .map(|id| Self::User(Snowflake::new(id)))
    }
}

impl std::fmt::Display for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

impl serde::Serialize for Room {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

impl<'de> serde::Deserialize<'de> for Room {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::parse(&name).ok_or_else(|| serde::de::Error::custom(format!("unknown room {name}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_names() {
        assert_eq!(Room::user(Snowflake::new(11111)).name(), "user:11111");
        assert_eq!(Room::Broadcast.name(), "broadcast");
    }

    #[test]
    fn test_room_parse() {
        assert_eq!(Room::parse("user:42"), Some(Room::User(Snowflake::new(42))));
        assert_eq!(Room::parse("broadcast"), Some(Room::Broadcast));
        assert_eq!(Room::parse("guild:1"), None);
        assert_eq!(Room::parse("user:abc"), None);
    }
}
