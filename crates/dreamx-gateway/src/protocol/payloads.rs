//! Payload definitions

use dreamx_core::{Snowflake, User};
use serde::{Deserialize, Serialize};

/// Event name of the dispatch sent after a successful Identify
pub const READY_EVENT: &str = "READY";

/// Payload for op 10 (Hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    #[must_use]
    pub fn with_interval(heartbeat_interval: u64) -> Self {
        Self { heartbeat_interval }
    }
}

/// Payload for op 2 (Identify)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// Access token, with or without the `Bearer ` prefix
    pub token: String,
}

impl IdentifyPayload {
    /// Token with any `Bearer ` prefix removed
    #[must_use]
    pub fn bare_token(&self) -> &str {
        self.token.strip_prefix("Bearer ").unwrap_or(&self.token).trim()
    }
}

/// Public view of the identified user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyUser {
    pub id: Snowflake,
    pub username: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl From<&User> for ReadyUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// Body of the READY dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyPayload {
    pub user: ReadyUser,
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_token() {
        let with_prefix = IdentifyPayload { token: "Bearer abc.def".into() };
        assert_eq!(with_prefix.bare_token(), "abc.def");

        let plain = IdentifyPayload { token: "abc.def".into() };
        assert_eq!(plain.bare_token(), "abc.def");
    }

    #[test]
    fn test_ready_payload_shape() {
        let user = User::new(Snowflake::new(9), "ana".into(), "ana@example.com".into(), "Ana".into());
        let ready = ReadyPayload { user: ReadyUser::from(&user), session_id: "s1".into() };
        let json = serde_json::to_value(&ready).unwrap();

        assert_eq!(json["user"]["username"], "ana");
        assert_eq!(json["session_id"], "s1");
        assert!(json["user"].get("email").is_none());
        assert!(json["user"].get("avatar").is_none());
    }
}
