//! Domain events - pushed to connected clients through per-user rooms
//!
//! Services build these after a state change commits and hand them to the
//! event bus; the gateway forwards them as `DISPATCH` frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Message, Notification};
use crate::value_objects::{ReactionSummary, ReactionToggle, Snowflake, ToggleOutcome};

/// All realtime events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEvent {
    // =========================================================================
    // Message Events
    // =========================================================================
    #[serde(rename = "MESSAGE_CREATE")]
    MessageCreated(MessageCreatedEvent),
    #[serde(rename = "MESSAGE_UPDATE")]
    MessageUpdated(MessageUpdatedEvent),
    #[serde(rename = "MESSAGE_DELETE")]
    MessageDeleted(MessageDeletedEvent),
    MessageReactionUpdated(MessageReactionUpdatedEvent),

    // =========================================================================
    // Conversation Events
    // =========================================================================
    #[serde(rename = "CONVERSATION_UPDATE")]
    ConversationUpdated(ConversationUpdatedEvent),

    // =========================================================================
    // Notification Events
    // =========================================================================
    #[serde(rename = "NOTIFICATION_CREATE")]
    NotificationCreated(NotificationCreatedEvent),
}

impl DomainEvent {
    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MessageCreated(_) => "MESSAGE_CREATE",
            Self::MessageUpdated(_) => "MESSAGE_UPDATE",
            Self::MessageDeleted(_) => "MESSAGE_DELETE",
            Self::MessageReactionUpdated(_) => "MESSAGE_REACTION_UPDATED",
            Self::ConversationUpdated(_) => "CONVERSATION_UPDATE",
            Self::NotificationCreated(_) => "NOTIFICATION_CREATE",
        }
    }

    /// Get the timestamp of the event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::MessageCreated(e) => e.timestamp,
            Self::MessageUpdated(e) => e.timestamp,
            Self::MessageDeleted(e) => e.timestamp,
            Self::MessageReactionUpdated(e) => e.timestamp,
            Self::ConversationUpdated(e) => e.timestamp,
            Self::NotificationCreated(e) => e.timestamp,
        }
    }

    /// The event body without the type tag, as sent in `DISPATCH.d`
    pub fn payload(&self) -> serde_json::Value {
        let value = match self {
            Self::MessageCreated(e) => serde_json::to_value(e),
            Self::MessageUpdated(e) => serde_json::to_value(e),
            Self::MessageDeleted(e) => serde_json::to_value(e),
            Self::MessageReactionUpdated(e) => serde_json::to_value(e),
            Self::ConversationUpdated(e) => serde_json::to_value(e),
            Self::NotificationCreated(e) => serde_json::to_value(e),
        };
        value.unwrap_or(serde_json::Value::Null)
    }
}

// ============================================================================
// Event Structs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageCreatedEvent {
    pub id: Snowflake,
    pub conversation_id: Snowflake,
    pub sender_id: Snowflake,
    pub content: String,
    pub attachment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageUpdatedEvent {
    pub id: Snowflake,
    pub conversation_id: Snowflake,
    pub content: String,
    pub edited_at: Option<DateTime<Utc>>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeletedEvent {
    pub id: Snowflake,
    pub conversation_id: Snowflake,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReactionUpdatedEvent {
    pub message_id: Snowflake,
    pub conversation_id: Snowflake,
    pub user_id: Snowflake,
    pub outcome: ToggleOutcome,
    pub kind: Option<String>,
    pub counts: ReactionSummary,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationUpdatedEvent {
    pub conversation_id: Snowflake,
    pub name: Option<String>,
    pub member_ids: Vec<Snowflake>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationCreatedEvent {
    pub id: Snowflake,
    pub actor_id: Option<Snowflake>,
    pub kind: String,
    pub body: String,
    pub link: Option<String>,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Event Creation Helpers
// ============================================================================

impl From<&Message> for MessageCreatedEvent {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            content: message.content.clone(),
            attachment: message.attachment.clone(),
            created_at: message.created_at,
            timestamp: Utc::now(),
        }
    }
}

impl From<&Message> for MessageUpdatedEvent {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            content: message.content.clone(),
            edited_at: message.edited_at,
            timestamp: Utc::now(),
        }
    }
}

impl MessageDeletedEvent {
    pub fn new(id: Snowflake, conversation_id: Snowflake) -> Self {
        Self {
            id,
            conversation_id,
            timestamp: Utc::now(),
        }
    }
}

impl MessageReactionUpdatedEvent {
    pub fn new(
        message_id: Snowflake,
        conversation_id: Snowflake,
        user_id: Snowflake,
        toggle: &ReactionToggle,
    ) -> Self {
        Self {
            message_id,
            conversation_id,
            user_id,
            outcome: toggle.outcome,
            kind: toggle.kind.clone(),
            counts: toggle.counts.clone(),
            timestamp: Utc::now(),
        }
    }
}

impl ConversationUpdatedEvent {
    pub fn new(conversation_id: Snowflake, name: Option<String>, member_ids: Vec<Snowflake>) -> Self {
        Self {
            conversation_id,
            name,
            member_ids,
            timestamp: Utc::now(),
        }
    }
}

impl From<&Notification> for NotificationCreatedEvent {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id,
            actor_id: n.actor_id,
            kind: n.kind.as_str().to_string(),
            body: n.body.clone(),
            link: n.link.clone(),
            data: n.data.clone(),
            created_at: n.created_at,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let message = Message::new(Snowflake::new(1), Snowflake::new(2), Snowflake::new(3), "hi".into(), None);
        let event = DomainEvent::MessageCreated(MessageCreatedEvent::from(&message));

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("MESSAGE_CREATE"));

        let parsed: DomainEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event_type(), "MESSAGE_CREATE");
    }

    #[test]
    fn test_reaction_event_payload() {
        let toggle = ReactionToggle {
            outcome: ToggleOutcome::Set,
            kind: Some("like".into()),
            counts: ReactionSummary::from_counts([("like", 1)]),
        };
        let event = DomainEvent::MessageReactionUpdated(MessageReactionUpdatedEvent::new(
            Snowflake::new(5),
            Snowflake::new(6),
            Snowflake::new(7),
            &toggle,
        ));
        assert_eq!(event.event_type(), "MESSAGE_REACTION_UPDATED");

        let payload = event.payload();
        assert_eq!(payload["message_id"], "5");
        assert_eq!(payload["outcome"], "set");
        assert_eq!(payload["counts"]["like"], 1);
        assert!(payload.get("type").is_none());
    }
}
