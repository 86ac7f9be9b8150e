//! In-app notifications and browser push subscriptions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Reaction,
    Comment,
    Reply,
    Message,
    Order,
    Review,
    Moderation,
    System,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reaction => "reaction",
            Self::Comment => "comment",
            Self::Reply => "reply",
            Self::Message => "message",
            Self::Order => "order",
            Self::Review => "review",
            Self::Moderation => "moderation",
            Self::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reaction" => Some(Self::Reaction),
            "comment" => Some(Self::Comment),
            "reply" => Some(Self::Reply),
            "message" => Some(Self::Message),
            "order" => Some(Self::Order),
            "review" => Some(Self::Review),
            "moderation" => Some(Self::Moderation),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    /// Kinds that are also delivered by email when the user opted in
    pub fn is_email_worthy(self) -> bool {
        matches!(self, Self::Order | Self::Review | Self::Moderation)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub actor_id: Option<Snowflake>,
    pub kind: NotificationKind,
    pub body: String,
    pub link: Option<String>,
    pub data: serde_json::Value,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        id: Snowflake,
        user_id: Snowflake,
        actor_id: Option<Snowflake>,
        kind: NotificationKind,
        body: String,
    ) -> Self {
        Self {
            id,
            user_id,
            actor_id,
            kind,
            body,
            link: None,
            data: serde_json::Value::Null,
            read_at: None,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    #[inline]
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// Web Push endpoint registered by a browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSubscription {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            NotificationKind::Reaction,
            NotificationKind::Comment,
            NotificationKind::Reply,
            NotificationKind::Message,
            NotificationKind::Order,
            NotificationKind::Review,
            NotificationKind::Moderation,
            NotificationKind::System,
        ] {
            assert_eq!(NotificationKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_email_worthy_kinds() {
        assert!(NotificationKind::Order.is_email_worthy());
        assert!(!NotificationKind::Reaction.is_email_worthy());
        assert!(!NotificationKind::Message.is_email_worthy());
    }

    #[test]
    fn test_builder() {
        let n = Notification::new(Snowflake::new(1), Snowflake::new(2), None, NotificationKind::System, "hi".into())
            .with_link("/posts/3")
            .with_data(serde_json::json!({"post_id": "3"}));
        assert_eq!(n.link.as_deref(), Some("/posts/3"));
        assert!(!n.is_read());
    }
}
