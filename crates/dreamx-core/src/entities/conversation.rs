//! Messaging containers and messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

pub const MESSAGE_MAX_LEN: usize = 4000;
pub const GROUP_NAME_MAX_LEN: usize = 100;
pub const GROUP_MAX_MEMBERS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    Direct,
    Group,
}

impl ConversationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Group => "group",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "direct" => Some(Self::Direct),
            "group" => Some(Self::Group),
            _ => None,
        }
    }
}

/// Conversation container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: Snowflake,
    pub kind: ConversationKind,
    pub name: Option<String>,
    pub owner_id: Option<Snowflake>,
    /// `"<lower id>:<higher id>"` for direct conversations, unique
    pub direct_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Direct conversation between two users; the key ignores argument order
    pub fn new_direct(id: Snowflake, a: Snowflake, b: Snowflake) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind: ConversationKind::Direct,
            name: None,
            owner_id: None,
            direct_key: Some(direct_key(a, b)),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_group(id: Snowflake, owner_id: Snowflake, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind: ConversationKind::Group,
            name: Some(name),
            owner_id: Some(owner_id),
            direct_key: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn is_direct(&self) -> bool {
        self.kind == ConversationKind::Direct
    }

    #[inline]
    pub fn is_owner(&self, user_id: Snowflake) -> bool {
        self.owner_id == Some(user_id)
    }

    /// For a direct conversation, the participant that is not `me`
    pub fn direct_peer(&self, me: Snowflake) -> Option<Snowflake> {
        let key = self.direct_key.as_deref()?;
        let (a, b) = key.split_once(':')?;
        let a = Snowflake::parse(a).ok()?;
        let b = Snowflake::parse(b).ok()?;
        if a == me {
            Some(b)
        } else if b == me {
            Some(a)
        } else {
            None
        }
    }
}

/// Order-independent key identifying the direct conversation of two users
pub fn direct_key(a: Snowflake, b: Snowflake) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{lo}:{hi}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Member,
}

impl MemberRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Member => "member",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(Self::Owner),
            "member" => Some(Self::Member),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationMember {
    pub conversation_id: Snowflake,
    pub user_id: Snowflake,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
    pub last_read_at: Option<DateTime<Utc>>,
}

impl ConversationMember {
    pub fn new(conversation_id: Snowflake, user_id: Snowflake, role: MemberRole) -> Self {
        Self {
            conversation_id,
            user_id,
            role,
            joined_at: Utc::now(),
            last_read_at: None,
        }
    }
}

/// Message in a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Snowflake,
    pub conversation_id: Snowflake,
    pub sender_id: Snowflake,
    pub content: String,
    pub attachment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(
        id: Snowflake,
        conversation_id: Snowflake,
        sender_id: Snowflake,
        content: String,
        attachment: Option<String>,
    ) -> Self {
        Self {
            id,
            conversation_id,
            sender_id,
            content,
            attachment,
            created_at: Utc::now(),
            edited_at: None,
        }
    }

    /// Neither text nor attachment
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.attachment.is_none()
    }

    pub fn edit(&mut self, content: String) {
        self.content = content;
        self.edited_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_key_is_order_independent() {
        let a = Snowflake::new(10);
        let b = Snowflake::new(2);
        assert_eq!(direct_key(a, b), direct_key(b, a));
        assert_eq!(direct_key(a, b), "2:10");
    }

    #[test]
    fn test_direct_peer() {
        let conv = Conversation::new_direct(Snowflake::new(1), Snowflake::new(5), Snowflake::new(3));
        assert_eq!(conv.direct_peer(Snowflake::new(5)), Some(Snowflake::new(3)));
        assert_eq!(conv.direct_peer(Snowflake::new(3)), Some(Snowflake::new(5)));
        assert_eq!(conv.direct_peer(Snowflake::new(9)), None);
    }

    #[test]
    fn test_group_ownership() {
        let conv = Conversation::new_group(Snowflake::new(1), Snowflake::new(4), "crew".into());
        assert!(conv.is_owner(Snowflake::new(4)));
        assert!(!conv.is_direct());
        assert_eq!(conv.direct_peer(Snowflake::new(4)), None);
    }

    #[test]
    fn test_message_empty() {
        let msg = Message::new(Snowflake::new(1), Snowflake::new(2), Snowflake::new(3), "  ".into(), None);
        assert!(msg.is_empty());
        let msg = Message::new(Snowflake::new(1), Snowflake::new(2), Snowflake::new(3), String::new(), Some("/uploads/chat-1-2.png".into()));
        assert!(!msg.is_empty());
    }
}
