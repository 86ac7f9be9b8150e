//! Moderation records - blocks, reports, audit log, appeals

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub blocker_id: Snowflake,
    pub blocked_id: Snowflake,
    pub created_at: DateTime<Utc>,
}

/// What a report points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSubject {
    User,
    Post,
    Comment,
    Message,
    Service,
}

impl ReportSubject {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Post => "post",
            Self::Comment => "comment",
            Self::Message => "message",
            Self::Service => "service",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "post" => Some(Self::Post),
            "comment" => Some(Self::Comment),
            "message" => Some(Self::Message),
            "service" => Some(Self::Service),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Open,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
            Self::Dismissed => "dismissed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "resolved" => Some(Self::Resolved),
            "dismissed" => Some(Self::Dismissed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub id: Snowflake,
    pub reporter_id: Snowflake,
    pub subject_type: ReportSubject,
    pub subject_id: Snowflake,
    pub reason: String,
    pub details: Option<String>,
    pub status: ReportStatus,
    pub reviewer_id: Option<Snowflake>,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Report {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == ReportStatus::Open
    }
}

/// Append-only record of a privileged action
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub id: Snowflake,
    pub actor_id: Snowflake,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<Snowflake>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppealKind {
    Account,
    Content,
}

impl AppealKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Content => "content",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "account" => Some(Self::Account),
            "content" => Some(Self::Content),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppealStatus {
    Pending,
    Approved,
    Denied,
}

impl AppealStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "denied" => Some(Self::Denied),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appeal {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub kind: AppealKind,
    pub subject_id: Option<Snowflake>,
    pub message: String,
    pub status: AppealStatus,
    pub reviewer_id: Option<Snowflake>,
    pub decision_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Appeal {
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.status == AppealStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_roundtrips() {
        for s in ["user", "post", "comment", "message", "service"] {
            assert_eq!(ReportSubject::parse(s).map(ReportSubject::as_str), Some(s));
        }
        for s in ["open", "resolved", "dismissed"] {
            assert_eq!(ReportStatus::parse(s).map(ReportStatus::as_str), Some(s));
        }
        for s in ["pending", "approved", "denied"] {
            assert_eq!(AppealStatus::parse(s).map(AppealStatus::as_str), Some(s));
        }
        assert_eq!(AppealKind::parse("content"), Some(AppealKind::Content));
        assert_eq!(ReportSubject::parse("guild"), None);
    }
}
