//! Moderation models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct BlockModel {
    pub blocker_id: i64,
    pub blocked_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReportModel {
    pub id: i64,
    pub reporter_id: i64,
    pub subject_type: String,
    pub subject_id: i64,
    pub reason: String,
    pub details: Option<String>,
    pub status: String,
    pub reviewer_id: Option<i64>,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Database model for audit_log table
#[derive(Debug, Clone, FromRow)]
pub struct AuditEntryModel {
    pub id: i64,
    pub actor_id: i64,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<i64>,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AppealModel {
    pub id: i64,
    pub user_id: i64,
    pub kind: String,
    pub subject_id: Option<i64>,
    pub message: String,
    pub status: String,
    pub reviewer_id: Option<i64>,
    pub decision_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}
