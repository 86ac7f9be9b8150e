//! Notification models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct NotificationModel {
    pub id: i64,
    pub user_id: i64,
    pub actor_id: Option<i64>,
    pub kind: String,
    pub body: String,
    pub link: Option<String>,
    /// JSON text
    pub data: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PushSubscriptionModel {
    pub id: i64,
    pub user_id: i64,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub created_at: DateTime<Utc>,
}
