//! User database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for users table (password hash is read separately)
#[derive(Debug, Clone, FromRow)]
pub struct UserModel {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub role: String,
    pub status: String,
    pub suspended_until: Option<DateTime<Utc>>,
    pub suspension_reason: Option<String>,
    pub email_verified: bool,
    pub notify_email: bool,
    pub notify_push: bool,
    pub profile_visibility: String,
    pub allow_messages: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}
