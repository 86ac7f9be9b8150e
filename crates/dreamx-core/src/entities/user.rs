//! User entity - account identity, profile, preferences, and moderation state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::Snowflake;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 32;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Moderator,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "moderator" => Some(Self::Moderator),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Moderators and admins
    #[inline]
    pub fn is_staff(self) -> bool {
        self >= Self::Moderator
    }
}

/// Account status; users are never hard-deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Suspended,
    Banned,
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Banned => "banned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            "banned" => Some(Self::Banned),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProfileVisibility {
    #[default]
    Public,
    Private,
}

impl ProfileVisibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

/// Who may open a direct conversation with the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessagePolicy {
    #[default]
    Everyone,
    Nobody,
}

impl MessagePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Everyone => "everyone",
            Self::Nobody => "nobody",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "everyone" => Some(Self::Everyone),
            "nobody" => Some(Self::Nobody),
            _ => None,
        }
    }
}

/// User account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    pub suspended_until: Option<DateTime<Utc>>,
    pub suspension_reason: Option<String>,
    pub email_verified: bool,
    pub notify_email: bool,
    pub notify_push: bool,
    pub profile_visibility: ProfileVisibility,
    pub allow_messages: MessagePolicy,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new active user with default preferences
    pub fn new(id: Snowflake, username: String, email: String, display_name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            username,
            email,
            display_name,
            avatar: None,
            bio: None,
            location: None,
            website: None,
            role: UserRole::User,
            status: UserStatus::Active,
            suspended_until: None,
            suspension_reason: None,
            email_verified: false,
            notify_email: true,
            notify_push: true,
            profile_visibility: ProfileVisibility::Public,
            allow_messages: MessagePolicy::Everyone,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    #[inline]
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    #[inline]
    pub fn is_banned(&self) -> bool {
        self.status == UserStatus::Banned
    }

    /// Suspended and the suspension window has not yet passed
    pub fn is_suspended_at(&self, now: DateTime<Utc>) -> bool {
        self.status == UserStatus::Suspended && self.suspended_until.map_or(true, |until| until > now)
    }

    /// Suspended, but the window has passed and the suspension can be lifted
    pub fn suspension_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == UserStatus::Suspended && self.suspended_until.is_some_and(|until| until <= now)
    }

    /// Whether the user may perform write actions at `now`
    pub fn ensure_can_act(&self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.is_banned() {
            return Err(DomainError::AccountBanned);
        }
        if self.is_suspended_at(now) {
            return Err(DomainError::AccountSuspended {
                until: self.suspended_until,
                reason: self.suspension_reason.clone(),
            });
        }
        Ok(())
    }

    /// Whether the profile details are visible to `viewer`
    pub fn profile_visible_to(&self, viewer: Option<&User>) -> bool {
        match self.profile_visibility {
            ProfileVisibility::Public => true,
            ProfileVisibility::Private => viewer.is_some_and(|v| v.id == self.id || v.is_staff()),
        }
    }

    pub fn suspend(&mut self, until: Option<DateTime<Utc>>, reason: String) {
        self.status = UserStatus::Suspended;
        self.suspended_until = until;
        self.suspension_reason = Some(reason);
        self.updated_at = Utc::now();
    }

    pub fn ban(&mut self, reason: String) {
        self.status = UserStatus::Banned;
        self.suspended_until = None;
        self.suspension_reason = Some(reason);
        self.updated_at = Utc::now();
    }

    /// Return to active, clearing any suspension or ban
    pub fn reinstate(&mut self) {
        self.status = UserStatus::Active;
        self.suspended_until = None;
        self.suspension_reason = None;
        self.updated_at = Utc::now();
    }
}

/// Validate a username: 3-32 characters of `[A-Za-z0-9_]`
pub fn validate_username(username: &str) -> Result<(), DomainError> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(DomainError::InvalidUsername(format!(
            "must be {USERNAME_MIN_LEN}-{USERNAME_MAX_LEN} characters"
        )));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(DomainError::InvalidUsername(
            "only letters, digits and underscores are allowed".to_string(),
        ));
    }
    Ok(())
}

/// Derive a valid username base from free text such as an OAuth display name
pub fn username_base(raw: &str) -> String {
    let mut base: String = raw
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                Some(c.to_ascii_lowercase())
            } else if c == ' ' || c == '-' || c == '.' {
                Some('_')
            } else {
                None
            }
        })
        .take(USERNAME_MAX_LEN - 6)
        .collect();
    while base.chars().count() < USERNAME_MIN_LEN {
        base.push('_');
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user() -> User {
        User::new(
            Snowflake::new(1),
            "dreamer".to_string(),
            "dreamer@example.com".to_string(),
            "Dreamer".to_string(),
        )
    }

    #[test]
    fn test_new_user_defaults() {
        let user = user();
        assert_eq!(user.role, UserRole::User);
        assert_eq!(user.status, UserStatus::Active);
        assert!(user.notify_push);
        assert!(user.ensure_can_act(Utc::now()).is_ok());
    }

    #[test]
    fn test_role_ordering() {
        assert!(UserRole::Admin.is_staff());
        assert!(UserRole::Moderator.is_staff());
        assert!(!UserRole::User.is_staff());
        assert!(UserRole::Admin > UserRole::Moderator);
    }

    #[test]
    fn test_suspension_window() {
        let now = Utc::now();
        let mut user = user();
        user.suspend(Some(now + Duration::hours(1)), "spam".to_string());

        assert!(user.is_suspended_at(now));
        assert!(matches!(
            user.ensure_can_act(now),
            Err(DomainError::AccountSuspended { .. })
        ));
        assert!(!user.suspension_expired_at(now));

        let later = now + Duration::hours(2);
        assert!(!user.is_suspended_at(later));
        assert!(user.suspension_expired_at(later));
        assert!(user.ensure_can_act(later).is_ok());
    }

    #[test]
    fn test_indefinite_suspension_and_ban() {
        let mut user = user();
        user.suspend(None, "review".to_string());
        assert!(user.is_suspended_at(Utc::now() + Duration::days(3650)));

        user.ban("fraud".to_string());
        assert!(matches!(user.ensure_can_act(Utc::now()), Err(DomainError::AccountBanned)));

        user.reinstate();
        assert!(user.ensure_can_act(Utc::now()).is_ok());
        assert!(user.suspension_reason.is_none());
    }

    #[test]
    fn test_private_profile_visibility() {
        let mut owner = user();
        owner.profile_visibility = ProfileVisibility::Private;

        let mut stranger = user();
        stranger.id = Snowflake::new(2);
        assert!(!owner.profile_visible_to(Some(&stranger)));
        assert!(!owner.profile_visible_to(None));
        assert!(owner.profile_visible_to(Some(&owner.clone())));

        stranger.role = UserRole::Moderator;
        assert!(owner.profile_visible_to(Some(&stranger)));
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("dream_x1").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
    }

    #[test]
    fn test_username_base() {
        assert_eq!(username_base("Jane Doe"), "jane_doe");
        assert_eq!(username_base("李"), "___");
        assert!(validate_username(&username_base("x.y-z!")).is_ok());
    }
}
