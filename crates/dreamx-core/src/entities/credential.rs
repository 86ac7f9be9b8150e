//! Credentials beyond the password hash: OAuth links, WebAuthn keys,
//! refresh tokens, and short-lived auth challenges

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Supported OAuth identity providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Github,
    Discord,
}

impl OAuthProvider {
    pub const ALL: [Self; 3] = [Self::Google, Self::Github, Self::Discord];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
            Self::Discord => "discord",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Some(Self::Google),
            "github" => Some(Self::Github),
            "discord" => Some(Self::Discord),
            _ => None,
        }
    }
}

/// Link between a local user and a provider account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthAccount {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub provider: OAuthProvider,
    pub provider_user_id: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Registered WebAuthn public-key credential (ES256)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAuthnCredential {
    pub id: Snowflake,
    pub user_id: Snowflake,
    /// base64url credential id as reported by the authenticator
    pub credential_id: String,
    /// SubjectPublicKeyInfo DER of the P-256 key
    pub public_key: Vec<u8>,
    pub sign_count: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Persisted refresh token (only the hash is stored)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

/// What a challenge row is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengePurpose {
    OAuthState,
    WebAuthnRegister,
    WebAuthnLogin,
    EmailVerification,
    PasswordReset,
}

impl ChallengePurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OAuthState => "oauth_state",
            Self::WebAuthnRegister => "webauthn_register",
            Self::WebAuthnLogin => "webauthn_login",
            Self::EmailVerification => "email_verification",
            Self::PasswordReset => "password_reset",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "oauth_state" => Some(Self::OAuthState),
            "webauthn_register" => Some(Self::WebAuthnRegister),
            "webauthn_login" => Some(Self::WebAuthnLogin),
            "email_verification" => Some(Self::EmailVerification),
            "password_reset" => Some(Self::PasswordReset),
            _ => None,
        }
    }

    /// How long a challenge of this kind stays redeemable
    pub fn ttl(self) -> Duration {
        match self {
            Self::OAuthState => Duration::minutes(10),
            Self::WebAuthnRegister | Self::WebAuthnLogin => Duration::minutes(5),
            Self::EmailVerification => Duration::hours(24),
            Self::PasswordReset => Duration::hours(1),
        }
    }
}

/// One-time challenge, redeemed (deleted) on first use
///
/// `token` is the raw challenge for OAuth/WebAuthn and the SHA-256 hex of
/// the mailed token for email verification and password reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    pub token: String,
    pub purpose: ChallengePurpose,
    pub user_id: Option<Snowflake>,
    pub data: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AuthChallenge {
    pub fn new(token: String, purpose: ChallengePurpose, user_id: Option<Snowflake>) -> Self {
        let now = Utc::now();
        Self {
            token,
            purpose,
            user_id,
            data: None,
            expires_at: now + purpose.ttl(),
            created_at: now,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse_roundtrip() {
        for provider in OAuthProvider::ALL {
            assert_eq!(OAuthProvider::parse(provider.as_str()), Some(provider));
        }
        assert_eq!(OAuthProvider::parse("GitHub"), Some(OAuthProvider::Github));
        assert_eq!(OAuthProvider::parse("myspace"), None);
    }

    #[test]
    fn test_challenge_expiry() {
        let challenge = AuthChallenge::new("abc".into(), ChallengePurpose::WebAuthnLogin, None);
        assert!(!challenge.is_expired_at(Utc::now()));
        assert!(challenge.is_expired_at(Utc::now() + Duration::minutes(6)));
    }

    #[test]
    fn test_refresh_token_validity() {
        let now = Utc::now();
        let mut token = RefreshToken {
            id: Snowflake::new(1),
            user_id: Snowflake::new(2),
            token_hash: "h".into(),
            expires_at: now + Duration::days(1),
            created_at: now,
            revoked_at: None,
        };
        assert!(token.is_valid_at(now));
        token.revoked_at = Some(now);
        assert!(!token.is_valid_at(now));
    }
}
