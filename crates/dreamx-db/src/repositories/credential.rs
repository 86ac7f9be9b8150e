//! SQLite implementations of the credential repositories

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use dreamx_core::entities::{
    AuthChallenge, ChallengePurpose, OAuthAccount, OAuthProvider, RefreshToken, WebAuthnCredential,
};
use dreamx_core::error::DomainError;
use dreamx_core::traits::{
    AuthChallengeRepository, OAuthAccountRepository, RefreshTokenRepository, RepoResult,
    WebAuthnCredentialRepository,
};
use dreamx_core::value_objects::Snowflake;

use crate::models::{AuthChallengeModel, OAuthAccountModel, RefreshTokenModel, WebAuthnCredentialModel};

use super::error::{map_db_error, map_unique_violation};

// ============================================================================
// OAuth accounts
// ============================================================================

#[derive(Clone)]
pub struct SqliteOAuthAccountRepository {
    pool: SqlitePool,
}

impl SqliteOAuthAccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OAuthAccountRepository for SqliteOAuthAccountRepository {
    #[instrument(skip(self))]
    async fn find(&self, provider: OAuthProvider, provider_user_id: &str) -> RepoResult<Option<OAuthAccount>> {
        let result = sqlx::query_as::<_, OAuthAccountModel>(
            r"
            SELECT id, user_id, provider, provider_user_id, email, created_at
            FROM oauth_accounts
            WHERE provider = ?1 AND provider_user_id = ?2
            ",
        )
        .bind(provider.as_str())
        .bind(provider_user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(OAuthAccount::from))
    }

    #[instrument(skip(self, account), fields(user_id = %account.user_id))]
    async fn create(&self, account: &OAuthAccount) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO oauth_accounts (id, user_id, provider, provider_user_id, email, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(account.id.into_inner())
        .bind(account.user_id.into_inner())
        .bind(account.provider.as_str())
        .bind(&account.provider_user_id)
        .bind(&account.email)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                DomainError::ValidationError("this provider account is already linked".to_string())
            })
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_by_user(&self, user_id: Snowflake) -> RepoResult<Vec<OAuthAccount>> {
        let results = sqlx::query_as::<_, OAuthAccountModel>(
            r"
            SELECT id, user_id, provider, provider_user_id, email, created_at
            FROM oauth_accounts
            WHERE user_id = ?1
            ORDER BY id
            ",
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(OAuthAccount::from).collect())
    }
}

// ============================================================================
// WebAuthn credentials
// ============================================================================

#[derive(Clone)]
pub struct SqliteWebAuthnCredentialRepository {
    pool: SqlitePool,
}

impl SqliteWebAuthnCredentialRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebAuthnCredentialRepository for SqliteWebAuthnCredentialRepository {
    #[instrument(skip(self))]
    async fn find_by_credential_id(&self, credential_id: &str) -> RepoResult<Option<WebAuthnCredential>> {
        let result = sqlx::query_as::<_, WebAuthnCredentialModel>(
            r"
            SELECT id, user_id, credential_id, public_key, sign_count, name, created_at, last_used_at
            FROM webauthn_credentials
            WHERE credential_id = ?1
            ",
        )
        .bind(credential_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(WebAuthnCredential::from))
    }

    #[instrument(skip(self))]
    async fn list_by_user(&self, user_id: Snowflake) -> RepoResult<Vec<WebAuthnCredential>> {
        let results = sqlx::query_as::<_, WebAuthnCredentialModel>(
            r"
            SELECT id, user_id, credential_id, public_key, sign_count, name, created_at, last_used_at
            FROM webauthn_credentials
            WHERE user_id = ?1
            ORDER BY id
            ",
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(WebAuthnCredential::from).collect())
    }

    #[instrument(skip(self, credential), fields(user_id = %credential.user_id))]
    async fn create(&self, credential: &WebAuthnCredential) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO webauthn_credentials
                (id, user_id, credential_id, public_key, sign_count, name, created_at, last_used_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(credential.id.into_inner())
        .bind(credential.user_id.into_inner())
        .bind(&credential.credential_id)
        .bind(&credential.public_key)
        .bind(credential.sign_count)
        .bind(&credential.name)
        .bind(credential.created_at)
        .bind(credential.last_used_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || DomainError::CredentialAlreadyRegistered))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn record_use(&self, id: Snowflake, sign_count: i64, at: DateTime<Utc>) -> RepoResult<()> {
        sqlx::query("UPDATE webauthn_credentials SET sign_count = ?2, last_used_at = ?3 WHERE id = ?1")
            .bind(id.into_inner())
            .bind(sign_count)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Snowflake, user_id: Snowflake) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM webauthn_credentials WHERE id = ?1 AND user_id = ?2")
            .bind(id.into_inner())
            .bind(user_id.into_inner())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::CredentialNotFound);
        }

        Ok(())
    }
}

// ============================================================================
// Refresh tokens
// ============================================================================

#[derive(Clone)]
pub struct SqliteRefreshTokenRepository {
    pool: SqlitePool,
}

impl SqliteRefreshTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for SqliteRefreshTokenRepository {
    #[instrument(skip(self, token), fields(user_id = %token.user_id))]
    async fn create(&self, token: &RefreshToken) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at, revoked_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(token.id.into_inner())
        .bind(token.user_id.into_inner())
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(token.created_at)
        .bind(token.revoked_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, token_hash))]
    async fn find_by_hash(&self, token_hash: &str) -> RepoResult<Option<RefreshToken>> {
        let result = sqlx::query_as::<_, RefreshTokenModel>(
            r"
            SELECT id, user_id, token_hash, expires_at, created_at, revoked_at
            FROM refresh_tokens
            WHERE token_hash = ?1
            ",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(RefreshToken::from))
    }

    #[instrument(skip(self))]
    async fn revoke(&self, id: Snowflake, at: DateTime<Utc>) -> RepoResult<bool> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked_at = ?2 WHERE id = ?1 AND revoked_at IS NULL")
            .bind(id.into_inner())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn revoke_all_for_user(&self, user_id: Snowflake, at: DateTime<Utc>) -> RepoResult<u64> {
        let result =
            sqlx::query("UPDATE refresh_tokens SET revoked_at = ?2 WHERE user_id = ?1 AND revoked_at IS NULL")
                .bind(user_id.into_inner())
                .bind(at)
                .execute(&self.pool)
                .await
                .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}

// ============================================================================
// One-time challenges
// ============================================================================

#[derive(Clone)]
pub struct SqliteAuthChallengeRepository {
    pool: SqlitePool,
}

impl SqliteAuthChallengeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthChallengeRepository for SqliteAuthChallengeRepository {
    #[instrument(skip(self, challenge), fields(purpose = challenge.purpose.as_str()))]
    async fn create(&self, challenge: &AuthChallenge) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO auth_challenges (token, purpose, user_id, data, expires_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(&challenge.token)
        .bind(challenge.purpose.as_str())
        .bind(challenge.user_id.map(Snowflake::into_inner))
        .bind(&challenge.data)
        .bind(challenge.expires_at)
        .bind(challenge.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn take(&self, token: &str, purpose: ChallengePurpose) -> RepoResult<Option<AuthChallenge>> {
        let result = sqlx::query_as::<_, AuthChallengeModel>(
            r"
            DELETE FROM auth_challenges
            WHERE token = ?1 AND purpose = ?2
            RETURNING token, purpose, user_id, data, expires_at, created_at
            ",
        )
        .bind(token)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(AuthChallenge::from))
    }

    #[instrument(skip(self))]
    async fn purge_expired(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM auth_challenges WHERE expires_at < ?1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}
