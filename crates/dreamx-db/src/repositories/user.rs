//! SQLite implementation of UserRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::instrument;

use dreamx_core::entities::{User, UserStatus};
use dreamx_core::error::DomainError;
use dreamx_core::traits::{PageQuery, RepoResult, UserFilter, UserRepository};
use dreamx_core::value_objects::Snowflake;

use crate::models::UserModel;

use super::error::{like_contains, like_prefix, map_db_error, map_unique_violation};

pub(crate) const USER_COLUMNS: &str = "id, username, email, display_name, avatar, bio, location, website, \
     role, status, suspended_until, suspension_reason, email_verified, notify_email, notify_push, \
     profile_visibility, allow_messages, created_at, updated_at, last_login_at";

/// SQLite implementation of UserRepository
#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    /// Create a new SqliteUserRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn unique_error(e: sqlx::Error) -> DomainError {
        let message = e.to_string();
        map_unique_violation(e, || {
            if message.contains("users.username") {
                DomainError::UsernameAlreadyExists
            } else {
                DomainError::EmailAlreadyExists
            }
        })
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &UserFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(q) = filter.q.as_deref().filter(|q| !q.trim().is_empty()) {
        let pattern = like_contains(q.trim());
        qb.push(" AND (username LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR email LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR display_name LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.map(User::from))
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"))
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.map(User::from))
    }

    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let result =
            sqlx::query_as::<_, UserModel>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"))
                .bind(username.trim())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_error)?;

        Ok(result.map(User::from))
    }

    #[instrument(skip(self))]
    async fn email_exists(&self, email: &str) -> RepoResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)")
            .bind(email.trim())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn username_exists(&self, username: &str) -> RepoResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)")
            .bind(username.trim())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(exists)
    }

    #[instrument(skip(self, user, password_hash), fields(user_id = %user.id))]
    async fn create(&self, user: &User, password_hash: Option<&str>) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO users (
                id, username, email, display_name, password_hash, avatar, bio, location, website,
                role, status, suspended_until, suspension_reason, email_verified, notify_email,
                notify_push, profile_visibility, allow_messages, created_at, updated_at, last_login_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)
            ",
        )
        .bind(user.id.into_inner())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(password_hash)
        .bind(&user.avatar)
        .bind(&user.bio)
        .bind(&user.location)
        .bind(&user.website)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.suspended_until)
        .bind(&user.suspension_reason)
        .bind(user.email_verified)
        .bind(user.notify_email)
        .bind(user.notify_push)
        .bind(user.profile_visibility.as_str())
        .bind(user.allow_messages.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.last_login_at)
        .execute(&self.pool)
        .await
        .map_err(Self::unique_error)?;

        Ok(())
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update(&self, user: &User) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE users SET
                username = ?2, email = ?3, display_name = ?4, avatar = ?5, bio = ?6, location = ?7,
                website = ?8, role = ?9, status = ?10, suspended_until = ?11, suspension_reason = ?12,
                email_verified = ?13, notify_email = ?14, notify_push = ?15, profile_visibility = ?16,
                allow_messages = ?17, updated_at = ?18
            WHERE id = ?1
            ",
        )
        .bind(user.id.into_inner())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.avatar)
        .bind(&user.bio)
        .bind(&user.location)
        .bind(&user.website)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.suspended_until)
        .bind(&user.suspension_reason)
        .bind(user.email_verified)
        .bind(user.notify_email)
        .bind(user.notify_push)
        .bind(user.profile_visibility.as_str())
        .bind(user.allow_messages.as_str())
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Self::unique_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::UserNotFound(user.id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_password_hash(&self, id: Snowflake) -> RepoResult<Option<String>> {
        let hash: Option<Option<String>> = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = ?1")
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(hash.flatten())
    }

    #[instrument(skip(self, password_hash))]
    async fn update_password(&self, id: Snowflake, password_hash: &str) -> RepoResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id.into_inner())
            .bind(password_hash)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::UserNotFound(id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn touch_login(&self, id: Snowflake, at: DateTime<Utc>) -> RepoResult<()> {
        sqlx::query("UPDATE users SET last_login_at = ?2 WHERE id = ?1")
            .bind(id.into_inner())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn search(&self, q: &str, limit: i64) -> RepoResult<Vec<User>> {
        let pattern = like_prefix(q.trim());
        let results = sqlx::query_as::<_, UserModel>(&format!(
            r"
            SELECT {USER_COLUMNS} FROM users
            WHERE status != 'banned'
              AND (username LIKE ?1 ESCAPE '\' OR display_name LIKE ?1 ESCAPE '\')
            ORDER BY username
            LIMIT ?2
            "
        ))
        .bind(pattern)
        .bind(limit.clamp(1, 50))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(User::from).collect())
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &UserFilter, page: PageQuery) -> RepoResult<(Vec<User>, i64)> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users");
        push_filter(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY id DESC LIMIT ")
            .push_bind(page.per_page)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let results = qb
            .build_query_as::<UserModel>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok((results.into_iter().map(User::from).collect(), total))
    }

    #[instrument(skip(self))]
    async fn count_by_status(&self) -> RepoResult<Vec<(UserStatus, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as("SELECT status, COUNT(*) FROM users GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|(status, count)| UserStatus::parse(&status).map(|s| (s, count)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteUserRepository>();
    }
}
