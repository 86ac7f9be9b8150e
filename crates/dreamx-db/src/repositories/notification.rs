//! SQLite implementations of the notification repositories

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use dreamx_core::entities::{Notification, PushSubscription};
use dreamx_core::traits::{CursorQuery, NotificationRepository, PushSubscriptionRepository, RepoResult};
use dreamx_core::value_objects::Snowflake;

use crate::mappers::json_text;
use crate::models::{NotificationModel, PushSubscriptionModel};

use super::error::map_db_error;

#[derive(Clone)]
pub struct SqliteNotificationRepository {
    pool: SqlitePool,
}

impl SqliteNotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for SqliteNotificationRepository {
    #[instrument(skip(self, notification), fields(user_id = %notification.user_id, kind = notification.kind.as_str()))]
    async fn create(&self, notification: &Notification) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO notifications (id, user_id, actor_id, kind, body, link, data, read_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(notification.id.into_inner())
        .bind(notification.user_id.into_inner())
        .bind(notification.actor_id.map(Snowflake::into_inner))
        .bind(notification.kind.as_str())
        .bind(&notification.body)
        .bind(&notification.link)
        .bind(json_text(&notification.data))
        .bind(notification.read_at)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self, user_id: Snowflake, query: CursorQuery, unread_only: bool) -> RepoResult<Vec<Notification>> {
        let results = sqlx::query_as::<_, NotificationModel>(
            r"
            SELECT id, user_id, actor_id, kind, body, link, data, read_at, created_at
            FROM notifications
            WHERE user_id = ?1
              AND (?2 = 0 OR read_at IS NULL)
              AND (?3 IS NULL OR id < ?3)
              AND (?4 IS NULL OR id > ?4)
            ORDER BY id DESC
            LIMIT ?5
            ",
        )
        .bind(user_id.into_inner())
        .bind(unread_only)
        .bind(query.before.map(Snowflake::into_inner))
        .bind(query.after.map(Snowflake::into_inner))
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Notification::from).collect())
    }

    #[instrument(skip(self))]
    async fn unread_count(&self, user_id: Snowflake) -> RepoResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read_at IS NULL")
            .bind(user_id.into_inner())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn mark_read(&self, id: Snowflake, user_id: Snowflake, at: DateTime<Utc>) -> RepoResult<bool> {
        // already-read rows keep their original timestamp
        let result = sqlx::query(
            "UPDATE notifications SET read_at = COALESCE(read_at, ?3) WHERE id = ?1 AND user_id = ?2",
        )
        .bind(id.into_inner())
        .bind(user_id.into_inner())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn mark_all_read(&self, user_id: Snowflake, at: DateTime<Utc>) -> RepoResult<u64> {
        let result = sqlx::query("UPDATE notifications SET read_at = ?2 WHERE user_id = ?1 AND read_at IS NULL")
            .bind(user_id.into_inner())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}

#[derive(Clone)]
pub struct SqlitePushSubscriptionRepository {
    pool: SqlitePool,
}

impl SqlitePushSubscriptionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PushSubscriptionRepository for SqlitePushSubscriptionRepository {
    #[instrument(skip(self, subscription), fields(user_id = %subscription.user_id))]
    async fn upsert(&self, subscription: &PushSubscription) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO push_subscriptions (id, user_id, endpoint, p256dh, auth, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(endpoint) DO UPDATE SET
                user_id = excluded.user_id,
                p256dh = excluded.p256dh,
                auth = excluded.auth
            ",
        )
        .bind(subscription.id.into_inner())
        .bind(subscription.user_id.into_inner())
        .bind(&subscription.endpoint)
        .bind(&subscription.p256dh)
        .bind(&subscription.auth)
        .bind(subscription.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_by_user(&self, user_id: Snowflake) -> RepoResult<Vec<PushSubscription>> {
        let results = sqlx::query_as::<_, PushSubscriptionModel>(
            r"
            SELECT id, user_id, endpoint, p256dh, auth, created_at
            FROM push_subscriptions
            WHERE user_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(PushSubscription::from).collect())
    }

    #[instrument(skip(self))]
    async fn delete_by_endpoint(&self, endpoint: &str, user_id: Option<Snowflake>) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE endpoint = ?1 AND (?2 IS NULL OR user_id = ?2)")
            .bind(endpoint)
            .bind(user_id.map(Snowflake::into_inner))
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }
}
