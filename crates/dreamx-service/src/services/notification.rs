//! Notification service
//!
//! Stores notifications, hands them to the delivery queue, and manages
//! browser push subscriptions.

use chrono::Utc;
use dreamx_core::{CursorQuery, DomainError, Notification, PushSubscription, Snowflake};
use tracing::{info, instrument, warn};

use crate::dto::{
    CountResponse, NotificationListQuery, NotificationResponse, PushSubscribeRequest,
    VapidKeyResponse,
};

use super::context::ServiceContext;
use super::delivery::DeliveryJob;
use super::error::ServiceResult;

/// Notification service
pub struct NotificationService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> NotificationService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Store a notification and queue its delivery
    ///
    /// Never fails the caller: a storage error is logged and the
    /// notification is dropped. Users are never notified of their own actions.
    #[instrument(skip(self, notification), fields(user_id = %notification.user_id, kind = notification.kind.as_str()))]
    pub async fn notify(&self, notification: Notification) {
        if notification.actor_id == Some(notification.user_id) {
            return;
        }

        if let Err(e) = self.ctx.notification_repo().create(&notification).await {
            warn!(error = %e, "Could not store notification");
            return;
        }

        self.ctx.enqueue(DeliveryJob::Notification(notification));
    }

    /// List the user's notifications, newest first
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        user_id: Snowflake,
        query: NotificationListQuery,
    ) -> ServiceResult<Vec<NotificationResponse>> {
        let cursor = CursorQuery::new(query.before, None, query.limit);
        let notifications = self
            .ctx
            .notification_repo()
            .list(user_id, cursor, query.unread_only)
            .await?;

        Ok(notifications.into_iter().map(NotificationResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn unread_count(&self, user_id: Snowflake) -> ServiceResult<CountResponse> {
        let count = self.ctx.notification_repo().unread_count(user_id).await?;
        Ok(CountResponse { count })
    }

    #[instrument(skip(self))]
    pub async fn mark_read(&self, user_id: Snowflake, notification_id: Snowflake) -> ServiceResult<()> {
        let found = self
            .ctx
            .notification_repo()
            .mark_read(notification_id, user_id, Utc::now())
            .await?;
        if !found {
            return Err(DomainError::NotificationNotFound(notification_id).into());
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn mark_all_read(&self, user_id: Snowflake) -> ServiceResult<CountResponse> {
        let count = self.ctx.notification_repo().mark_all_read(user_id, Utc::now()).await?;
        info!(user_id = %user_id, count, "Notifications marked read");
        Ok(CountResponse { count: i64::try_from(count).unwrap_or(i64::MAX) })
    }

    /// Register a browser push endpoint; re-subscribing replaces the keys
    #[instrument(skip(self, request))]
    pub async fn subscribe_push(&self, user_id: Snowflake, request: PushSubscribeRequest) -> ServiceResult<()> {
        let subscription = PushSubscription {
            id: self.ctx.generate_id(),
            user_id,
            endpoint: request.endpoint,
            p256dh: request.keys.p256dh,
            auth: request.keys.auth,
            created_at: Utc::now(),
        };
        self.ctx.push_subscription_repo().upsert(&subscription).await?;

        info!(user_id = %user_id, "Push subscription saved");
        Ok(())
    }

    #[instrument(skip(self, endpoint))]
    pub async fn unsubscribe_push(&self, user_id: Snowflake, endpoint: &str) -> ServiceResult<()> {
        let removed = self
            .ctx
            .push_subscription_repo()
            .delete_by_endpoint(endpoint, Some(user_id))
            .await?;
        if removed {
            info!(user_id = %user_id, "Push subscription removed");
        }
        Ok(())
    }

    /// Application server key for `pushManager.subscribe()`
    pub fn vapid_public_key(&self) -> VapidKeyResponse {
        VapidKeyResponse {
            public_key: self.ctx.push_sender().and_then(|push| push.public_key()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::PushKeys;
    use crate::services::test_support::{context, create_user};
    use dreamx_core::NotificationKind;

    #[tokio::test]
    async fn test_notify_and_read_flow() {
        let ctx = context().await;
        let ana = create_user(&ctx, "ana").await;
        let bo = create_user(&ctx, "bo").await;
        let service = NotificationService::new(&ctx);

        service
            .notify(
                Notification::new(ctx.generate_id(), ana.id, Some(bo.id), NotificationKind::Comment, "bo commented".into())
                    .with_link("/posts/1"),
            )
            .await;
        service
            .notify(Notification::new(ctx.generate_id(), ana.id, None, NotificationKind::System, "welcome".into()))
            .await;

        assert_eq!(service.unread_count(ana.id).await.unwrap().count, 2);

        let list = service.list(ana.id, NotificationListQuery::default()).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].body, "welcome");

        service.mark_read(ana.id, list[0].id).await.unwrap();
        let unread = service
            .list(ana.id, NotificationListQuery { unread_only: true, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].link.as_deref(), Some("/posts/1"));

        assert_eq!(service.mark_all_read(ana.id).await.unwrap().count, 1);
        assert_eq!(service.unread_count(ana.id).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_self_notifications_are_skipped() {
        let ctx = context().await;
        let ana = create_user(&ctx, "ana").await;
        let service = NotificationService::new(&ctx);

        service
            .notify(Notification::new(ctx.generate_id(), ana.id, Some(ana.id), NotificationKind::Reaction, "x".into()))
            .await;
        assert_eq!(service.unread_count(ana.id).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_mark_read_of_someone_elses_notification() {
        let ctx = context().await;
        let ana = create_user(&ctx, "ana").await;
        let bo = create_user(&ctx, "bo").await;
        let service = NotificationService::new(&ctx);

        let n = Notification::new(ctx.generate_id(), ana.id, None, NotificationKind::System, "hi".into());
        let id = n.id;
        service.notify(n).await;

        let err = service.mark_read(bo.id, id).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_push_subscription_upsert() {
        let ctx = context().await;
        let ana = create_user(&ctx, "ana").await;
        let service = NotificationService::new(&ctx);

        let request = |auth: &str| PushSubscribeRequest {
            endpoint: "https://push.example/ep1".into(),
            keys: PushKeys { p256dh: "key".into(), auth: auth.into() },
        };
        service.subscribe_push(ana.id, request("a1")).await.unwrap();
        service.subscribe_push(ana.id, request("a2")).await.unwrap();

        let stored = ctx.push_subscription_repo().list_by_user(ana.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].auth, "a2");

        service.unsubscribe_push(ana.id, "https://push.example/ep1").await.unwrap();
        assert!(ctx.push_subscription_repo().list_by_user(ana.id).await.unwrap().is_empty());
        assert!(service.vapid_public_key().public_key.is_none());
    }
}
