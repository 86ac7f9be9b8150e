//! Notification mappers

use dreamx_core::entities::{Notification, NotificationKind, PushSubscription};
use dreamx_core::value_objects::Snowflake;

use super::parse_json;
use crate::models::{NotificationModel, PushSubscriptionModel};

impl From<NotificationModel> for Notification {
    fn from(model: NotificationModel) -> Self {
        Notification {
            id: Snowflake::new(model.id),
            user_id: Snowflake::new(model.user_id),
            actor_id: model.actor_id.map(Snowflake::new),
            kind: NotificationKind::parse(&model.kind).unwrap_or(NotificationKind::System),
            body: model.body,
            link: model.link,
            data: parse_json(&model.data),
            read_at: model.read_at,
            created_at: model.created_at,
        }
    }
}

impl From<PushSubscriptionModel> for PushSubscription {
    fn from(model: PushSubscriptionModel) -> Self {
        PushSubscription {
            id: Snowflake::new(model.id),
            user_id: Snowflake::new(model.user_id),
            endpoint: model.endpoint,
            p256dh: model.p256dh,
            auth: model.auth,
            created_at: model.created_at,
        }
    }
}
