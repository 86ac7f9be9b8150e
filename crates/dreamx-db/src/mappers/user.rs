//! User entity <-> model mapper

use dreamx_core::entities::{MessagePolicy, ProfileVisibility, User, UserRole, UserStatus};
use dreamx_core::value_objects::Snowflake;

use crate::models::UserModel;

impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        User {
            id: Snowflake::new(model.id),
            username: model.username,
            email: model.email,
            display_name: model.display_name,
            avatar: model.avatar,
            bio: model.bio,
            location: model.location,
            website: model.website,
            role: UserRole::parse(&model.role).unwrap_or_default(),
            status: UserStatus::parse(&model.status).unwrap_or_default(),
            suspended_until: model.suspended_until,
            suspension_reason: model.suspension_reason,
            email_verified: model.email_verified,
            notify_email: model.notify_email,
            notify_push: model.notify_push,
            profile_visibility: ProfileVisibility::parse(&model.profile_visibility).unwrap_or_default(),
            allow_messages: MessagePolicy::parse(&model.allow_messages).unwrap_or_default(),
            created_at: model.created_at,
            updated_at: model.updated_at,
            last_login_at: model.last_login_at,
        }
    }
}
