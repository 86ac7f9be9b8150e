//! User profile service
//!
//! Handles profile reads with the private-profile view, profile and
//! preference edits, avatars and user search.

use chrono::Utc;
use dreamx_core::Snowflake;
use tracing::{info, instrument};

use crate::dto::{
    CurrentUserResponse, PublicUserResponse, SearchUsersQuery, UpdatePreferencesRequest,
    UpdateProfileRequest, UserResponse,
};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::upload::{IncomingFile, UploadKind, UploadService, UPLOADS_PATH};

const SEARCH_DEFAULT_LIMIT: i64 = 20;
const SEARCH_MAX_LIMIT: i64 = 50;

fn clean(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| {
        let v = v.trim().to_string();
        (!v.is_empty()).then_some(v)
    })
}

/// User service for profile operations
pub struct UserService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> UserService<'a> {
    /// Create a new UserService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Get the current user's own account
    #[instrument(skip(self))]
    pub async fn me(&self, user_id: Snowflake) -> ServiceResult<CurrentUserResponse> {
        let user = self.ctx.load_user(user_id).await?;
        Ok(CurrentUserResponse::from(&user))
    }

    /// Get a user's profile as `viewer` sees it
    #[instrument(skip(self))]
    pub async fn get_user(&self, viewer_id: Option<Snowflake>, user_id: Snowflake) -> ServiceResult<UserResponse> {
        let user = self.ctx.load_user(user_id).await?;

        let viewer = match viewer_id {
            Some(id) if id == user.id => Some(user.clone()),
            Some(id) => self.ctx.user_repo().find_by_id(id).await?,
            None => None,
        };

        if user.profile_visible_to(viewer.as_ref()) {
            Ok(UserResponse::full(&user))
        } else {
            Ok(UserResponse::limited(&user))
        }
    }

    /// Update profile fields; an empty string clears an optional field
    #[instrument(skip(self, request))]
    pub async fn update_profile(&self, user_id: Snowflake, request: UpdateProfileRequest) -> ServiceResult<CurrentUserResponse> {
        let mut user = self.ctx.acting_user(user_id).await?;

        if let Some(display_name) = request.display_name {
            let display_name = display_name.trim().to_string();
            if display_name.is_empty() {
                return Err(ServiceError::validation("Display name cannot be blank"));
            }
            user.display_name = display_name;
        }
        if let Some(bio) = clean(request.bio) {
            user.bio = bio;
        }
        if let Some(location) = clean(request.location) {
            user.location = location;
        }
        if let Some(website) = clean(request.website) {
            user.website = website;
        }

        user.updated_at = Utc::now();
        self.ctx.user_repo().update(&user).await?;

        info!(user_id = %user_id, "Profile updated");
        Ok(CurrentUserResponse::from(&user))
    }

    #[instrument(skip(self, request))]
    pub async fn update_preferences(
        &self,
        user_id: Snowflake,
        request: UpdatePreferencesRequest,
    ) -> ServiceResult<CurrentUserResponse> {
        let mut user = self.ctx.load_user(user_id).await?;

        if let Some(v) = request.notify_email {
            user.notify_email = v;
        }
        if let Some(v) = request.notify_push {
            user.notify_push = v;
        }
        if let Some(v) = request.profile_visibility {
            user.profile_visibility = v;
        }
        if let Some(v) = request.allow_messages {
            user.allow_messages = v;
        }

        user.updated_at = Utc::now();
        self.ctx.user_repo().update(&user).await?;

        info!(user_id = %user_id, "Preferences updated");
        Ok(CurrentUserResponse::from(&user))
    }

    /// Store a new avatar and drop the previous uploaded one
    #[instrument(skip(self, file))]
    pub async fn upload_avatar(&self, user_id: Snowflake, file: IncomingFile) -> ServiceResult<CurrentUserResponse> {
        let mut user = self.ctx.acting_user(user_id).await?;
        let uploads = UploadService::new(self.ctx);

        let stored = uploads.store(user_id, UploadKind::Avatar, file).await?;
        let previous = user.avatar.replace(stored.url);
        user.updated_at = Utc::now();
        self.ctx.user_repo().update(&user).await?;

        // external avatars (OAuth pictures) are not ours to delete
        if let Some(previous) = previous.filter(|url| url.starts_with(UPLOADS_PATH)) {
            uploads.remove(&previous).await;
        }

        info!(user_id = %user_id, "Avatar updated");
        Ok(CurrentUserResponse::from(&user))
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: SearchUsersQuery) -> ServiceResult<Vec<PublicUserResponse>> {
        let q = query.q.trim();
        if q.is_empty() {
            return Ok(Vec::new());
        }
        let limit = query.limit.unwrap_or(SEARCH_DEFAULT_LIMIT).clamp(1, SEARCH_MAX_LIMIT);

        let users = self.ctx.user_repo().search(q, limit).await?;
        Ok(users.iter().map(PublicUserResponse::from).collect())
    }
}
