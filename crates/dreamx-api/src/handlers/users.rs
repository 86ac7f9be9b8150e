//! User profile handlers

use axum::{extract::State, Json};
use dreamx_core::Snowflake;
use dreamx_service::dto::{
    CurrentUserResponse, PublicUserResponse, SearchUsersQuery, UpdatePreferencesRequest,
    UpdateProfileRequest, UserResponse,
};
use dreamx_service::services::UserService;

use crate::extractors::{AuthUser, FileUpload, OptionalAuthUser, QueryParams, SnowflakePath, ValidatedJson};
use crate::response::ApiResult;
use crate::state::AppState;

/// Get current user
///
/// GET /users/@me
pub async fn get_current_user(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<CurrentUserResponse>> {
    let user = UserService::new(state.service_context()).me(auth.user_id).await?;
    Ok(Json(user))
}

/// Update profile fields
///
/// PATCH /users/@me
pub async fn update_current_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<Json<CurrentUserResponse>> {
    let user = UserService::new(state.service_context())
        .update_profile(auth.user_id, request)
        .await?;
    Ok(Json(user))
}

/// PATCH /users/@me/preferences
pub async fn update_preferences(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<UpdatePreferencesRequest>,
) -> ApiResult<Json<CurrentUserResponse>> {
    let user = UserService::new(state.service_context())
        .update_preferences(auth.user_id, request)
        .await?;
    Ok(Json(user))
}

/// Replace the avatar with a multipart `file` upload
///
/// PUT /users/@me/avatar
pub async fn upload_avatar(
    State(state): State<AppState>,
    auth: AuthUser,
    FileUpload(file): FileUpload,
) -> ApiResult<Json<CurrentUserResponse>> {
    let user = UserService::new(state.service_context())
        .upload_avatar(auth.user_id, file)
        .await?;
    Ok(Json(user))
}

/// GET /users/search?q=&limit=
pub async fn search_users(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<SearchUsersQuery>,
) -> ApiResult<Json<Vec<PublicUserResponse>>> {
    let users = UserService::new(state.service_context()).search(query).await?;
    Ok(Json(users))
}

/// Get a profile; private profiles show only the public card to strangers
///
/// GET /users/{user_id}
pub async fn get_user(
    State(state): State<AppState>,
    viewer: OptionalAuthUser,
    SnowflakePath(user_id): SnowflakePath<Snowflake>,
) -> ApiResult<Json<UserResponse>> {
    let user = UserService::new(state.service_context())
        .get_user(viewer.user_id(), user_id)
        .await?;
    Ok(Json(user))
}
