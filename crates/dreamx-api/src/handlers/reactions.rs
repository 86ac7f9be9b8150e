//! Reaction toggle handlers
//!
//! Posts, messages and comments share one contract: posting the same kind
//! twice clears it, a different kind replaces it, and every answer carries
//! the fresh counts.

use axum::{extract::State, Json};
use dreamx_core::{ReactionSummary, ReactionToggle, Snowflake};
use dreamx_service::dto::ToggleReactionRequest;
use dreamx_service::services::ReactionService;

use crate::extractors::{AuthUser, OptionalJson, SnowflakePath};
use crate::response::ApiResult;
use crate::state::AppState;

/// POST /posts/{post_id}/reactions
pub async fn toggle_post_reaction(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(post_id): SnowflakePath<Snowflake>,
    OptionalJson(request): OptionalJson<ToggleReactionRequest>,
) -> ApiResult<Json<ReactionToggle>> {
    let toggle = ReactionService::new(state.service_context())
        .toggle_post(auth.user_id, post_id, request)
        .await?;
    Ok(Json(toggle))
}

/// GET /posts/{post_id}/reactions
pub async fn get_post_reactions(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(post_id): SnowflakePath<Snowflake>,
) -> ApiResult<Json<ReactionSummary>> {
    let summary = ReactionService::new(state.service_context())
        .post_reactions(auth.user_id, post_id)
        .await?;
    Ok(Json(summary))
}

/// POST /messages/{message_id}/reactions
pub async fn toggle_message_reaction(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(message_id): SnowflakePath<Snowflake>,
    OptionalJson(request): OptionalJson<ToggleReactionRequest>,
) -> ApiResult<Json<ReactionToggle>> {
    let toggle = ReactionService::new(state.service_context())
        .toggle_message(auth.user_id, message_id, request)
        .await?;
    Ok(Json(toggle))
}

/// GET /messages/{message_id}/reactions
pub async fn get_message_reactions(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(message_id): SnowflakePath<Snowflake>,
) -> ApiResult<Json<ReactionSummary>> {
    let summary = ReactionService::new(state.service_context())
        .message_reactions(auth.user_id, message_id)
        .await?;
    Ok(Json(summary))
}

/// POST /comments/{comment_id}/likes
pub async fn toggle_comment_like(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(comment_id): SnowflakePath<Snowflake>,
    OptionalJson(request): OptionalJson<ToggleReactionRequest>,
) -> ApiResult<Json<ReactionToggle>> {
    let toggle = ReactionService::new(state.service_context())
        .toggle_comment_like(auth.user_id, comment_id, request)
        .await?;
    Ok(Json(toggle))
}

/// GET /comments/{comment_id}/likes
pub async fn get_comment_likes(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(comment_id): SnowflakePath<Snowflake>,
) -> ApiResult<Json<ReactionSummary>> {
    let summary = ReactionService::new(state.service_context())
        .comment_likes(auth.user_id, comment_id)
        .await?;
    Ok(Json(summary))
}
