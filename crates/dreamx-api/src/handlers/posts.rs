//! Feed handlers: posts and comments

use axum::{extract::State, Json};
use dreamx_core::Snowflake;
use dreamx_service::dto::{
    CommentResponse, CreateCommentRequest, CreatePostRequest, CursorParams, FeedQuery,
    PostResponse, UpdatePostRequest,
};
use dreamx_service::services::PostService;

use crate::extractors::{AuthUser, QueryParams, SnowflakePath, ValidatedJson};
use crate::response::{ApiResult, Created, NoContent};
use crate::state::AppState;

/// Newest-first feed
///
/// GET /posts?before=&limit=&author=
pub async fn list_feed(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(query): QueryParams<FeedQuery>,
) -> ApiResult<Json<Vec<PostResponse>>> {
    let posts = PostService::new(state.service_context())
        .list_feed(auth.user_id, query)
        .await?;
    Ok(Json(posts))
}

/// POST /posts
pub async fn create_post(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreatePostRequest>,
) -> ApiResult<Created<Json<PostResponse>>> {
    let post = PostService::new(state.service_context())
        .create_post(auth.user_id, request)
        .await?;
    Ok(Created(Json(post)))
}

/// GET /posts/{post_id}
pub async fn get_post(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(post_id): SnowflakePath<Snowflake>,
) -> ApiResult<Json<PostResponse>> {
    let post = PostService::new(state.service_context())
        .get_post(auth.user_id, post_id)
        .await?;
    Ok(Json(post))
}

/// PATCH /posts/{post_id}
pub async fn update_post(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(post_id): SnowflakePath<Snowflake>,
    ValidatedJson(request): ValidatedJson<UpdatePostRequest>,
) -> ApiResult<Json<PostResponse>> {
    let post = PostService::new(state.service_context())
        .update_post(auth.user_id, post_id, request)
        .await?;
    Ok(Json(post))
}

/// DELETE /posts/{post_id}
pub async fn delete_post(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(post_id): SnowflakePath<Snowflake>,
) -> ApiResult<NoContent> {
    PostService::new(state.service_context())
        .delete_post(auth.user_id, post_id)
        .await?;
    Ok(NoContent)
}

/// Oldest-first comments
///
/// GET /posts/{post_id}/comments?after=&limit=
pub async fn list_comments(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(post_id): SnowflakePath<Snowflake>,
    QueryParams(params): QueryParams<CursorParams>,
) -> ApiResult<Json<Vec<CommentResponse>>> {
    let comments = PostService::new(state.service_context())
        .list_comments(auth.user_id, post_id, params)
        .await?;
    Ok(Json(comments))
}

/// POST /posts/{post_id}/comments
pub async fn add_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(post_id): SnowflakePath<Snowflake>,
    ValidatedJson(request): ValidatedJson<CreateCommentRequest>,
) -> ApiResult<Created<Json<CommentResponse>>> {
    let comment = PostService::new(state.service_context())
        .add_comment(auth.user_id, post_id, request)
        .await?;
    Ok(Created(Json(comment)))
}

/// DELETE /comments/{comment_id}
pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(comment_id): SnowflakePath<Snowflake>,
) -> ApiResult<NoContent> {
    PostService::new(state.service_context())
        .delete_comment(auth.user_id, comment_id)
        .await?;
    Ok(NoContent)
}
