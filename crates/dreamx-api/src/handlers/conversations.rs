//! Conversation handlers: direct and group chats

use axum::{extract::State, Json};
use dreamx_core::Snowflake;
use dreamx_service::dto::{
    AddMembersRequest, ConversationListQuery, ConversationResponse, CreateGroupRequest,
    OpenDirectRequest, RenameGroupRequest,
};
use dreamx_service::services::ConversationService;

use crate::extractors::{AuthUser, JsonBody, QueryParams, SnowflakePath, ValidatedJson};
use crate::response::{ApiResult, Created, NoContent};
use crate::state::AppState;

/// Most recently active first, with unread counts
///
/// GET /conversations?limit=
pub async fn list_conversations(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(query): QueryParams<ConversationListQuery>,
) -> ApiResult<Json<Vec<ConversationResponse>>> {
    let conversations = ConversationService::new(state.service_context())
        .list_conversations(auth.user_id, query)
        .await?;
    Ok(Json(conversations))
}

/// Get or create the direct conversation with another user
///
/// POST /conversations/direct
pub async fn open_direct(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(request): JsonBody<OpenDirectRequest>,
) -> ApiResult<Json<ConversationResponse>> {
    let conversation = ConversationService::new(state.service_context())
        .open_direct(auth.user_id, request)
        .await?;
    Ok(Json(conversation))
}

/// POST /conversations/group
pub async fn create_group(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateGroupRequest>,
) -> ApiResult<Created<Json<ConversationResponse>>> {
    let conversation = ConversationService::new(state.service_context())
        .create_group(auth.user_id, request)
        .await?;
    Ok(Created(Json(conversation)))
}

/// GET /conversations/{conversation_id}
pub async fn get_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(conversation_id): SnowflakePath<Snowflake>,
) -> ApiResult<Json<ConversationResponse>> {
    let conversation = ConversationService::new(state.service_context())
        .get_conversation(auth.user_id, conversation_id)
        .await?;
    Ok(Json(conversation))
}

/// PATCH /conversations/{conversation_id}
pub async fn rename_group(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(conversation_id): SnowflakePath<Snowflake>,
    ValidatedJson(request): ValidatedJson<RenameGroupRequest>,
) -> ApiResult<Json<ConversationResponse>> {
    let conversation = ConversationService::new(state.service_context())
        .rename_group(auth.user_id, conversation_id, request)
        .await?;
    Ok(Json(conversation))
}

/// POST /conversations/{conversation_id}/members
pub async fn add_members(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(conversation_id): SnowflakePath<Snowflake>,
    ValidatedJson(request): ValidatedJson<AddMembersRequest>,
) -> ApiResult<Json<ConversationResponse>> {
    let conversation = ConversationService::new(state.service_context())
        .add_members(auth.user_id, conversation_id, request)
        .await?;
    Ok(Json(conversation))
}

/// Owner removes a member, or a member leaves
///
/// DELETE /conversations/{conversation_id}/members/{user_id}
pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath((conversation_id, user_id)): SnowflakePath<(Snowflake, Snowflake)>,
) -> ApiResult<NoContent> {
    ConversationService::new(state.service_context())
        .remove_member(auth.user_id, conversation_id, user_id)
        .await?;
    Ok(NoContent)
}

/// POST /conversations/{conversation_id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(conversation_id): SnowflakePath<Snowflake>,
) -> ApiResult<NoContent> {
    ConversationService::new(state.service_context())
        .mark_read(auth.user_id, conversation_id)
        .await?;
    Ok(NoContent)
}
