//! Message handlers
//!
//! Endpoints for message operations and file uploads.

use axum::{extract::State, Json};
use dreamx_core::Snowflake;
use dreamx_service::dto::{
    CursorParams, EditMessageRequest, MessageResponse, SendMessageRequest, UploadResponse,
};
use dreamx_service::services::MessageService;

use crate::extractors::{AuthUser, FileUpload, QueryParams, SnowflakePath, ValidatedJson};
use crate::response::{ApiResult, Created, NoContent};
use crate::state::AppState;

/// Get messages in a conversation, newest first
///
/// GET /conversations/{conversation_id}/messages
pub async fn get_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(conversation_id): SnowflakePath<Snowflake>,
    QueryParams(params): QueryParams<CursorParams>,
) -> ApiResult<Json<Vec<MessageResponse>>> {
    let messages = MessageService::new(state.service_context())
        .list_messages(auth.user_id, conversation_id, params)
        .await?;
    Ok(Json(messages))
}

/// Send message
///
/// POST /conversations/{conversation_id}/messages
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(conversation_id): SnowflakePath<Snowflake>,
    ValidatedJson(request): ValidatedJson<SendMessageRequest>,
) -> ApiResult<Created<Json<MessageResponse>>> {
    let message = MessageService::new(state.service_context())
        .send_message(auth.user_id, conversation_id, request)
        .await?;
    Ok(Created(Json(message)))
}

/// Edit message (sender only)
///
/// PATCH /messages/{message_id}
pub async fn edit_message(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(message_id): SnowflakePath<Snowflake>,
    ValidatedJson(request): ValidatedJson<EditMessageRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let message = MessageService::new(state.service_context())
        .edit_message(auth.user_id, message_id, request)
        .await?;
    Ok(Json(message))
}

/// Delete message (sender or staff)
///
/// DELETE /messages/{message_id}
pub async fn delete_message(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(message_id): SnowflakePath<Snowflake>,
) -> ApiResult<NoContent> {
    MessageService::new(state.service_context())
        .delete_message(auth.user_id, message_id)
        .await?;
    Ok(NoContent)
}

/// Store a file for a message attachment or post image
///
/// POST /uploads
pub async fn upload_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    FileUpload(file): FileUpload,
) -> ApiResult<Created<Json<UploadResponse>>> {
    let upload = MessageService::new(state.service_context())
        .upload_attachment(auth.user_id, file)
        .await?;
    Ok(Created(Json(upload)))
}
