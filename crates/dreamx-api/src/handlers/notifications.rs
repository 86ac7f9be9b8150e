//! Notification and Web Push handlers

use axum::{extract::State, Json};
use dreamx_core::Snowflake;
use dreamx_service::dto::{
    CountResponse, NotificationListQuery, NotificationResponse, PushSubscribeRequest,
    PushUnsubscribeRequest, VapidKeyResponse,
};
use dreamx_service::services::NotificationService;

use crate::extractors::{AuthUser, JsonBody, QueryParams, SnowflakePath, ValidatedJson};
use crate::response::{ApiResult, NoContent};
use crate::state::AppState;

/// GET /notifications?before=&limit=&unread_only=
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(query): QueryParams<NotificationListQuery>,
) -> ApiResult<Json<Vec<NotificationResponse>>> {
    let notifications = NotificationService::new(state.service_context())
        .list(auth.user_id, query)
        .await?;
    Ok(Json(notifications))
}

/// GET /notifications/unread-count
pub async fn unread_count(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<CountResponse>> {
    let count = NotificationService::new(state.service_context())
        .unread_count(auth.user_id)
        .await?;
    Ok(Json(count))
}

/// POST /notifications/{notification_id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(notification_id): SnowflakePath<Snowflake>,
) -> ApiResult<NoContent> {
    NotificationService::new(state.service_context())
        .mark_read(auth.user_id, notification_id)
        .await?;
    Ok(NoContent)
}

/// Returns how many were marked
///
/// POST /notifications/read-all
pub async fn mark_all_read(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<CountResponse>> {
    let count = NotificationService::new(state.service_context())
        .mark_all_read(auth.user_id)
        .await?;
    Ok(Json(count))
}

/// GET /notifications/push/vapid-key
pub async fn vapid_public_key(State(state): State<AppState>) -> Json<VapidKeyResponse> {
    Json(NotificationService::new(state.service_context()).vapid_public_key())
}

/// POST /notifications/push/subscribe
pub async fn subscribe_push(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<PushSubscribeRequest>,
) -> ApiResult<NoContent> {
    NotificationService::new(state.service_context())
        .subscribe_push(auth.user_id, request)
        .await?;
    Ok(NoContent)
}

/// POST /notifications/push/unsubscribe
pub async fn unsubscribe_push(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(request): JsonBody<PushUnsubscribeRequest>,
) -> ApiResult<NoContent> {
    NotificationService::new(state.service_context())
        .unsubscribe_push(auth.user_id, &request.endpoint)
        .await?;
    Ok(NoContent)
}
