//! Admin handlers

use axum::{extract::State, Json};
use dreamx_service::dto::{AdminUserResponse, PagedResponse, StatsResponse, UserListQuery};
use dreamx_service::services::AdminService;

use crate::extractors::{AuthUser, QueryParams};
use crate::response::ApiResult;
use crate::state::AppState;

/// Staff user directory
///
/// GET /admin/users?page=&per_page=&q=&status=&role=
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(query): QueryParams<UserListQuery>,
) -> ApiResult<Json<PagedResponse<AdminUserResponse>>> {
    let users = AdminService::new(state.service_context())
        .list_users(auth.user_id, query)
        .await?;
    Ok(Json(users))
}

/// GET /admin/stats
pub async fn stats(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<StatsResponse>> {
    let stats = AdminService::new(state.service_context()).stats(auth.user_id).await?;
    Ok(Json(stats))
}
