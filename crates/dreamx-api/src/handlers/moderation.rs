//! Moderation handlers
//!
//! Blocks and reports are open to every user; the `/moderation` routes
//! are staff-only and the service layer enforces the role.

use axum::{extract::State, Json};
use dreamx_core::Snowflake;
use dreamx_service::dto::{
    AppealListQuery, AppealResponse, AuditEntryResponse, BanUserRequest, BlockResponse,
    CreateAppealRequest, CreateReportRequest, CurrentUserResponse, DecideAppealRequest,
    PageParams, PagedResponse, ReportListQuery, ReportResponse, ResolveReportRequest,
    SetRoleRequest, SuspendUserRequest,
};
use dreamx_service::services::ModerationService;

use crate::extractors::{AuthUser, JsonBody, QueryParams, SnowflakePath, ValidatedJson};
use crate::response::{ApiResult, Created, NoContent};
use crate::state::AppState;

// ============================================================================
// Blocks
// ============================================================================

/// GET /users/@me/blocks
pub async fn list_blocks(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Vec<BlockResponse>>> {
    let blocks = ModerationService::new(state.service_context())
        .list_blocks(auth.user_id)
        .await?;
    Ok(Json(blocks))
}

/// Idempotent
///
/// PUT /users/{user_id}/block
pub async fn block_user(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(user_id): SnowflakePath<Snowflake>,
) -> ApiResult<NoContent> {
    ModerationService::new(state.service_context())
        .block(auth.user_id, user_id)
        .await?;
    Ok(NoContent)
}

/// DELETE /users/{user_id}/block
pub async fn unblock_user(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(user_id): SnowflakePath<Snowflake>,
) -> ApiResult<NoContent> {
    ModerationService::new(state.service_context())
        .unblock(auth.user_id, user_id)
        .await?;
    Ok(NoContent)
}

// ============================================================================
// Reports
// ============================================================================

/// POST /reports
pub async fn create_report(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateReportRequest>,
) -> ApiResult<Created<Json<ReportResponse>>> {
    let report = ModerationService::new(state.service_context())
        .report(auth.user_id, request)
        .await?;
    Ok(Created(Json(report)))
}

/// GET /moderation/reports?status=
pub async fn list_reports(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(query): QueryParams<ReportListQuery>,
) -> ApiResult<Json<Vec<ReportResponse>>> {
    let reports = ModerationService::new(state.service_context())
        .list_reports(auth.user_id, query)
        .await?;
    Ok(Json(reports))
}

/// POST /moderation/reports/{report_id}/resolve
pub async fn resolve_report(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(report_id): SnowflakePath<Snowflake>,
    ValidatedJson(request): ValidatedJson<ResolveReportRequest>,
) -> ApiResult<Json<ReportResponse>> {
    let report = ModerationService::new(state.service_context())
        .resolve_report(auth.user_id, report_id, request)
        .await?;
    Ok(Json(report))
}

// ============================================================================
// Account status
// ============================================================================

/// POST /moderation/users/{user_id}/suspend
pub async fn suspend_user(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(user_id): SnowflakePath<Snowflake>,
    ValidatedJson(request): ValidatedJson<SuspendUserRequest>,
) -> ApiResult<Json<CurrentUserResponse>> {
    let user = ModerationService::new(state.service_context())
        .suspend_user(auth.user_id, user_id, request)
        .await?;
    Ok(Json(user))
}

/// POST /moderation/users/{user_id}/unsuspend
pub async fn unsuspend_user(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(user_id): SnowflakePath<Snowflake>,
) -> ApiResult<Json<CurrentUserResponse>> {
    let user = ModerationService::new(state.service_context())
        .unsuspend_user(auth.user_id, user_id)
        .await?;
    Ok(Json(user))
}

/// POST /moderation/users/{user_id}/ban
pub async fn ban_user(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(user_id): SnowflakePath<Snowflake>,
    ValidatedJson(request): ValidatedJson<BanUserRequest>,
) -> ApiResult<Json<CurrentUserResponse>> {
    let user = ModerationService::new(state.service_context())
        .ban_user(auth.user_id, user_id, request)
        .await?;
    Ok(Json(user))
}

/// Admin only
///
/// PUT /moderation/users/{user_id}/role
pub async fn set_role(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(user_id): SnowflakePath<Snowflake>,
    JsonBody(request): JsonBody<SetRoleRequest>,
) -> ApiResult<Json<CurrentUserResponse>> {
    let user = ModerationService::new(state.service_context())
        .set_role(auth.user_id, user_id, request)
        .await?;
    Ok(Json(user))
}

// ============================================================================
// Appeals
// ============================================================================

/// POST /appeals
pub async fn create_appeal(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateAppealRequest>,
) -> ApiResult<Created<Json<AppealResponse>>> {
    let appeal = ModerationService::new(state.service_context())
        .create_appeal(auth.user_id, request)
        .await?;
    Ok(Created(Json(appeal)))
}

/// GET /appeals/@me
pub async fn my_appeals(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Vec<AppealResponse>>> {
    let appeals = ModerationService::new(state.service_context())
        .my_appeals(auth.user_id)
        .await?;
    Ok(Json(appeals))
}

/// GET /moderation/appeals?status=
pub async fn list_appeals(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(query): QueryParams<AppealListQuery>,
) -> ApiResult<Json<Vec<AppealResponse>>> {
    let appeals = ModerationService::new(state.service_context())
        .list_appeals(auth.user_id, query)
        .await?;
    Ok(Json(appeals))
}

/// POST /moderation/appeals/{appeal_id}/decide
pub async fn decide_appeal(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(appeal_id): SnowflakePath<Snowflake>,
    ValidatedJson(request): ValidatedJson<DecideAppealRequest>,
) -> ApiResult<Json<AppealResponse>> {
    let appeal = ModerationService::new(state.service_context())
        .decide_appeal(auth.user_id, appeal_id, request)
        .await?;
    Ok(Json(appeal))
}

/// GET /moderation/audit?page=&per_page=
pub async fn list_audit(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(params): QueryParams<PageParams>,
) -> ApiResult<Json<PagedResponse<AuditEntryResponse>>> {
    let entries = ModerationService::new(state.service_context())
        .list_audit(auth.user_id, params)
        .await?;
    Ok(Json(entries))
}
