//! Authentication handlers
//!
//! Password accounts, token rotation, email verification and password resets.

use axum::{extract::State, Json};
use dreamx_service::dto::{
    AuthResponse, ChangePasswordRequest, CurrentUserResponse, LoginRequest, LogoutRequest,
    PasswordResetRequest, RefreshTokenRequest, RegisterRequest, ResetPasswordRequest,
    VerifyEmailRequest,
};
use dreamx_service::services::AuthService;

use crate::extractors::{AuthUser, JsonBody, ValidatedJson};
use crate::response::{Accepted, ApiResult, Created, NoContent};
use crate::state::AppState;

/// Register a new user
///
/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> ApiResult<Created<Json<AuthResponse>>> {
    let response = AuthService::new(state.service_context()).register(request).await?;
    Ok(Created(Json(response)))
}

/// Login with email or username
///
/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let response = AuthService::new(state.service_context()).login(request).await?;
    Ok(Json(response))
}

/// Rotate a refresh token
///
/// POST /auth/refresh
pub async fn refresh_token(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RefreshTokenRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let response = AuthService::new(state.service_context())
        .refresh_tokens(request)
        .await?;
    Ok(Json(response))
}

/// Revoke one refresh token
///
/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(request): JsonBody<LogoutRequest>,
) -> ApiResult<NoContent> {
    AuthService::new(state.service_context())
        .logout(auth.user_id, &request.refresh_token)
        .await?;
    Ok(NoContent)
}

/// Revoke every refresh token of the caller
///
/// POST /auth/logout-all
pub async fn logout_all(State(state): State<AppState>, auth: AuthUser) -> ApiResult<NoContent> {
    AuthService::new(state.service_context())
        .logout_everywhere(auth.user_id)
        .await?;
    Ok(NoContent)
}

/// POST /auth/verify-email
pub async fn verify_email(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<VerifyEmailRequest>,
) -> ApiResult<Json<CurrentUserResponse>> {
    let user = AuthService::new(state.service_context())
        .verify_email(&request.token)
        .await?;
    Ok(Json(user))
}

/// POST /auth/verify-email/resend
pub async fn resend_verification(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Accepted> {
    AuthService::new(state.service_context())
        .resend_verification(auth.user_id)
        .await?;
    Ok(Accepted)
}

/// Request a password reset email
///
/// Always 202, whether or not the address belongs to an account.
///
/// POST /auth/password-reset
pub async fn request_password_reset(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<PasswordResetRequest>,
) -> ApiResult<Accepted> {
    AuthService::new(state.service_context())
        .request_password_reset(&request.email)
        .await?;
    Ok(Accepted)
}

/// POST /auth/password-reset/confirm
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ResetPasswordRequest>,
) -> ApiResult<NoContent> {
    AuthService::new(state.service_context())
        .reset_password(request)
        .await?;
    Ok(NoContent)
}

/// POST /auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<NoContent> {
    AuthService::new(state.service_context())
        .change_password(auth.user_id, request)
        .await?;
    Ok(NoContent)
}
