//! WebAuthn (passkey) handlers

use axum::{extract::State, Json};
use dreamx_core::Snowflake;
use dreamx_service::dto::{
    AuthResponse, CredentialResponse, LoginOptionsResponse, RegistrationOptionsResponse,
    WebAuthnLoginBeginRequest, WebAuthnLoginFinishRequest, WebAuthnRegisterFinishRequest,
};
use dreamx_service::services::WebAuthnService;

use crate::extractors::{AuthUser, JsonBody, OptionalJson, SnowflakePath, ValidatedJson};
use crate::response::{ApiResult, Created, NoContent};
use crate::state::AppState;

/// POST /auth/webauthn/register/begin
pub async fn register_begin(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<RegistrationOptionsResponse>> {
    let options = WebAuthnService::new(state.service_context())
        .register_begin(auth.user_id)
        .await?;
    Ok(Json(options))
}

/// POST /auth/webauthn/register/finish
pub async fn register_finish(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<WebAuthnRegisterFinishRequest>,
) -> ApiResult<Created<Json<CredentialResponse>>> {
    let credential = WebAuthnService::new(state.service_context())
        .register_finish(auth.user_id, request)
        .await?;
    Ok(Created(Json(credential)))
}

/// Body is optional; without a username any discoverable credential may answer
///
/// POST /auth/webauthn/login/begin
pub async fn login_begin(
    State(state): State<AppState>,
    OptionalJson(request): OptionalJson<WebAuthnLoginBeginRequest>,
) -> ApiResult<Json<LoginOptionsResponse>> {
    let options = WebAuthnService::new(state.service_context())
        .login_begin(request)
        .await?;
    Ok(Json(options))
}

/// POST /auth/webauthn/login/finish
pub async fn login_finish(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<WebAuthnLoginFinishRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let response = WebAuthnService::new(state.service_context())
        .login_finish(request)
        .await?;
    Ok(Json(response))
}

/// GET /auth/webauthn/credentials
pub async fn list_credentials(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<CredentialResponse>>> {
    let credentials = WebAuthnService::new(state.service_context())
        .list_credentials(auth.user_id)
        .await?;
    Ok(Json(credentials))
}

/// DELETE /auth/webauthn/credentials/{credential_id}
pub async fn delete_credential(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(credential_id): SnowflakePath<Snowflake>,
) -> ApiResult<NoContent> {
    WebAuthnService::new(state.service_context())
        .delete_credential(auth.user_id, credential_id)
        .await?;
    Ok(NoContent)
}
