//! OAuth login handlers

use axum::{
    extract::{Path, State},
    response::Redirect,
    Json,
};
use dreamx_service::dto::{AuthResponse, OAuthCallbackQuery};
use dreamx_service::services::OAuthService;

use crate::extractors::QueryParams;
use crate::response::ApiResult;
use crate::state::AppState;

/// Redirect to the provider's consent screen
///
/// GET /auth/oauth/{provider}
pub async fn begin(State(state): State<AppState>, Path(provider): Path<String>) -> ApiResult<Redirect> {
    let url = OAuthService::new(state.service_context()).begin(&provider).await?;
    Ok(Redirect::to(&url))
}

/// Exchange the authorization code and sign the user in
///
/// GET /auth/oauth/{provider}/callback
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    QueryParams(query): QueryParams<OAuthCallbackQuery>,
) -> ApiResult<Json<AuthResponse>> {
    let response = OAuthService::new(state.service_context())
        .callback(&provider, &query.code, &query.state)
        .await?;
    Ok(Json(response))
}
