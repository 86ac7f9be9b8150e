//! Authentication extractor
//!
//! Extracts and validates JWT access tokens from the Authorization header.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use dreamx_core::Snowflake;

use crate::response::ApiError;
use crate::state::AppState;

/// Authenticated user extracted from JWT token
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Snowflake,
}

impl AuthUser {
    pub fn new(user_id: Snowflake) -> Self {
        Self { user_id }
    }
}

/// Validate a bearer token and pull the user id out of its claims
fn authenticate(state: &AppState, token: &str) -> Result<AuthUser, ApiError> {
    let claims = state.jwt_service().validate_access_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        ApiError::App(e)
    })?;

    let user_id = claims.user_id().map_err(|e| {
        tracing::warn!(error = %e, "Invalid user ID in token");
        ApiError::InvalidAuthFormat
    })?;

    Ok(AuthUser::new(user_id))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::MissingAuth)?;

        authenticate(&AppState::from_ref(state), bearer.token())
    }
}

/// Optional authenticated user
///
/// `None` without an Authorization header; a present but invalid token is
/// still rejected.
#[derive(Debug, Clone, Copy)]
pub struct OptionalAuthUser(pub Option<AuthUser>);

impl OptionalAuthUser {
    pub fn user_id(&self) -> Option<Snowflake> {
        self.0.map(|auth| auth.user_id)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await {
            Ok(TypedHeader(Authorization(bearer))) => {
                let auth = authenticate(&AppState::from_ref(state), bearer.token())?;
                Ok(OptionalAuthUser(Some(auth)))
            }
            Err(_) => Ok(OptionalAuthUser(None)),
        }
    }
}
