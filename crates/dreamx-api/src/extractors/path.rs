//! Path parameter extractors
//!
//! Ids in paths are Snowflakes; a malformed one is a 400, not a 404.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::response::ApiError;

/// Path extractor with the API's error shape
///
/// `SnowflakePath<Snowflake>` for one id, a tuple for several.
#[derive(Debug, Clone)]
pub struct SnowflakePath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for SnowflakePath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(inner) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_path(e.body_text()))?;

        Ok(SnowflakePath(inner))
    }
}
