//! Query string extractor
//!
//! Wraps `Query` so a bad cursor or limit answers with the JSON error body.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::response::ApiError;

#[derive(Debug, Clone, Default)]
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_query(e.body_text()))?;

        Ok(QueryParams(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use dreamx_core::Snowflake;
    use dreamx_service::dto::CursorParams;

    async fn extract(uri: &str) -> Result<CursorParams, ApiError> {
        let (mut parts, ()) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        QueryParams::<CursorParams>::from_request_parts(&mut parts, &())
            .await
            .map(|QueryParams(p)| p)
    }

    #[tokio::test]
    async fn test_cursor_params_parse_string_ids() {
        let params = extract("/posts?before=123456789&limit=25").await.unwrap();
        assert_eq!(params.before, Some(Snowflake::new(123_456_789)));
        assert_eq!(params.limit, Some(25));
        assert!(params.after.is_none());
    }

    #[tokio::test]
    async fn test_bad_cursor_is_rejected() {
        let err = extract("/posts?before=yesterday").await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_QUERY_PARAMETER");
    }
}
