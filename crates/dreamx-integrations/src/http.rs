//! Shared HTTP plumbing for vendor clients

use std::time::Duration;

use dreamx_core::{IntegrationError, IntegrationResult};
use serde::de::DeserializeOwned;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest provider error body kept in an error message
const MAX_ERROR_BODY: usize = 512;

/// Build the client every integration uses
pub fn client() -> IntegrationResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("dreamx/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| IntegrationError::Http(e.to_string()))
}

pub(crate) fn transport(err: reqwest::Error) -> IntegrationError {
    IntegrationError::Http(err.to_string())
}

/// Send a request and decode a 2xx JSON body, turning anything else into
/// `IntegrationError::Provider`
pub(crate) async fn send_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> IntegrationResult<T> {
    let response = request.send().await.map_err(transport)?;
    let response = ensure_success(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| IntegrationError::Decode(e.to_string()))
}

pub(crate) async fn ensure_success(response: reqwest::Response) -> IntegrationResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut message = response.text().await.unwrap_or_default();
    if message.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }

    Err(IntegrationError::Provider {
        status: status.as_u16(),
        message,
    })
}

/// Read a string field, accepting numbers as well (provider ids vary)
pub(crate) fn str_field(value: &serde_json::Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn i64_field(value: &serde_json::Value, pointer: &str) -> Option<i64> {
    value.pointer(pointer).and_then(serde_json::Value::as_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_helpers() {
        let value = json!({"a": {"id": 42, "name": "x", "empty": ""}, "n": 7});
        assert_eq!(str_field(&value, "/a/id").as_deref(), Some("42"));
        assert_eq!(str_field(&value, "/a/name").as_deref(), Some("x"));
        assert_eq!(str_field(&value, "/a/empty"), None);
        assert_eq!(str_field(&value, "/missing"), None);
        assert_eq!(i64_field(&value, "/n"), Some(7));
    }
}
