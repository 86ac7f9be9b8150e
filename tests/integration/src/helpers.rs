//! Test helpers for integration tests
//!
//! Provides utilities for spawning test servers and making HTTP requests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use dreamx_api::{create_app, create_app_state, run_server};
use dreamx_common::AppConfig;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::fixtures::{AuthResponse, RegisterRequest};

/// Versioned API prefix
pub const API: &str = "/api/v1";

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    _handle: JoinHandle<()>,
    _data_dir: TempDir,
}

impl TestServer {
    /// Start a new test server on a fresh database
    pub async fn start() -> Result<Self> {
        let data_dir = tempfile::tempdir()?;
        let config = test_config(&data_dir)?;

        let state = create_app_state(config).await?;
        let app = create_app(state);

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            run_server(app, listener).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            _handle: handle,
            _data_dir: data_dir,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("/health") {
            format!("{}{}", self.base_url(), path)
        } else {
            format!("{}{API}{}", self.base_url(), path)
        }
    }

    fn authed(builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder.header("Authorization", format!("Bearer {token}"))
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        Ok(self.client.get(self.url(path)).send().await?)
    }

    /// Make a GET request with auth token
    pub async fn get_auth(&self, path: &str, token: &str) -> Result<Response> {
        Ok(Self::authed(self.client.get(self.url(path)), token).send().await?)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        Ok(self.client.post(self.url(path)).json(body).send().await?)
    }

    /// Make a POST request with auth token
    pub async fn post_auth<T: Serialize>(&self, path: &str, token: &str, body: &T) -> Result<Response> {
        Ok(Self::authed(self.client.post(self.url(path)), token)
            .json(body)
            .send()
            .await?)
    }

    /// Make a POST request with auth token and no body
    pub async fn post_auth_empty(&self, path: &str, token: &str) -> Result<Response> {
        Ok(Self::authed(self.client.post(self.url(path)), token).send().await?)
    }

    /// Make a PATCH request with auth token
    pub async fn patch_auth<T: Serialize>(&self, path: &str, token: &str, body: &T) -> Result<Response> {
        Ok(Self::authed(self.client.patch(self.url(path)), token)
            .json(body)
            .send()
            .await?)
    }

    /// Make a PUT request with auth token and no body
    pub async fn put_auth_empty(&self, path: &str, token: &str) -> Result<Response> {
        Ok(Self::authed(self.client.put(self.url(path)), token).send().await?)
    }

    /// Make a DELETE request with auth token
    pub async fn delete_auth(&self, path: &str, token: &str) -> Result<Response> {
        Ok(Self::authed(self.client.delete(self.url(path)), token).send().await?)
    }

    /// Register a fresh user and return its session
    pub async fn register(&self) -> Result<AuthResponse> {
        let response = self.post("/auth/register", &RegisterRequest::unique()).await?;
        assert_json(response, StatusCode::CREATED).await
    }
}

/// Configuration for one test server
///
/// Built from a fixed variable set so tests never depend on the caller's
/// environment. The Stripe key only satisfies startup; no test charges.
pub fn test_config(data_dir: &TempDir) -> Result<AppConfig> {
    let root = data_dir.path();
    let vars: HashMap<&str, String> = HashMap::from([
        ("JWT_SECRET", "integration-test-secret".to_string()),
        ("DATABASE_URL", format!("sqlite://{}", root.join("dreamx.db").display())),
        ("UPLOAD_DIR", root.join("uploads").display().to_string()),
        ("STRIPE_SECRET_KEY", "sk_test_integration".to_string()),
        ("STRIPE_API_BASE", "http://127.0.0.1:9".to_string()),
        ("RATE_LIMIT_REQUESTS_PER_SECOND", "1000".to_string()),
        ("RATE_LIMIT_BURST", "1000".to_string()),
    ]);

    AppConfig::from_lookup(|key| vars.get(key).cloned()).map_err(|e| anyhow::anyhow!("Config error: {e}"))
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(response: Response, expected_status: StatusCode) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {}, got {}. Body: {}", expected_status, status, body);
    }
    Ok(response.json().await?)
}

/// Assert response status without parsing body
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {}, got {}. Body: {}", expected_status, status, body);
    }
    Ok(())
}

/// Assert an error response and return its `error.code`
pub async fn assert_error(response: Response, expected_status: StatusCode) -> Result<String> {
    let body: serde_json::Value = assert_json(response, expected_status).await?;
    body["error"]["code"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Missing error code in {body}"))
}
