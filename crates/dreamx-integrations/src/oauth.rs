//! OAuth 2.0 authorization-code login for Google, GitHub and Discord

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dreamx_common::{OAuthClientConfig, OAuthConfig};
use dreamx_core::{IdentityProvider, IntegrationError, IntegrationResult, OAuthProfile, OAuthProvider};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::http::{self, str_field};

/// Provider URLs; overridable so tests can point at a mock server
#[derive(Debug, Clone)]
pub struct OAuthEndpoints {
    pub authorize: String,
    pub token: String,
    pub userinfo: String,
    /// GitHub only: list of addresses with verification flags
    pub emails: Option<String>,
    pub scope: &'static str,
}

impl OAuthEndpoints {
    #[must_use]
    pub fn for_provider(provider: OAuthProvider) -> Self {
        match provider {
            OAuthProvider::Google => Self {
                authorize: "https://accounts.google.com/o/oauth2/v2/auth".into(),
                token: "https://oauth2.googleapis.com/token".into(),
                userinfo: "https://openidconnect.googleapis.com/v1/userinfo".into(),
                emails: None,
                scope: "openid email profile",
            },
            OAuthProvider::Github => Self {
                authorize: "https://github.com/login/oauth/authorize".into(),
                token: "https://github.com/login/oauth/access_token".into(),
                userinfo: "https://api.github.com/user".into(),
                emails: Some("https://api.github.com/user/emails".into()),
                scope: "read:user user:email",
            },
            OAuthProvider::Discord => Self {
                authorize: "https://discord.com/oauth2/authorize".into(),
                token: "https://discord.com/api/oauth2/token".into(),
                userinfo: "https://discord.com/api/users/@me".into(),
                emails: None,
                scope: "identify email",
            },
        }
    }
}

pub struct OAuthClient {
    provider: OAuthProvider,
    credentials: OAuthClientConfig,
    redirect_uri: String,
    endpoints: OAuthEndpoints,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

impl OAuthClient {
    pub fn new(
        provider: OAuthProvider,
        credentials: OAuthClientConfig,
        redirect_base_url: &str,
        endpoints: OAuthEndpoints,
    ) -> IntegrationResult<Self> {
        let redirect_uri = format!(
            "{}/api/v1/auth/oauth/{}/callback",
            redirect_base_url.trim_end_matches('/'),
            provider.as_str()
        );

        Ok(Self {
            provider,
            credentials,
            redirect_uri,
            endpoints,
            client: http::client()?,
        })
    }

    async fn exchange_token(&self, code: &str) -> IntegrationResult<String> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];

        let request = self
            .client
            .post(&self.endpoints.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form);
        let token: TokenResponse = http::send_json(request).await?;

        // GitHub reports failures as 200 with an `error` field
        if let Some(error) = token.error {
            return Err(IntegrationError::Provider {
                status: 400,
                message: token.error_description.unwrap_or(error),
            });
        }
        token
            .access_token
            .ok_or_else(|| IntegrationError::Decode("access_token missing".into()))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, access_token: &str) -> IntegrationResult<T> {
        let request = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json");
        http::send_json(request).await
    }

    fn parse_profile(&self, info: &Value) -> IntegrationResult<OAuthProfile> {
        let missing = || IntegrationError::Decode("provider user id missing".into());

        let profile = match self.provider {
            OAuthProvider::Google => OAuthProfile {
                provider_user_id: str_field(info, "/sub").ok_or_else(missing)?,
                email: str_field(info, "/email"),
                email_verified: info.get("email_verified").and_then(Value::as_bool).unwrap_or(false),
                name: str_field(info, "/name"),
                avatar: str_field(info, "/picture"),
            },
            OAuthProvider::Github => OAuthProfile {
                provider_user_id: str_field(info, "/id").ok_or_else(missing)?,
                email: str_field(info, "/email"),
                // only trusted once confirmed through /user/emails
                email_verified: false,
                name: str_field(info, "/name").or_else(|| str_field(info, "/login")),
                avatar: str_field(info, "/avatar_url"),
            },
            OAuthProvider::Discord => {
                let id = str_field(info, "/id").ok_or_else(missing)?;
                let avatar = str_field(info, "/avatar")
                    .map(|hash| format!("https://cdn.discordapp.com/avatars/{id}/{hash}.png"));
                OAuthProfile {
                    email: str_field(info, "/email"),
                    email_verified: info.get("verified").and_then(Value::as_bool).unwrap_or(false),
                    name: str_field(info, "/global_name").or_else(|| str_field(info, "/username")),
                    avatar,
                    provider_user_id: id,
                }
            }
        };

        Ok(profile)
    }
}

#[async_trait]
impl IdentityProvider for OAuthClient {
    fn provider(&self) -> OAuthProvider {
        self.provider
    }

    fn authorize_url(&self, state: &str) -> String {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", self.endpoints.scope),
            ("state", state),
        ];

        match Url::parse_with_params(&self.endpoints.authorize, &params) {
            Ok(url) => url.into(),
            Err(_) => self.endpoints.authorize.clone(),
        }
    }

    #[tracing::instrument(skip(self, code), fields(provider = self.provider.as_str()))]
    async fn exchange_code(&self, code: &str) -> IntegrationResult<OAuthProfile> {
        let access_token = self.exchange_token(code).await?;
        let info: Value = self.get_json(&self.endpoints.userinfo, &access_token).await?;
        let mut profile = self.parse_profile(&info)?;

        if let Some(emails_url) = &self.endpoints.emails {
            let emails: Vec<GithubEmail> = self.get_json(emails_url, &access_token).await?;
            if let Some(primary) = emails.into_iter().find(|e| e.primary && e.verified) {
                profile.email = Some(primary.email);
                profile.email_verified = true;
            }
        }

        tracing::debug!(provider_user_id = %profile.provider_user_id, "OAuth profile fetched");
        Ok(profile)
    }
}

/// The identity providers that have credentials configured
#[derive(Clone, Default)]
pub struct IdentityProviders {
    providers: HashMap<OAuthProvider, Arc<dyn IdentityProvider>>,
}

impl IdentityProviders {
    pub fn from_config(config: &OAuthConfig) -> IntegrationResult<Self> {
        let mut providers: HashMap<OAuthProvider, Arc<dyn IdentityProvider>> = HashMap::new();

        for provider in OAuthProvider::ALL {
            let credentials = match provider {
                OAuthProvider::Google => &config.google,
                OAuthProvider::Github => &config.github,
                OAuthProvider::Discord => &config.discord,
            };
            if let Some(credentials) = credentials {
                let client = OAuthClient::new(
                    provider,
                    credentials.clone(),
                    &config.redirect_base_url,
                    OAuthEndpoints::for_provider(provider),
                )?;
                providers.insert(provider, Arc::new(client));
            }
        }

        tracing::info!(
            enabled = ?providers.keys().map(|p| p.as_str()).collect::<Vec<_>>(),
            "OAuth providers configured"
        );
        Ok(Self { providers })
    }

    pub fn insert(&mut self, provider: Arc<dyn IdentityProvider>) {
        self.providers.insert(provider.provider(), provider);
    }

    #[must_use]
    pub fn get(&self, provider: OAuthProvider) -> Option<Arc<dyn IdentityProvider>> {
        self.providers.get(&provider).cloned()
    }

    #[must_use]
    pub fn is_enabled(&self, provider: OAuthProvider) -> bool {
        self.providers.contains_key(&provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> OAuthClientConfig {
        OAuthClientConfig {
            client_id: "cid".into(),
            client_secret: "csecret".into(),
        }
    }

    fn mock_endpoints(server: &MockServer, with_emails: bool) -> OAuthEndpoints {
        OAuthEndpoints {
            authorize: format!("{}/authorize", server.uri()),
            token: format!("{}/token", server.uri()),
            userinfo: format!("{}/user", server.uri()),
            emails: with_emails.then(|| format!("{}/user/emails", server.uri())),
            scope: "test",
        }
    }

    #[test]
    fn test_authorize_url() {
        let client = OAuthClient::new(
            OAuthProvider::Google,
            credentials(),
            "https://dreamx.test/",
            OAuthEndpoints::for_provider(OAuthProvider::Google),
        )
        .unwrap();

        let url = Url::parse(&client.authorize_url("st4te")).unwrap();
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(params["state"], "st4te");
        assert_eq!(params["client_id"], "cid");
        assert_eq!(params["response_type"], "code");
        assert_eq!(
            params["redirect_uri"],
            "https://dreamx.test/api/v1/auth/oauth/google/callback"
        );
    }

    #[test]
    fn test_registry_only_has_configured_providers() {
        let config = OAuthConfig {
            github: Some(credentials()),
            redirect_base_url: "http://localhost:3000".into(),
            ..OAuthConfig::default()
        };
        let providers = IdentityProviders::from_config(&config).unwrap();
        assert!(providers.is_enabled(OAuthProvider::Github));
        assert!(!providers.is_enabled(OAuthProvider::Google));
        assert!(providers.get(OAuthProvider::Discord).is_none());
    }

    #[tokio::test]
    async fn test_github_exchange_uses_verified_primary_email() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "gho_1"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", "Bearer gho_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 1234, "login": "octo", "name": null, "email": null, "avatar_url": "https://a/1.png"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"email": "old@example.com", "primary": false, "verified": true},
                {"email": "octo@example.com", "primary": true, "verified": true}
            ])))
            .mount(&server)
            .await;

        let client = OAuthClient::new(
            OAuthProvider::Github,
            credentials(),
            "http://localhost",
            mock_endpoints(&server, true),
        )
        .unwrap();
        let profile = client.exchange_code("abc").await.unwrap();

        assert_eq!(profile.provider_user_id, "1234");
        assert_eq!(profile.name.as_deref(), Some("octo"));
        assert_eq!(profile.email.as_deref(), Some("octo@example.com"));
        assert!(profile.email_verified);
    }

    #[tokio::test]
    async fn test_token_error_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "bad_verification_code",
                "error_description": "The code passed is incorrect or expired."
            })))
            .mount(&server)
            .await;

        let client = OAuthClient::new(
            OAuthProvider::Github,
            credentials(),
            "http://localhost",
            mock_endpoints(&server, true),
        )
        .unwrap();

        assert!(matches!(
            client.exchange_code("stale").await,
            Err(IntegrationError::Provider { status: 400, .. })
        ));
    }

    #[tokio::test]
    async fn test_discord_profile() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "d1"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "80351110224678912", "username": "nelly", "global_name": "Nelly",
                "avatar": "8342729096ea3675442027381ff50dfe", "email": "nelly@example.com", "verified": true
            })))
            .mount(&server)
            .await;

        let client = OAuthClient::new(
            OAuthProvider::Discord,
            credentials(),
            "http://localhost",
            mock_endpoints(&server, false),
        )
        .unwrap();
        let profile = client.exchange_code("c").await.unwrap();

        assert_eq!(profile.name.as_deref(), Some("Nelly"));
        assert!(profile.email_verified);
        assert_eq!(
            profile.avatar.as_deref(),
            Some("https://cdn.discordapp.com/avatars/80351110224678912/8342729096ea3675442027381ff50dfe.png")
        );
    }
}
