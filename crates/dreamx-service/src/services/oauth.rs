//! OAuth login (Google, GitHub, Discord)
//!
//! `begin` stores a one-time `state` and returns the provider's authorize
//! URL; `callback` redeems the state, exchanges the code and signs the
//! matching local user in.

use std::sync::Arc;

use chrono::Utc;
use dreamx_common::auth::random_token;
use dreamx_core::{
    username_base, AuthChallenge, ChallengePurpose, DomainError, IdentityProvider,
    IntegrationError, OAuthAccount, OAuthProfile, OAuthProvider, User,
};
use tracing::{info, instrument, warn};

use crate::dto::AuthResponse;

use super::auth::{normalize_email, AuthService};
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

const STATE_BYTES: usize = 24;
const USERNAME_ATTEMPTS: u32 = 20;

/// OAuth login service
pub struct OAuthService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> OAuthService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    fn provider(&self, name: &str) -> ServiceResult<(OAuthProvider, Arc<dyn IdentityProvider>)> {
        let provider = OAuthProvider::parse(name)
            .ok_or_else(|| ServiceError::not_found("OAuth provider", name))?;
        let client = self
            .ctx
            .identity_providers()
            .get(provider)
            .ok_or(IntegrationError::NotConfigured(provider.as_str()))?;
        Ok((provider, client))
    }

    /// Authorize URL to redirect the browser to
    #[instrument(skip(self))]
    pub async fn begin(&self, provider: &str) -> ServiceResult<String> {
        let (provider, client) = self.provider(provider)?;

        let state = random_token(STATE_BYTES);
        let challenge = AuthChallenge::new(state.clone(), ChallengePurpose::OAuthState, None)
            .with_data(provider.as_str());
        self.ctx.challenge_repo().create(&challenge).await?;

        Ok(client.authorize_url(&state))
    }

    #[instrument(skip(self, code, state))]
    pub async fn callback(&self, provider: &str, code: &str, state: &str) -> ServiceResult<AuthResponse> {
        let (provider, client) = self.provider(provider)?;

        let challenge = self
            .ctx
            .challenge_repo()
            .take(state, ChallengePurpose::OAuthState)
            .await?
            .filter(|c| !c.is_expired_at(Utc::now()))
            .ok_or(DomainError::InvalidToken)?;
        if challenge.data.as_deref() != Some(provider.as_str()) {
            warn!(provider = provider.as_str(), "OAuth state issued for another provider");
            return Err(DomainError::InvalidToken.into());
        }

        let profile = client.exchange_code(code).await?;
        let user = self.resolve_user(provider, profile).await?;

        AuthService::new(self.ctx).complete_login(user).await
    }

    /// Linked account, else verified email match, else a new account
    async fn resolve_user(&self, provider: OAuthProvider, profile: OAuthProfile) -> ServiceResult<User> {
        if let Some(account) = self
            .ctx
            .oauth_account_repo()
            .find(provider, &profile.provider_user_id)
            .await?
        {
            return self.ctx.load_user(account.user_id).await;
        }

        let email = profile
            .email
            .as_deref()
            .map(normalize_email)
            .ok_or_else(|| ServiceError::validation("The provider did not share an email address"))?;

        let existing = if profile.email_verified {
            self.ctx.user_repo().find_by_email(&email).await?
        } else {
            None
        };

        let user = match existing {
            Some(user) => {
                info!(user_id = %user.id, provider = provider.as_str(), "Linking OAuth account by email");
                user
            }
            None => {
                if self.ctx.user_repo().email_exists(&email).await? {
                    // unverified provider email must not take over an existing account
                    return Err(DomainError::EmailAlreadyExists.into());
                }
                self.create_user(&profile, email).await?
            }
        };

        let account = OAuthAccount {
            id: self.ctx.generate_id(),
            user_id: user.id,
            provider,
            provider_user_id: profile.provider_user_id,
            email: Some(user.email.clone()),
            created_at: Utc::now(),
        };
        self.ctx.oauth_account_repo().create(&account).await?;

        Ok(user)
    }

    async fn create_user(&self, profile: &OAuthProfile, email: String) -> ServiceResult<User> {
        let seed = profile
            .name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default());
        let base = username_base(seed);
        let username = self.unique_username(&base).await?;

        let display_name = profile.name.clone().unwrap_or_else(|| username.clone());
        let mut user = User::new(self.ctx.generate_id(), username, email, display_name);
        user.email_verified = true;
        user.avatar = profile.avatar.clone();

        self.ctx.user_repo().create(&user, None).await?;
        info!(user_id = %user.id, "User registered through OAuth");
        Ok(user)
    }

    async fn unique_username(&self, base: &str) -> ServiceResult<String> {
        if !self.ctx.user_repo().username_exists(base).await? {
            return Ok(base.to_string());
        }
        for suffix in 1..=USERNAME_ATTEMPTS {
            let candidate = format!("{base}{suffix}");
            if !self.ctx.user_repo().username_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        let candidate = format!("{base}{}", rand::random::<u16>());
        if self.ctx.user_repo().username_exists(&candidate).await? {
            return Err(DomainError::UsernameAlreadyExists.into());
        }
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{create_user, harness_custom, test_config, Harness};
    use async_trait::async_trait;
    use dreamx_core::IntegrationResult;
    use dreamx_integrations::IdentityProviders;
    use std::collections::HashMap;

    /// Maps codes to canned profiles
    struct FakeProvider {
        profiles: HashMap<String, OAuthProfile>,
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        fn provider(&self) -> OAuthProvider {
            OAuthProvider::Github
        }

        fn authorize_url(&self, state: &str) -> String {
            format!("https://github.example/authorize?state={state}")
        }

        async fn exchange_code(&self, code: &str) -> IntegrationResult<OAuthProfile> {
            self.profiles
                .get(code)
                .cloned()
                .ok_or(IntegrationError::Provider { status: 400, message: "bad code".into() })
        }
    }

    fn profile(id: &str, email: &str, verified: bool, name: &str) -> OAuthProfile {
        OAuthProfile {
            provider_user_id: id.into(),
            email: Some(email.into()),
            email_verified: verified,
            name: Some(name.into()),
            avatar: Some("https://avatars.example/1.png".into()),
        }
    }

    async fn setup() -> Harness {
        let mut profiles = HashMap::new();
        profiles.insert("new".to_string(), profile("gh-1", "New.Person@example.com", true, "New Person"));
        profiles.insert("existing".to_string(), profile("gh-2", "ana@example.com", true, "Ana"));
        profiles.insert("unverified".to_string(), profile("gh-3", "ana@example.com", false, "Ana"));
        profiles.insert("clash".to_string(), profile("gh-4", "other@example.com", true, "ana"));

        let mut providers = IdentityProviders::default();
        providers.insert(Arc::new(FakeProvider { profiles }));
        harness_custom(test_config(&[]), providers).await
    }

    fn state_of(url: &str) -> &str {
        url.split("state=").nth(1).unwrap()
    }

    #[tokio::test]
    async fn test_new_user_then_linked_login() {
        let h = setup().await;
        let oauth = OAuthService::new(&h.ctx);

        let url = oauth.begin("github").await.unwrap();
        let first = oauth.callback("github", "new", state_of(&url)).await.unwrap();
        assert_eq!(first.user.username, "new_person");
        assert_eq!(first.user.email, "new.person@example.com");
        assert!(first.user.email_verified);
        assert_eq!(first.user.avatar.as_deref(), Some("https://avatars.example/1.png"));

        let url = oauth.begin("github").await.unwrap();
        let second = oauth.callback("github", "new", state_of(&url)).await.unwrap();
        assert_eq!(second.user.id, first.user.id);
    }

    #[tokio::test]
    async fn test_verified_email_links_existing_account() {
        let h = setup().await;
        let ana = create_user(&h.ctx, "ana").await;
        let oauth = OAuthService::new(&h.ctx);

        let url = oauth.begin("github").await.unwrap();
        let response = oauth.callback("github", "existing", state_of(&url)).await.unwrap();
        assert_eq!(response.user.id, ana.id);

        let linked = h.ctx.oauth_account_repo().list_by_user(ana.id).await.unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].provider_user_id, "gh-2");
    }

    #[tokio::test]
    async fn test_unverified_email_cannot_take_over() {
        let h = setup().await;
        create_user(&h.ctx, "ana").await;
        let oauth = OAuthService::new(&h.ctx);

        let url = oauth.begin("github").await.unwrap();
        let err = oauth.callback("github", "unverified", state_of(&url)).await.unwrap_err();
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn test_username_collision_gets_suffix() {
        let h = setup().await;
        create_user(&h.ctx, "ana").await;
        let oauth = OAuthService::new(&h.ctx);

        let url = oauth.begin("github").await.unwrap();
        let response = oauth.callback("github", "clash", state_of(&url)).await.unwrap();
        assert_eq!(response.user.username, "ana1");
    }

    #[tokio::test]
    async fn test_state_is_single_use_and_provider_bound() {
        let h = setup().await;
        let oauth = OAuthService::new(&h.ctx);

        let err = oauth.callback("github", "new", "forged").await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_TOKEN");

        let url = oauth.begin("github").await.unwrap();
        let state = state_of(&url).to_string();
        oauth.callback("github", "new", &state).await.unwrap();
        assert!(oauth.callback("github", "new", &state).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_and_unconfigured_providers() {
        let h = setup().await;
        let oauth = OAuthService::new(&h.ctx);

        assert_eq!(oauth.begin("myspace").await.unwrap_err().status_code(), 404);
        assert_eq!(oauth.begin("google").await.unwrap_err().status_code(), 503);
    }
}
