//! Authentication service
//!
//! Handles registration, password login, token refresh and logout, email
//! verification and password reset. OAuth and WebAuthn logins finish
//! through [`AuthService::complete_login`].

use chrono::{Duration, Utc};
use dreamx_common::auth::{
    check_password, hash_password, random_token, sha256_hex, validate_password_strength,
};
use dreamx_common::AppError;
use dreamx_core::{
    validate_username, AuthChallenge, ChallengePurpose, DomainError, RefreshToken, Snowflake, User,
};
use tracing::{info, instrument, warn};

use crate::dto::{
    AuthResponse, ChangePasswordRequest, CurrentUserResponse, LoginRequest, RefreshTokenRequest,
    RegisterRequest, ResetPasswordRequest,
};
use crate::email;

use super::context::ServiceContext;
use super::delivery::DeliveryJob;
use super::error::{ServiceError, ServiceResult};

/// Bytes of entropy in emailed tokens
const EMAIL_TOKEN_BYTES: usize = 32;

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Authentication service
pub struct AuthService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AuthService<'a> {
    /// Create a new AuthService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Register a new user and send the verification email
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<AuthResponse> {
        let username = request.username.trim().to_string();
        let email = normalize_email(&request.email);

        validate_username(&username)?;
        validate_password_strength(&request.password)?;

        if self.ctx.user_repo().username_exists(&username).await? {
            return Err(DomainError::UsernameAlreadyExists.into());
        }
        if self.ctx.user_repo().email_exists(&email).await? {
            return Err(DomainError::EmailAlreadyExists.into());
        }

        let password_hash = hash_password(&request.password)?;

        let display_name = request
            .display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| username.clone());
        let user = User::new(self.ctx.generate_id(), username, email, display_name);

        self.ctx.user_repo().create(&user, Some(&password_hash)).await?;
        info!(user_id = %user.id, "User registered");

        self.send_verification(&user).await?;
        self.complete_login(user).await
    }

    /// Login with email or username and password
    #[instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> ServiceResult<AuthResponse> {
        let login = request.login.trim();
        let user = if login.contains('@') {
            self.ctx.user_repo().find_by_email(&normalize_email(login)).await?
        } else {
            self.ctx.user_repo().find_by_username(login).await?
        };

        let Some(user) = user else {
            warn!("Login failed: unknown account");
            return Err(AppError::InvalidCredentials.into());
        };

        let password_hash = self.ctx.user_repo().get_password_hash(user.id).await?;
        if let Err(e) = check_password(&request.password, password_hash.as_deref()) {
            warn!(user_id = %user.id, "Login failed: bad password");
            return Err(e.into());
        }

        self.complete_login(user).await
    }

    /// Final step shared by every login method
    ///
    /// Banned accounts are refused. Suspended accounts may sign in (they can
    /// still read and appeal); a suspension whose window has passed is lifted.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn complete_login(&self, mut user: User) -> ServiceResult<AuthResponse> {
        if user.is_banned() {
            warn!("Login refused: account banned");
            return Err(DomainError::AccountBanned.into());
        }

        let now = Utc::now();
        if user.suspension_expired_at(now) {
            user.reinstate();
            self.ctx.user_repo().update(&user).await?;
            info!("Expired suspension lifted on login");
        }

        self.ctx.user_repo().touch_login(user.id, now).await?;
        user.last_login_at = Some(now);

        self.issue_tokens(&user).await
    }

    async fn issue_tokens(&self, user: &User) -> ServiceResult<AuthResponse> {
        let pair = self.ctx.jwt_service().generate_token_pair(user.id)?;

        let now = Utc::now();
        let stored = RefreshToken {
            id: self.ctx.generate_id(),
            user_id: user.id,
            token_hash: sha256_hex(&pair.refresh_token),
            expires_at: now + Duration::seconds(self.ctx.jwt_service().refresh_token_expiry()),
            created_at: now,
            revoked_at: None,
        };
        self.ctx.refresh_token_repo().create(&stored).await?;

        info!(user_id = %user.id, "Tokens issued");

        Ok(AuthResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: pair.token_type,
            expires_in: pair.expires_in,
            refresh_expires_in: pair.refresh_expires_in,
            user: CurrentUserResponse::from(user),
        })
    }

    /// Rotate a refresh token; the presented token is revoked
    #[instrument(skip(self, request))]
    pub async fn refresh_tokens(&self, request: RefreshTokenRequest) -> ServiceResult<AuthResponse> {
        let claims = self.ctx.jwt_service().validate_refresh_token(&request.refresh_token)?;
        let user_id = claims.user_id()?;

        let stored = self
            .ctx
            .refresh_token_repo()
            .find_by_hash(&sha256_hex(&request.refresh_token))
            .await?
            .filter(|token| token.user_id == user_id && token.is_valid_at(Utc::now()))
            .ok_or_else(|| ServiceError::unauthorized("refresh token is not valid"))?;

        if !self.ctx.refresh_token_repo().revoke(stored.id, Utc::now()).await? {
            return Err(ServiceError::unauthorized("refresh token already used"));
        }

        let user = self.ctx.load_user(user_id).await?;
        if user.is_banned() {
            return Err(DomainError::AccountBanned.into());
        }

        self.issue_tokens(&user).await
    }

    /// Revoke the presented refresh token
    #[instrument(skip(self, refresh_token))]
    pub async fn logout(&self, user_id: Snowflake, refresh_token: &str) -> ServiceResult<()> {
        let stored = self
            .ctx
            .refresh_token_repo()
            .find_by_hash(&sha256_hex(refresh_token))
            .await?;

        if let Some(token) = stored.filter(|t| t.user_id == user_id) {
            self.ctx.refresh_token_repo().revoke(token.id, Utc::now()).await?;
        }

        info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    /// Revoke every refresh token the user holds
    #[instrument(skip(self))]
    pub async fn logout_everywhere(&self, user_id: Snowflake) -> ServiceResult<()> {
        let revoked = self
            .ctx
            .refresh_token_repo()
            .revoke_all_for_user(user_id, Utc::now())
            .await?;
        info!(user_id = %user_id, revoked, "All sessions revoked");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Email verification
    // ------------------------------------------------------------------

    async fn send_verification(&self, user: &User) -> ServiceResult<()> {
        let token = random_token(EMAIL_TOKEN_BYTES);
        let challenge = AuthChallenge::new(token.clone(), ChallengePurpose::EmailVerification, Some(user.id));
        self.ctx.challenge_repo().create(&challenge).await?;

        let message = email::verification(user, &self.ctx.config().app.public_url, &token);
        self.ctx.enqueue(DeliveryJob::Email(message));
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn resend_verification(&self, user_id: Snowflake) -> ServiceResult<()> {
        let user = self.ctx.load_user(user_id).await?;
        if user.email_verified {
            return Err(ServiceError::conflict("Email already verified"));
        }
        self.send_verification(&user).await
    }

    #[instrument(skip(self, token))]
    pub async fn verify_email(&self, token: &str) -> ServiceResult<CurrentUserResponse> {
        let challenge = self
            .ctx
            .challenge_repo()
            .take(token, ChallengePurpose::EmailVerification)
            .await?
            .filter(|c| !c.is_expired_at(Utc::now()))
            .ok_or(DomainError::InvalidToken)?;
        let user_id = challenge.user_id.ok_or(DomainError::InvalidToken)?;

        let mut user = self.ctx.load_user(user_id).await?;
        if !user.email_verified {
            user.email_verified = true;
            user.updated_at = Utc::now();
            self.ctx.user_repo().update(&user).await?;
            info!(user_id = %user.id, "Email verified");
        }

        Ok(CurrentUserResponse::from(&user))
    }

    // ------------------------------------------------------------------
    // Passwords
    // ------------------------------------------------------------------

    /// Email a reset link; succeeds whether or not the address is known
    #[instrument(skip(self, email))]
    pub async fn request_password_reset(&self, email: &str) -> ServiceResult<()> {
        let Some(user) = self.ctx.user_repo().find_by_email(&normalize_email(email)).await? else {
            info!("Password reset requested for unknown email");
            return Ok(());
        };
        if user.is_banned() {
            return Ok(());
        }

        let token = random_token(EMAIL_TOKEN_BYTES);
        let challenge = AuthChallenge::new(token.clone(), ChallengePurpose::PasswordReset, Some(user.id));
        self.ctx.challenge_repo().create(&challenge).await?;

        let message = email::password_reset(&user, &self.ctx.config().app.public_url, &token);
        self.ctx.enqueue(DeliveryJob::Email(message));

        info!(user_id = %user.id, "Password reset requested");
        Ok(())
    }

    /// Set a new password from an emailed token and sign out every session
    #[instrument(skip(self, request))]
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> ServiceResult<()> {
        validate_password_strength(&request.new_password)?;

        let challenge = self
            .ctx
            .challenge_repo()
            .take(&request.token, ChallengePurpose::PasswordReset)
            .await?
            .filter(|c| !c.is_expired_at(Utc::now()))
            .ok_or(DomainError::InvalidToken)?;
        let user_id = challenge.user_id.ok_or(DomainError::InvalidToken)?;
        let user = self.ctx.load_user(user_id).await?;

        let hash = hash_password(&request.new_password)?;
        self.ctx.user_repo().update_password(user.id, &hash).await?;
        self.ctx
            .refresh_token_repo()
            .revoke_all_for_user(user.id, Utc::now())
            .await?;

        info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    #[instrument(skip(self, request))]
    pub async fn change_password(&self, user_id: Snowflake, request: ChangePasswordRequest) -> ServiceResult<()> {
        let current = self.ctx.user_repo().get_password_hash(user_id).await?;
        check_password(&request.current_password, current.as_deref())?;
        validate_password_strength(&request.new_password)?;

        let hash = hash_password(&request.new_password)?;
        self.ctx.user_repo().update_password(user_id, &hash).await?;

        info!(user_id = %user_id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{create_user, harness};
    use dreamx_core::UserStatus;

    fn register_request(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: "Sup3rSecret".into(),
            display_name: None,
        }
    }

    fn login(login: &str, password: &str) -> LoginRequest {
        LoginRequest { login: login.into(), password: password.into() }
    }

    fn token_from(body: &str) -> String {
        body.split("token=")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let h = harness().await;
        let auth = AuthService::new(&h.ctx);

        let registered = auth
            .register(register_request("ana_b", " Ana@Example.com "))
            .await
            .unwrap();
        assert_eq!(registered.user.email, "ana@example.com");
        assert_eq!(registered.user.display_name, "ana_b");
        assert!(!registered.user.email_verified);
        assert_eq!(registered.token_type, "Bearer");

        let by_email = auth.login(login("ANA@example.com", "Sup3rSecret")).await.unwrap();
        assert_eq!(by_email.user.id, registered.user.id);
        assert!(by_email.user.last_login_at.is_some());

        let by_username = auth.login(login("Ana_B", "Sup3rSecret")).await.unwrap();
        assert_eq!(by_username.user.id, registered.user.id);

        let err = auth.login(login("ana_b", "wrong-Passw0rd")).await.unwrap_err();
        assert_eq!(err.status_code(), 401);
        let err = auth.login(login("nobody", "Sup3rSecret")).await.unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_weak_passwords() {
        let h = harness().await;
        let auth = AuthService::new(&h.ctx);
        auth.register(register_request("ana", "ana@example.com")).await.unwrap();

        let err = auth.register(register_request("ANA", "other@example.com")).await.unwrap_err();
        assert_eq!(err.error_code(), "USERNAME_ALREADY_EXISTS");

        let err = auth.register(register_request("other", "ANA@example.com")).await.unwrap_err();
        assert_eq!(err.error_code(), "EMAIL_ALREADY_EXISTS");

        let mut weak = register_request("weak", "weak@example.com");
        weak.password = "alllowercase".into();
        assert_eq!(auth.register(weak).await.unwrap_err().status_code(), 400);

        let err = auth.register(register_request("bad name", "bad@example.com")).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_email_verification_token_is_single_use() {
        let h = harness().await;
        let auth = AuthService::new(&h.ctx);
        auth.register(register_request("ana", "ana@example.com")).await.unwrap();

        let sent = h.mailer.wait_for(1).await;
        assert_eq!(sent[0].to, "ana@example.com");
        let token = token_from(&sent[0].body);

        let user = auth.verify_email(&token).await.unwrap();
        assert!(user.email_verified);

        let err = auth.verify_email(&token).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_TOKEN");

        let err = auth.resend_verification(user.id).await.unwrap_err();
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn test_refresh_rotates_tokens() {
        let h = harness().await;
        let auth = AuthService::new(&h.ctx);
        let first = auth.register(register_request("ana", "ana@example.com")).await.unwrap();

        let second = auth
            .refresh_tokens(RefreshTokenRequest { refresh_token: first.refresh_token.clone() })
            .await
            .unwrap();
        assert_ne!(second.refresh_token, first.refresh_token);

        let err = auth
            .refresh_tokens(RefreshTokenRequest { refresh_token: first.refresh_token })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 401);

        auth.logout(second.user.id, &second.refresh_token).await.unwrap();
        let err = auth
            .refresh_tokens(RefreshTokenRequest { refresh_token: second.refresh_token })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn test_access_token_is_not_a_refresh_token() {
        let h = harness().await;
        let auth = AuthService::new(&h.ctx);
        let tokens = auth.register(register_request("ana", "ana@example.com")).await.unwrap();

        let err = auth
            .refresh_tokens(RefreshTokenRequest { refresh_token: tokens.access_token })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn test_password_reset_revokes_sessions() {
        let h = harness().await;
        let auth = AuthService::new(&h.ctx);
        let tokens = auth.register(register_request("ana", "ana@example.com")).await.unwrap();

        auth.request_password_reset("nobody@example.com").await.unwrap();
        auth.request_password_reset("ANA@example.com").await.unwrap();

        let sent = h.mailer.wait_for(2).await;
        let reset = sent.iter().find(|m| m.subject.contains("Reset")).unwrap();
        let token = token_from(&reset.body);

        auth.reset_password(ResetPasswordRequest { token: token.clone(), new_password: "N3wPassword".into() })
            .await
            .unwrap();

        assert!(auth.login(login("ana", "Sup3rSecret")).await.is_err());
        auth.login(login("ana", "N3wPassword")).await.unwrap();

        let err = auth
            .refresh_tokens(RefreshTokenRequest { refresh_token: tokens.refresh_token })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 401);

        let err = auth
            .reset_password(ResetPasswordRequest { token, new_password: "An0therOne".into() })
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let h = harness().await;
        let auth = AuthService::new(&h.ctx);
        let tokens = auth.register(register_request("ana", "ana@example.com")).await.unwrap();

        let err = auth
            .change_password(
                tokens.user.id,
                ChangePasswordRequest { current_password: "nope".into(), new_password: "N3wPassword".into() },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 401);

        auth.change_password(
            tokens.user.id,
            ChangePasswordRequest { current_password: "Sup3rSecret".into(), new_password: "N3wPassword".into() },
        )
        .await
        .unwrap();
        auth.login(login("ana", "N3wPassword")).await.unwrap();
    }

    #[tokio::test]
    async fn test_banned_and_suspended_logins() {
        let h = harness().await;
        let auth = AuthService::new(&h.ctx);

        let mut banned = create_user(&h.ctx, "banned").await;
        banned.ban("spam".into());
        h.ctx.user_repo().update(&banned).await.unwrap();
        let err = auth.complete_login(banned).await.unwrap_err();
        assert_eq!(err.error_code(), "ACCOUNT_BANNED");

        let mut lapsed = create_user(&h.ctx, "lapsed").await;
        lapsed.suspend(Some(Utc::now() - Duration::hours(1)), "cool off".into());
        h.ctx.user_repo().update(&lapsed).await.unwrap();
        let response = auth.complete_login(lapsed).await.unwrap();
        assert_eq!(response.user.status, UserStatus::Active);

        let mut suspended = create_user(&h.ctx, "suspended").await;
        suspended.suspend(Some(Utc::now() + Duration::days(1)), "cool off".into());
        h.ctx.user_repo().update(&suspended).await.unwrap();
        let response = auth.complete_login(suspended).await.unwrap();
        assert_eq!(response.user.status, UserStatus::Suspended);
    }
}
