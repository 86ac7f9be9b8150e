//! Passkey registration and login
//!
//! Challenges are stored as one-time [`AuthChallenge`]s and matched back
//! through the `challenge` field of `clientDataJSON`.

use chrono::Utc;
use dreamx_common::auth::random_token;
use dreamx_common::auth::webauthn::{
    decode_b64url, encode_b64url, parse_public_key, verify_assertion, verify_client_data, Expected,
    COSE_ALG_ES256, TYPE_CREATE, TYPE_GET,
};
use dreamx_core::{AuthChallenge, ChallengePurpose, DomainError, Snowflake, WebAuthnCredential};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::dto::{
    AuthResponse, CredentialResponse, LoginOptionsResponse, PubKeyCredParam,
    RegistrationOptionsResponse, WebAuthnLoginBeginRequest, WebAuthnLoginFinishRequest,
    WebAuthnRegisterFinishRequest, WebAuthnRelyingParty, WebAuthnUserEntity,
};

use super::auth::AuthService;
use super::context::ServiceContext;
use super::error::ServiceResult;

const CHALLENGE_BYTES: usize = 32;
const CEREMONY_TIMEOUT_MS: i64 = 300_000;
const DEFAULT_CREDENTIAL_NAME: &str = "Passkey";

#[derive(Deserialize)]
struct ChallengeOnly {
    challenge: String,
}

fn rejected(reason: &str) -> DomainError {
    DomainError::AuthenticatorRejected(reason.to_string())
}

/// Pull the challenge out of `clientDataJSON` so the stored copy can be found
fn client_challenge(client_data: &[u8]) -> Result<String, DomainError> {
    let data: ChallengeOnly =
        serde_json::from_slice(client_data).map_err(|_| rejected("malformed client data"))?;
    Ok(data.challenge.trim_end_matches('=').to_string())
}

/// WebAuthn service
pub struct WebAuthnService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> WebAuthnService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    async fn issue_challenge(&self, purpose: ChallengePurpose, user_id: Option<Snowflake>) -> ServiceResult<String> {
        let token = random_token(CHALLENGE_BYTES);
        self.ctx
            .challenge_repo()
            .create(&AuthChallenge::new(token.clone(), purpose, user_id))
            .await?;
        Ok(token)
    }

    async fn redeem_challenge(
        &self,
        client_data: &[u8],
        purpose: ChallengePurpose,
        kind: &str,
    ) -> ServiceResult<AuthChallenge> {
        let token = client_challenge(client_data)?;
        let challenge = self
            .ctx
            .challenge_repo()
            .take(&token, purpose)
            .await?
            .filter(|c| !c.is_expired_at(Utc::now()))
            .ok_or_else(|| rejected("unknown or expired challenge"))?;

        verify_client_data(
            client_data,
            Expected {
                kind,
                challenge: &challenge.token,
                origin: &self.ctx.config().webauthn.origin,
            },
        )?;
        Ok(challenge)
    }

    /// Creation options for `navigator.credentials.create()`
    #[instrument(skip(self))]
    pub async fn register_begin(&self, user_id: Snowflake) -> ServiceResult<RegistrationOptionsResponse> {
        let user = self.ctx.acting_user(user_id).await?;
        let existing = self.ctx.webauthn_repo().list_by_user(user.id).await?;
        let challenge = self
            .issue_challenge(ChallengePurpose::WebAuthnRegister, Some(user.id))
            .await?;

        let settings = &self.ctx.config().webauthn;
        Ok(RegistrationOptionsResponse {
            challenge,
            rp: WebAuthnRelyingParty {
                id: settings.rp_id.clone(),
                name: settings.rp_name.clone(),
            },
            user: WebAuthnUserEntity {
                id: encode_b64url(user.id.to_string().as_bytes()),
                name: user.username.clone(),
                display_name: user.display_name.clone(),
            },
            pub_key_cred_params: vec![PubKeyCredParam { kind: "public-key", alg: COSE_ALG_ES256 }],
            timeout: CEREMONY_TIMEOUT_MS,
            exclude_credentials: existing.into_iter().map(|c| c.credential_id).collect(),
            attestation: "none",
        })
    }

    #[instrument(skip(self, request))]
    pub async fn register_finish(
        &self,
        user_id: Snowflake,
        request: WebAuthnRegisterFinishRequest,
    ) -> ServiceResult<CredentialResponse> {
        let client_data = decode_b64url("client_data_json", &request.client_data_json)?;
        let challenge = self
            .redeem_challenge(&client_data, ChallengePurpose::WebAuthnRegister, TYPE_CREATE)
            .await?;
        if challenge.user_id != Some(user_id) {
            return Err(rejected("challenge was issued to another user").into());
        }

        let spki = decode_b64url("public_key", &request.public_key)?;
        let public_key = parse_public_key(&spki)?;
        // validates the encoding; the stored id keeps the browser's base64url form
        decode_b64url("credential_id", &request.credential_id)?;

        let credential = WebAuthnCredential {
            id: self.ctx.generate_id(),
            user_id,
            credential_id: request.credential_id.trim_end_matches('=').to_string(),
            public_key,
            sign_count: 0,
            name: request
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_CREDENTIAL_NAME.to_string()),
            created_at: Utc::now(),
            last_used_at: None,
        };
        self.ctx.webauthn_repo().create(&credential).await?;

        info!(user_id = %user_id, credential = %credential.id, "Passkey registered");
        Ok(CredentialResponse::from(&credential))
    }

    /// Request options for `navigator.credentials.get()`
    ///
    /// With a username the challenge is bound to that account and its
    /// credentials are listed; without one any discoverable credential works.
    #[instrument(skip(self, request))]
    pub async fn login_begin(&self, request: WebAuthnLoginBeginRequest) -> ServiceResult<LoginOptionsResponse> {
        let user = match request.username.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(username) => self.ctx.user_repo().find_by_username(username).await?,
            None => None,
        };

        let allow_credentials = match &user {
            Some(user) => self
                .ctx
                .webauthn_repo()
                .list_by_user(user.id)
                .await?
                .into_iter()
                .map(|c| c.credential_id)
                .collect(),
            None => Vec::new(),
        };

        let challenge = self
            .issue_challenge(ChallengePurpose::WebAuthnLogin, user.as_ref().map(|u| u.id))
            .await?;

        Ok(LoginOptionsResponse {
            challenge,
            rp_id: self.ctx.config().webauthn.rp_id.clone(),
            allow_credentials,
            timeout: CEREMONY_TIMEOUT_MS,
            user_verification: "preferred",
        })
    }

    #[instrument(skip(self, request))]
    pub async fn login_finish(&self, request: WebAuthnLoginFinishRequest) -> ServiceResult<AuthResponse> {
        let client_data = decode_b64url("client_data_json", &request.client_data_json)?;
        let authenticator_data = decode_b64url("authenticator_data", &request.authenticator_data)?;
        let signature = decode_b64url("signature", &request.signature)?;

        let challenge = self
            .redeem_challenge(&client_data, ChallengePurpose::WebAuthnLogin, TYPE_GET)
            .await?;

        let credential = self
            .ctx
            .webauthn_repo()
            .find_by_credential_id(request.credential_id.trim_end_matches('='))
            .await?
            .ok_or_else(|| rejected("unknown credential"))?;
        if challenge.user_id.is_some_and(|id| id != credential.user_id) {
            return Err(rejected("credential belongs to another user").into());
        }

        let sign_count = verify_assertion(
            &credential.public_key,
            credential.sign_count,
            &self.ctx.config().webauthn.rp_id,
            &authenticator_data,
            &client_data,
            &signature,
        )
        .inspect_err(|e| warn!(credential = %credential.id, error = %e, "Assertion rejected"))?;

        self.ctx
            .webauthn_repo()
            .record_use(credential.id, i64::from(sign_count), Utc::now())
            .await?;

        let user = self.ctx.load_user(credential.user_id).await?;
        AuthService::new(self.ctx).complete_login(user).await
    }

    pub async fn list_credentials(&self, user_id: Snowflake) -> ServiceResult<Vec<CredentialResponse>> {
        let credentials = self.ctx.webauthn_repo().list_by_user(user_id).await?;
        Ok(credentials.iter().map(CredentialResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn delete_credential(&self, user_id: Snowflake, id: Snowflake) -> ServiceResult<()> {
        self.ctx.webauthn_repo().delete(id, user_id).await?;
        info!(user_id = %user_id, credential = %id, "Passkey removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{create_user, harness_with, test_config, Harness};
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use dreamx_common::auth::webauthn::spki_from_point;
    use ring::rand::SystemRandom;
    use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_ASN1_SIGNING};
    use sha2::{Digest, Sha256};

    const RP_ID: &str = "dreamx.test";
    const ORIGIN: &str = "https://dreamx.test";

    struct Authenticator {
        key: EcdsaKeyPair,
        rng: SystemRandom,
        credential_id: String,
        counter: u32,
    }

    impl Authenticator {
        fn new(credential_id: &str) -> Self {
            let rng = SystemRandom::new();
            let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng).unwrap();
            let key = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng).unwrap();
            Self { key, rng, credential_id: URL_SAFE_NO_PAD.encode(credential_id), counter: 0 }
        }

        fn spki(&self) -> String {
            URL_SAFE_NO_PAD.encode(spki_from_point(self.key.public_key().as_ref()))
        }

        fn register(&self, challenge: &str) -> WebAuthnRegisterFinishRequest {
            WebAuthnRegisterFinishRequest {
                credential_id: self.credential_id.clone(),
                public_key: self.spki(),
                client_data_json: client_data("webauthn.create", challenge, ORIGIN),
                name: Some("Laptop".into()),
            }
        }

        fn assert(&mut self, challenge: &str) -> WebAuthnLoginFinishRequest {
            self.counter += 1;
            let client_json = client_data("webauthn.get", challenge, ORIGIN);
            let client_raw = URL_SAFE_NO_PAD.decode(&client_json).unwrap();

            let mut auth_data = Sha256::digest(RP_ID.as_bytes()).to_vec();
            auth_data.push(0x01);
            auth_data.extend_from_slice(&self.counter.to_be_bytes());

            let mut signed = auth_data.clone();
            signed.extend_from_slice(&Sha256::digest(&client_raw));
            let signature = self.key.sign(&self.rng, &signed).unwrap();

            WebAuthnLoginFinishRequest {
                credential_id: self.credential_id.clone(),
                authenticator_data: URL_SAFE_NO_PAD.encode(&auth_data),
                client_data_json: client_json,
                signature: URL_SAFE_NO_PAD.encode(signature.as_ref()),
            }
        }
    }

    fn client_data(kind: &str, challenge: &str, origin: &str) -> String {
        let json = serde_json::json!({ "type": kind, "challenge": challenge, "origin": origin });
        URL_SAFE_NO_PAD.encode(json.to_string())
    }

    async fn setup() -> Harness {
        harness_with(test_config(&[("WEBAUTHN_RP_ID", RP_ID), ("WEBAUTHN_ORIGIN", ORIGIN)])).await
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let h = setup().await;
        let ana = create_user(&h.ctx, "ana").await;
        let service = WebAuthnService::new(&h.ctx);
        let mut device = Authenticator::new("cred-1");

        let options = service.register_begin(ana.id).await.unwrap();
        assert_eq!(options.rp.id, RP_ID);
        assert_eq!(options.pub_key_cred_params[0].alg, -7);

        let credential = service.register_finish(ana.id, device.register(&options.challenge)).await.unwrap();
        assert_eq!(credential.name, "Laptop");
        assert_eq!(credential.sign_count, 0);

        let options = service
            .login_begin(WebAuthnLoginBeginRequest { username: Some("ana".into()) })
            .await
            .unwrap();
        assert_eq!(options.allow_credentials, vec![device.credential_id.clone()]);

        let response = service.login_finish(device.assert(&options.challenge)).await.unwrap();
        assert_eq!(response.user.id, ana.id);

        let stored = service.list_credentials(ana.id).await.unwrap();
        assert_eq!(stored[0].sign_count, 1);
        assert!(stored[0].last_used_at.is_some());
    }

    #[tokio::test]
    async fn test_replayed_counter_is_rejected() {
        let h = setup().await;
        let ana = create_user(&h.ctx, "ana").await;
        let service = WebAuthnService::new(&h.ctx);
        let mut device = Authenticator::new("cred-1");

        let options = service.register_begin(ana.id).await.unwrap();
        service.register_finish(ana.id, device.register(&options.challenge)).await.unwrap();

        let options = service.login_begin(WebAuthnLoginBeginRequest::default()).await.unwrap();
        service.login_finish(device.assert(&options.challenge)).await.unwrap();

        device.counter = 0;
        let options = service.login_begin(WebAuthnLoginBeginRequest::default()).await.unwrap();
        let err = service.login_finish(device.assert(&options.challenge)).await.unwrap_err();
        assert_eq!(err.error_code(), "AUTHENTICATOR_REJECTED");
    }

    #[tokio::test]
    async fn test_wrong_origin_and_reused_challenge() {
        let h = setup().await;
        let ana = create_user(&h.ctx, "ana").await;
        let service = WebAuthnService::new(&h.ctx);
        let device = Authenticator::new("cred-1");

        let options = service.register_begin(ana.id).await.unwrap();
        let mut request = device.register(&options.challenge);
        request.client_data_json = client_data("webauthn.create", &options.challenge, "https://evil.test");
        let err = service.register_finish(ana.id, request).await.unwrap_err();
        assert_eq!(err.status_code(), 401);

        // the challenge was consumed by the failed attempt
        let err = service
            .register_finish(ana.id, device.register(&options.challenge))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "AUTHENTICATOR_REJECTED");
    }

    #[tokio::test]
    async fn test_challenge_bound_to_user() {
        let h = setup().await;
        let ana = create_user(&h.ctx, "ana").await;
        let bo = create_user(&h.ctx, "bo").await;
        let service = WebAuthnService::new(&h.ctx);
        let device = Authenticator::new("cred-1");

        let options = service.register_begin(ana.id).await.unwrap();
        let err = service.register_finish(bo.id, device.register(&options.challenge)).await.unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn test_duplicate_credential_and_delete() {
        let h = setup().await;
        let ana = create_user(&h.ctx, "ana").await;
        let service = WebAuthnService::new(&h.ctx);
        let device = Authenticator::new("cred-1");

        let options = service.register_begin(ana.id).await.unwrap();
        let credential = service.register_finish(ana.id, device.register(&options.challenge)).await.unwrap();

        let options = service.register_begin(ana.id).await.unwrap();
        assert_eq!(options.exclude_credentials, vec![device.credential_id.clone()]);
        let err = service.register_finish(ana.id, device.register(&options.challenge)).await.unwrap_err();
        assert_eq!(err.status_code(), 409);

        service.delete_credential(ana.id, credential.id).await.unwrap();
        assert!(service.list_credentials(ana.id).await.unwrap().is_empty());
        assert_eq!(service.delete_credential(ana.id, credential.id).await.unwrap_err().status_code(), 404);
    }
}
