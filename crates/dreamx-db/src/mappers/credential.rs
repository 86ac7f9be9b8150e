//! Credential entity <-> model mappers

use dreamx_core::entities::{
    AuthChallenge, ChallengePurpose, OAuthAccount, OAuthProvider, RefreshToken, WebAuthnCredential,
};
use dreamx_core::value_objects::Snowflake;

use crate::models::{AuthChallengeModel, OAuthAccountModel, RefreshTokenModel, WebAuthnCredentialModel};

impl From<OAuthAccountModel> for OAuthAccount {
    fn from(model: OAuthAccountModel) -> Self {
        OAuthAccount {
            id: Snowflake::new(model.id),
            user_id: Snowflake::new(model.user_id),
            provider: OAuthProvider::parse(&model.provider).unwrap_or(OAuthProvider::Google),
            provider_user_id: model.provider_user_id,
            email: model.email,
            created_at: model.created_at,
        }
    }
}

impl From<WebAuthnCredentialModel> for WebAuthnCredential {
    fn from(model: WebAuthnCredentialModel) -> Self {
        WebAuthnCredential {
            id: Snowflake::new(model.id),
            user_id: Snowflake::new(model.user_id),
            credential_id: model.credential_id,
            public_key: model.public_key,
            sign_count: model.sign_count,
            name: model.name,
            created_at: model.created_at,
            last_used_at: model.last_used_at,
        }
    }
}

impl From<RefreshTokenModel> for RefreshToken {
    fn from(model: RefreshTokenModel) -> Self {
        RefreshToken {
            id: Snowflake::new(model.id),
            user_id: Snowflake::new(model.user_id),
            token_hash: model.token_hash,
            expires_at: model.expires_at,
            created_at: model.created_at,
            revoked_at: model.revoked_at,
        }
    }
}

impl From<AuthChallengeModel> for AuthChallenge {
    fn from(model: AuthChallengeModel) -> Self {
        AuthChallenge {
            token: model.token,
            purpose: ChallengePurpose::parse(&model.purpose).unwrap_or(ChallengePurpose::OAuthState),
            user_id: model.user_id.map(Snowflake::new),
            data: model.data,
            expires_at: model.expires_at,
            created_at: model.created_at,
        }
    }
}
