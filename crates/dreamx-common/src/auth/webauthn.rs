//! WebAuthn ceremony checks
//!
//! Only ES256 (P-256) credentials are accepted. The browser hands over the
//! public key as SubjectPublicKeyInfo DER via `getPublicKey()`, so no CBOR
//! attestation parsing is needed; assertions are verified with `ring`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use dreamx_core::DomainError;
use ring::signature::{UnparsedPublicKey, ECDSA_P256_SHA256_ASN1};
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// COSE algorithm identifier for ES256
pub const COSE_ALG_ES256: i64 = -7;

const P256_SPKI_PREFIX: [u8; 26] = [
    0x30, 0x59, 0x30, 0x13, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x08, 0x2a,
    0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07, 0x03, 0x42, 0x00,
];
const P256_POINT_LEN: usize = 65;

const FLAG_USER_PRESENT: u8 = 0x01;
// rpIdHash (32) + flags (1) + signCount (4)
const AUTH_DATA_MIN_LEN: usize = 37;

pub const TYPE_CREATE: &str = "webauthn.create";
pub const TYPE_GET: &str = "webauthn.get";

#[derive(Debug, Deserialize)]
struct ClientData {
    #[serde(rename = "type")]
    kind: String,
    challenge: String,
    origin: String,
}

/// What a ceremony must match: relying party and the issued challenge
#[derive(Debug, Clone, Copy)]
pub struct Expected<'a> {
    pub kind: &'a str,
    pub challenge: &'a str,
    pub origin: &'a str,
}

fn reject(reason: impl Into<String>) -> DomainError {
    DomainError::AuthenticatorRejected(reason.into())
}

/// Decode a base64url field sent by the browser (padding tolerated)
pub fn decode_b64url(field: &str, value: &str) -> Result<Vec<u8>, DomainError> {
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|_| DomainError::ValidationError(format!("{field} is not valid base64url")))
}

#[must_use]
pub fn encode_b64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Check `clientDataJSON` type, challenge and origin
pub fn verify_client_data(client_data_json: &[u8], expected: Expected<'_>) -> Result<(), DomainError> {
    let data: ClientData =
        serde_json::from_slice(client_data_json).map_err(|_| reject("malformed client data"))?;

    if data.kind != expected.kind {
        return Err(reject(format!("unexpected ceremony type {}", data.kind)));
    }
    if data.challenge.trim_end_matches('=') != expected.challenge {
        return Err(reject("challenge mismatch"));
    }
    if data.origin.trim_end_matches('/') != expected.origin.trim_end_matches('/') {
        return Err(reject(format!("origin {} not allowed", data.origin)));
    }
    Ok(())
}

/// Validate an SPKI public key and return it unchanged for storage
pub fn parse_public_key(spki: &[u8]) -> Result<Vec<u8>, DomainError> {
    let point = ec_point(spki)?;
    if point.len() != P256_POINT_LEN || point[0] != 0x04 {
        return Err(reject("public key is not an uncompressed P-256 point"));
    }
    Ok(spki.to_vec())
}

fn ec_point(key: &[u8]) -> Result<&[u8], DomainError> {
    if key.len() == P256_POINT_LEN {
        return Ok(key);
    }
    if key.len() == P256_SPKI_PREFIX.len() + P256_POINT_LEN && key.starts_with(&P256_SPKI_PREFIX) {
        return Ok(&key[P256_SPKI_PREFIX.len()..]);
    }
    Err(reject("unsupported public key; only ES256 is accepted"))
}

/// Wrap a raw uncompressed P-256 point in SubjectPublicKeyInfo DER
#[must_use]
pub fn spki_from_point(point: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(P256_SPKI_PREFIX.len() + point.len());
    out.extend_from_slice(&P256_SPKI_PREFIX);
    out.extend_from_slice(point);
    out
}

/// Authenticator data fields used by assertion checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatorData {
    pub user_present: bool,
    pub sign_count: u32,
}

fn parse_authenticator_data(data: &[u8], rp_id: &str) -> Result<AuthenticatorData, DomainError> {
    if data.len() < AUTH_DATA_MIN_LEN {
        return Err(reject("authenticator data too short"));
    }
    let rp_hash = Sha256::digest(rp_id.as_bytes());
    if data[..32] != rp_hash[..] {
        return Err(reject("rp id hash mismatch"));
    }
    let flags = data[32];
    let sign_count = u32::from_be_bytes([data[33], data[34], data[35], data[36]]);
    Ok(AuthenticatorData {
        user_present: flags & FLAG_USER_PRESENT != 0,
        sign_count,
    })
}

/// Verify a `navigator.credentials.get()` assertion.
///
/// Returns the authenticator's new signature counter. A counter that does
/// not advance is rejected unless both sides are still at zero.
pub fn verify_assertion(
    public_key: &[u8],
    stored_sign_count: i64,
    rp_id: &str,
    authenticator_data: &[u8],
    client_data_json: &[u8],
    signature: &[u8],
) -> Result<u32, DomainError> {
    let auth = parse_authenticator_data(authenticator_data, rp_id)?;
    if !auth.user_present {
        return Err(reject("user presence flag not set"));
    }

    let mut signed = Vec::with_capacity(authenticator_data.len() + 32);
    signed.extend_from_slice(authenticator_data);
    signed.extend_from_slice(&Sha256::digest(client_data_json));

    let point = ec_point(public_key)?;
    UnparsedPublicKey::new(&ECDSA_P256_SHA256_ASN1, point)
        .verify(&signed, signature)
        .map_err(|_| reject("signature verification failed"))?;

    let new_count = i64::from(auth.sign_count);
    if (new_count != 0 || stored_sign_count != 0) && new_count <= stored_sign_count {
        return Err(reject("signature counter did not increase"));
    }

    Ok(auth.sign_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring::rand::SystemRandom;
    use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_ASN1_SIGNING};

    const RP_ID: &str = "dreamx.test";
    const ORIGIN: &str = "https://dreamx.test";

    fn key_pair() -> EcdsaKeyPair {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng).unwrap();
        EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng).unwrap()
    }

    fn auth_data(rp_id: &str, flags: u8, count: u32) -> Vec<u8> {
        let mut data = Sha256::digest(rp_id.as_bytes()).to_vec();
        data.push(flags);
        data.extend_from_slice(&count.to_be_bytes());
        data
    }

    fn client_data(kind: &str, challenge: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "type": kind,
            "challenge": challenge,
            "origin": ORIGIN,
            "crossOrigin": false
        }))
        .unwrap()
    }

    fn sign(kp: &EcdsaKeyPair, auth: &[u8], client: &[u8]) -> Vec<u8> {
        let mut msg = auth.to_vec();
        msg.extend_from_slice(&Sha256::digest(client));
        kp.sign(&SystemRandom::new(), &msg).unwrap().as_ref().to_vec()
    }

    #[test]
    fn test_client_data_checks() {
        let data = client_data(TYPE_GET, "abc");
        let expected = Expected { kind: TYPE_GET, challenge: "abc", origin: ORIGIN };
        assert!(verify_client_data(&data, expected).is_ok());

        let wrong_type = Expected { kind: TYPE_CREATE, ..expected };
        assert!(verify_client_data(&data, wrong_type).is_err());

        let wrong_challenge = Expected { challenge: "xyz", ..expected };
        assert!(verify_client_data(&data, wrong_challenge).is_err());

        let wrong_origin = Expected { origin: "https://evil.test", ..expected };
        assert!(verify_client_data(&data, wrong_origin).is_err());
    }

    #[test]
    fn test_parse_public_key() {
        let kp = key_pair();
        let spki = spki_from_point(kp.public_key().as_ref());
        assert_eq!(spki.len(), 91);
        assert_eq!(parse_public_key(&spki).unwrap(), spki);
        assert!(parse_public_key(&[0u8; 10]).is_err());
    }

    #[test]
    fn test_verify_assertion() {
        let kp = key_pair();
        let spki = spki_from_point(kp.public_key().as_ref());
        let auth = auth_data(RP_ID, FLAG_USER_PRESENT, 5);
        let client = client_data(TYPE_GET, "challenge");
        let sig = sign(&kp, &auth, &client);

        let count = verify_assertion(&spki, 4, RP_ID, &auth, &client, &sig).unwrap();
        assert_eq!(count, 5);

        // replayed counter
        assert!(verify_assertion(&spki, 5, RP_ID, &auth, &client, &sig).is_err());
        // tampered client data
        let other = client_data(TYPE_GET, "other");
        assert!(verify_assertion(&spki, 4, RP_ID, &auth, &other, &sig).is_err());
        // wrong relying party
        assert!(verify_assertion(&spki, 4, "other.test", &auth, &client, &sig).is_err());
    }

    #[test]
    fn test_zero_counter_allowed() {
        let kp = key_pair();
        let spki = spki_from_point(kp.public_key().as_ref());
        let auth = auth_data(RP_ID, FLAG_USER_PRESENT, 0);
        let client = client_data(TYPE_GET, "c");
        let sig = sign(&kp, &auth, &client);
        assert_eq!(verify_assertion(&spki, 0, RP_ID, &auth, &client, &sig).unwrap(), 0);
    }

    #[test]
    fn test_user_presence_required() {
        let kp = key_pair();
        let spki = spki_from_point(kp.public_key().as_ref());
        let auth = auth_data(RP_ID, 0x00, 1);
        let client = client_data(TYPE_GET, "c");
        let sig = sign(&kp, &auth, &client);
        assert!(verify_assertion(&spki, 0, RP_ID, &auth, &client, &sig).is_err());
    }
}
