//! Password hashing and verification
//!
//! Argon2id with a random salt per hash.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use dreamx_core::DomainError;

use crate::error::AppError;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {e}")))
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Verify, mapping a mismatch (or a missing hash) to `InvalidCredentials`
pub fn check_password(password: &str, hash: Option<&str>) -> Result<(), AppError> {
    match hash {
        Some(hash) if verify_password(password, hash)? => Ok(()),
        _ => Err(AppError::InvalidCredentials),
    }
}

/// Password policy: 8-128 characters with upper, lower and a digit
pub fn validate_password_strength(password: &str) -> Result<(), DomainError> {
    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Err(DomainError::WeakPassword(format!(
            "must be at least {PASSWORD_MIN_LEN} characters long"
        )));
    }
    if len > PASSWORD_MAX_LEN {
        return Err(DomainError::WeakPassword(format!(
            "must be at most {PASSWORD_MAX_LEN} characters long"
        )));
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(DomainError::WeakPassword(
            "must contain an uppercase letter".to_string(),
        ));
    }
    if !password.chars().any(char::is_lowercase) {
        return Err(DomainError::WeakPassword(
            "must contain a lowercase letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(DomainError::WeakPassword("must contain a digit".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("SecurePassword123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert_ne!(hash, hash_password("SecurePassword123").unwrap());

        assert!(verify_password("SecurePassword123", &hash).unwrap());
        assert!(!verify_password("WrongPassword123", &hash).unwrap());
    }

    #[test]
    fn test_check_password() {
        let hash = hash_password("SecurePassword123").unwrap();
        assert!(check_password("SecurePassword123", Some(&hash)).is_ok());
        assert!(matches!(
            check_password("nope", Some(&hash)),
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            check_password("SecurePassword123", None),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password_strength("Abcdefg1").is_ok());
        assert!(validate_password_strength("MyP@ssw0rd!").is_ok());

        for weak in ["Short1", "lowercase123", "UPPERCASE123", "NoDigitsHere"] {
            assert!(
                matches!(validate_password_strength(weak), Err(DomainError::WeakPassword(_))),
                "{weak} should be rejected"
            );
        }
        assert!(validate_password_strength(&format!("Aa1{}", "x".repeat(PASSWORD_MAX_LEN))).is_err());
    }
}
