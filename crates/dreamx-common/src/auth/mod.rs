//! Authentication utilities

mod jwt;
mod password;
mod secret;
pub mod webauthn;

pub use jwt::{Claims, JwtService, TokenPair, TokenType};
pub use password::{
    check_password, hash_password, validate_password_strength, verify_password, PASSWORD_MAX_LEN,
    PASSWORD_MIN_LEN,
};
pub use secret::{random_token, sha256_hex};
