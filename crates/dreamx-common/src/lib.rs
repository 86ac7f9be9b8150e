//! # dreamx-common
//!
//! Shared utilities including configuration, error handling, authentication, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{
    check_password, hash_password, random_token, sha256_hex, validate_password_strength,
    verify_password, Claims, JwtService, TokenPair, TokenType,
};
pub use config::{
    AdminSeed, AdminSeedConfig, AppConfig, AppSettings, ConfigError, CorsConfig, DatabaseConfig,
    Environment, JwtConfig, LemonSqueezyConfig, MailConfig, OAuthClientConfig, OAuthConfig,
    PaymentsConfig, PushConfig, RateLimitConfig, RealtimeBackend, RealtimeConfig, RedisConfig,
    ServerConfig, SnowflakeConfig, SquareConfig, StorageConfig, StripeConfig, WebAuthnConfig,
};
pub use error::{domain_status, AppError};
pub use telemetry::{try_init_tracing_with_config, TracingConfig, TracingError};
