//! Configuration structs

mod app_config;

pub use app_config::{
    AdminSeed, AdminSeedConfig, AppConfig, AppSettings, ConfigError, CorsConfig, DatabaseConfig,
    Environment, JwtConfig, LemonSqueezyConfig, MailConfig, OAuthClientConfig, OAuthConfig,
    PaymentsConfig, PushConfig, RateLimitConfig, RealtimeBackend, RealtimeConfig, RedisConfig,
    ServerConfig, SnowflakeConfig, SquareConfig, StorageConfig, StripeConfig, WebAuthnConfig,
};
