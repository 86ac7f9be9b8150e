//! Application configuration structs
//!
//! Loads configuration from environment variables (and `.env` when present).

use dreamx_core::{PaymentProvider, Plan};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub api: ServerConfig,
    pub gateway: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub realtime: RealtimeConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub storage: StorageConfig,
    pub snowflake: SnowflakeConfig,
    pub webauthn: WebAuthnConfig,
    pub oauth: OAuthConfig,
    pub mail: MailConfig,
    pub push: PushConfig,
    pub payments: PaymentsConfig,
    pub admin: AdminSeedConfig,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
    /// Public base URL of the site, used in emails and OAuth redirects
    pub public_url: String,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Server configuration (for both API and Gateway)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite URL, e.g. `sqlite://dreamx.db`
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}

/// Redis configuration (only needed for the redis realtime backend)
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

/// Which event bus carries realtime events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RealtimeBackend {
    /// In-process broadcast; the gateway is mounted into the API process
    #[default]
    Memory,
    /// Redis pub/sub; gateways may run as separate processes
    Redis,
}

#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    pub backend: RealtimeBackend,
    /// Capacity of the bounded notification delivery queue
    pub queue_capacity: usize,
    pub heartbeat_interval_ms: u64,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry: i64,
    pub refresh_token_expiry: i64,
}

/// Rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst: u32,
}

/// CORS configuration
#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// File storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_dir: String,
    pub max_file_size_mb: u32,
}

impl StorageConfig {
    #[must_use]
    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb as usize * 1024 * 1024
    }
}

/// Snowflake ID generator configuration
#[derive(Debug, Clone)]
pub struct SnowflakeConfig {
    pub worker_id: u16,
}

/// WebAuthn relying party
#[derive(Debug, Clone)]
pub struct WebAuthnConfig {
    pub rp_id: String,
    pub rp_name: String,
    pub origin: String,
}

/// Client credentials of one OAuth provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Default)]
pub struct OAuthConfig {
    pub google: Option<OAuthClientConfig>,
    pub github: Option<OAuthClientConfig>,
    pub discord: Option<OAuthClientConfig>,
    /// Base for `{base}/api/v1/auth/oauth/{provider}/callback`
    pub redirect_base_url: String,
}

/// SMTP settings; no host means mail is only logged
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

/// VAPID settings for Web Push
#[derive(Debug, Clone, Default)]
pub struct PushConfig {
    pub vapid_subject: Option<String>,
    pub vapid_private_key_path: Option<String>,
    pub ttl_seconds: u32,
}

impl PushConfig {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.vapid_subject.is_some() && self.vapid_private_key_path.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone, Default)]
pub struct SquareConfig {
    pub access_token: Option<String>,
    pub location_id: Option<String>,
    pub webhook_signature_key: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone, Default)]
pub struct LemonSqueezyConfig {
    pub api_key: Option<String>,
    pub store_id: Option<String>,
    pub webhook_secret: Option<String>,
    /// Variant charged for one-time payments (price overridden per checkout)
    pub one_time_variant_id: Option<String>,
    pub api_base: String,
}

/// Payment processors and plan catalogue
#[derive(Debug, Clone)]
pub struct PaymentsConfig {
    pub provider: PaymentProvider,
    pub stripe: StripeConfig,
    pub square: SquareConfig,
    pub lemonsqueezy: LemonSqueezyConfig,
    pub plans: Vec<Plan>,
}

impl PaymentsConfig {
    #[must_use]
    pub fn plan(&self, id: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == id)
    }
}

/// Admin account created or promoted at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct AdminSeedConfig {
    pub seed: Option<AdminSeed>,
}

// Default value functions
fn default_app_name() -> String {
    "dreamx".to_string()
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    3000
}

fn default_gateway_port() -> u16 {
    3001
}

fn default_database_url() -> String {
    "sqlite://dreamx.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_heartbeat_interval_ms() -> u64 {
    41_250
}

fn default_access_token_expiry() -> i64 {
    900 // 15 minutes
}

fn default_refresh_token_expiry() -> i64 {
    604_800 // 7 days
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_burst() -> u32 {
    50
}

fn default_upload_dir() -> String {
    "./uploads".to_string()
}

fn default_max_file_size() -> u32 {
    10
}

fn default_rp_id() -> String {
    "localhost".to_string()
}

fn default_mail_port() -> u16 {
    587
}

fn default_mail_from() -> String {
    "Dream X <no-reply@localhost>".to_string()
}

fn default_push_ttl() -> u32 {
    86_400
}

fn default_stripe_api() -> String {
    "https://api.stripe.com".to_string()
}

fn default_square_api() -> String {
    "https://connect.squareup.com".to_string()
}

fn default_lemonsqueezy_api() -> String {
    "https://api.lemonsqueezy.com".to_string()
}

fn default_plans() -> &'static str {
    "premium|Premium|999|usd|month|price_premium"
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let public_url = vars.string("PUBLIC_URL").unwrap_or_else(default_public_url);

        Ok(Self {
            app: AppSettings {
                name: vars.string("APP_NAME").unwrap_or_else(default_app_name),
                env: match vars.string("APP_ENV") {
                    Some(s) => Environment::parse(&s).ok_or(ConfigError::InvalidValue("APP_ENV", s))?,
                    None => Environment::default(),
                },
                public_url: public_url.clone(),
            },
            api: ServerConfig {
                host: vars.string("API_HOST").unwrap_or_else(default_host),
                port: vars.parse("API_PORT")?.unwrap_or_else(default_api_port),
            },
            gateway: ServerConfig {
                host: vars.string("GATEWAY_HOST").unwrap_or_else(default_host),
                port: vars.parse("GATEWAY_PORT")?.unwrap_or_else(default_gateway_port),
            },
            database: DatabaseConfig {
                url: vars.string("DATABASE_URL").unwrap_or_else(default_database_url),
                max_connections: vars
                    .parse("DATABASE_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_max_connections),
                busy_timeout_ms: vars
                    .parse("DATABASE_BUSY_TIMEOUT_MS")?
                    .unwrap_or_else(default_busy_timeout_ms),
            },
            redis: RedisConfig {
                url: vars.string("REDIS_URL"),
                max_connections: vars
                    .parse("REDIS_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_redis_max_connections),
            },
            realtime: RealtimeConfig {
                backend: match vars.string("REALTIME_BACKEND").as_deref() {
                    None | Some("memory") => RealtimeBackend::Memory,
                    Some("redis") => RealtimeBackend::Redis,
                    Some(other) => {
                        return Err(ConfigError::InvalidValue("REALTIME_BACKEND", other.to_string()))
                    }
                },
                queue_capacity: vars
                    .parse("NOTIFICATION_QUEUE_CAPACITY")?
                    .unwrap_or_else(default_queue_capacity),
                heartbeat_interval_ms: vars
                    .parse("GATEWAY_HEARTBEAT_INTERVAL_MS")?
                    .unwrap_or_else(default_heartbeat_interval_ms),
            },
            jwt: JwtConfig {
                secret: vars.string("JWT_SECRET").ok_or(ConfigError::MissingVar("JWT_SECRET"))?,
                access_token_expiry: vars
                    .parse("JWT_ACCESS_TOKEN_EXPIRY")?
                    .unwrap_or_else(default_access_token_expiry),
                refresh_token_expiry: vars
                    .parse("JWT_REFRESH_TOKEN_EXPIRY")?
                    .unwrap_or_else(default_refresh_token_expiry),
            },
            rate_limit: RateLimitConfig {
                requests_per_second: vars
                    .parse("RATE_LIMIT_REQUESTS_PER_SECOND")?
                    .unwrap_or_else(default_requests_per_second),
                burst: vars.parse("RATE_LIMIT_BURST")?.unwrap_or_else(default_burst),
            },
            cors: CorsConfig {
                allowed_origins: vars
                    .string("CORS_ALLOWED_ORIGINS")
                    .map(|s| s.split(',').map(str::trim).map(String::from).collect())
                    .unwrap_or_default(),
            },
            storage: StorageConfig {
                upload_dir: vars.string("UPLOAD_DIR").unwrap_or_else(default_upload_dir),
                max_file_size_mb: vars
                    .parse("MAX_FILE_SIZE_MB")?
                    .unwrap_or_else(default_max_file_size),
            },
            snowflake: SnowflakeConfig {
                worker_id: vars.parse("WORKER_ID")?.unwrap_or(0),
            },
            webauthn: WebAuthnConfig {
                rp_id: vars.string("WEBAUTHN_RP_ID").unwrap_or_else(default_rp_id),
                rp_name: vars.string("WEBAUTHN_RP_NAME").unwrap_or_else(|| "Dream X".to_string()),
                origin: vars.string("WEBAUTHN_ORIGIN").unwrap_or_else(|| public_url.clone()),
            },
            oauth: OAuthConfig {
                google: vars.oauth_client("GOOGLE"),
                github: vars.oauth_client("GITHUB"),
                discord: vars.oauth_client("DISCORD"),
                redirect_base_url: vars
                    .string("OAUTH_REDIRECT_BASE_URL")
                    .unwrap_or_else(|| public_url.clone()),
            },
            mail: MailConfig {
                host: vars.string("SMTP_HOST"),
                port: vars.parse("SMTP_PORT")?.unwrap_or_else(default_mail_port),
                username: vars.string("SMTP_USERNAME"),
                password: vars.string("SMTP_PASSWORD"),
                from: vars.string("MAIL_FROM").unwrap_or_else(default_mail_from),
            },
            push: PushConfig {
                vapid_subject: vars.string("VAPID_SUBJECT"),
                vapid_private_key_path: vars.string("VAPID_PRIVATE_KEY_PATH"),
                ttl_seconds: vars.parse("PUSH_TTL_SECONDS")?.unwrap_or_else(default_push_ttl),
            },
            payments: PaymentsConfig {
                provider: match vars.string("PAYMENT_PROVIDER") {
                    Some(s) => PaymentProvider::parse(&s)
                        .ok_or(ConfigError::InvalidValue("PAYMENT_PROVIDER", s))?,
                    None => PaymentProvider::Stripe,
                },
                stripe: StripeConfig {
                    secret_key: vars.string("STRIPE_SECRET_KEY"),
                    webhook_secret: vars.string("STRIPE_WEBHOOK_SECRET"),
                    api_base: vars.string("STRIPE_API_BASE").unwrap_or_else(default_stripe_api),
                },
                square: SquareConfig {
                    access_token: vars.string("SQUARE_ACCESS_TOKEN"),
                    location_id: vars.string("SQUARE_LOCATION_ID"),
                    webhook_signature_key: vars.string("SQUARE_WEBHOOK_SIGNATURE_KEY"),
                    api_base: vars.string("SQUARE_API_BASE").unwrap_or_else(default_square_api),
                },
                lemonsqueezy: LemonSqueezyConfig {
                    api_key: vars.string("LEMONSQUEEZY_API_KEY"),
                    store_id: vars.string("LEMONSQUEEZY_STORE_ID"),
                    webhook_secret: vars.string("LEMONSQUEEZY_WEBHOOK_SECRET"),
                    one_time_variant_id: vars.string("LEMONSQUEEZY_ONE_TIME_VARIANT_ID"),
                    api_base: vars
                        .string("LEMONSQUEEZY_API_BASE")
                        .unwrap_or_else(default_lemonsqueezy_api),
                },
                plans: parse_plans(
                    &vars.string("PAYMENT_PLANS").unwrap_or_else(|| default_plans().to_string()),
                )?,
            },
            admin: AdminSeedConfig {
                seed: match (
                    vars.string("ADMIN_EMAIL"),
                    vars.string("ADMIN_USERNAME"),
                    vars.string("ADMIN_PASSWORD"),
                ) {
                    (Some(email), username, Some(password)) => Some(AdminSeed {
                        email,
                        username: username.unwrap_or_else(|| "admin".to_string()),
                        password,
                    }),
                    _ => None,
                },
            },
        })
    }
}

/// Environment lookup helpers; blank values count as unset
struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn parse<T: FromStr>(&self, key: &'static str) -> Result<Option<T>, ConfigError> {
        match self.string(key) {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue(key, raw)),
            None => Ok(None),
        }
    }

    /// A provider is enabled only when both id and secret are present
    fn oauth_client(&self, prefix: &str) -> Option<OAuthClientConfig> {
        let client_id = self.string(&format!("{prefix}_CLIENT_ID"))?;
        let client_secret = self.string(&format!("{prefix}_CLIENT_SECRET"))?;
        Some(OAuthClientConfig {
            client_id,
            client_secret,
        })
    }
}

/// Parse `id|name|amount_cents|currency|interval|provider_price_id` entries separated by `;`
fn parse_plans(raw: &str) -> Result<Vec<Plan>, ConfigError> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let parts: Vec<&str> = entry.split('|').map(str::trim).collect();
            let [id, name, amount, currency, interval, price_id] = parts.as_slice() else {
                return Err(ConfigError::InvalidValue("PAYMENT_PLANS", entry.to_string()));
            };
            let amount_cents = amount
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PAYMENT_PLANS", entry.to_string()))?;
            Ok(Plan {
                id: (*id).to_string(),
                name: (*name).to_string(),
                amount_cents,
                currency: currency.to_lowercase(),
                interval: (*interval).to_string(),
                provider_price_id: (*price_id).to_string(),
            })
        })
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_environment_is_production() {
        assert!(!Environment::Development.is_production());
        assert!(!Environment::Staging.is_production());
        assert!(Environment::Production.is_production());
    }

    #[test]
    fn test_server_address() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
        };
        assert_eq!(config.address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_jwt_secret_is_required() {
        let result = load(&[]);
        assert!(matches!(result, Err(ConfigError::MissingVar("JWT_SECRET"))));
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.database.url, "sqlite://dreamx.db");
        assert_eq!(config.storage.upload_dir, "./uploads");
        assert_eq!(config.realtime.backend, RealtimeBackend::Memory);
        assert_eq!(config.realtime.queue_capacity, 1024);
        assert_eq!(config.payments.provider, PaymentProvider::Stripe);
        assert_eq!(config.payments.plans.len(), 1);
        assert!(config.oauth.google.is_none());
        assert!(config.mail.host.is_none());
        assert!(!config.push.is_enabled());
        assert!(config.admin.seed.is_none());
        assert_eq!(config.jwt.access_token_expiry, 900);
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let result = load(&[("JWT_SECRET", "s"), ("API_PORT", "eighty")]);
        assert!(matches!(result, Err(ConfigError::InvalidValue("API_PORT", _))));
    }

    #[test]
    fn test_oauth_needs_id_and_secret() {
        let config = load(&[
            ("JWT_SECRET", "s"),
            ("GITHUB_CLIENT_ID", "id"),
            ("GOOGLE_CLIENT_ID", "gid"),
            ("GOOGLE_CLIENT_SECRET", "gsecret"),
        ])
        .unwrap();
        assert!(config.oauth.github.is_none());
        assert_eq!(config.oauth.google.unwrap().client_secret, "gsecret");
    }

    #[test]
    fn test_payment_provider_and_plans() {
        let config = load(&[
            ("JWT_SECRET", "s"),
            ("PAYMENT_PROVIDER", "lemon_squeezy"),
            ("PAYMENT_PLANS", "basic|Basic|500|USD|month|111; pro|Pro|1500|usd|year|222"),
        ])
        .unwrap();
        assert_eq!(config.payments.provider, PaymentProvider::LemonSqueezy);
        assert_eq!(config.payments.plans.len(), 2);
        let pro = config.payments.plan("pro").unwrap();
        assert_eq!(pro.amount_cents, 1500);
        assert_eq!(pro.provider_price_id, "222");
        assert_eq!(config.payments.plan("basic").unwrap().currency, "usd");
    }

    #[test]
    fn test_bad_plan_entry() {
        let result = load(&[("JWT_SECRET", "s"), ("PAYMENT_PLANS", "broken|entry")]);
        assert!(matches!(result, Err(ConfigError::InvalidValue("PAYMENT_PLANS", _))));
    }

    #[test]
    fn test_admin_seed() {
        let config = load(&[
            ("JWT_SECRET", "s"),
            ("ADMIN_EMAIL", "root@example.com"),
            ("ADMIN_PASSWORD", "Sup3rSecret"),
        ])
        .unwrap();
        let seed = config.admin.seed.unwrap();
        assert_eq!(seed.username, "admin");
        assert_eq!(seed.email, "root@example.com");
    }

    #[test]
    fn test_realtime_backend() {
        let config = load(&[("JWT_SECRET", "s"), ("REALTIME_BACKEND", "redis")]).unwrap();
        assert_eq!(config.realtime.backend, RealtimeBackend::Redis);
        assert!(load(&[("JWT_SECRET", "s"), ("REALTIME_BACKEND", "kafka")]).is_err());
    }
}
