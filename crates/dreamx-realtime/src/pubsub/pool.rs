//! Redis connection pool using deadpool-redis

use deadpool_redis::{Config, Pool, Runtime};

use crate::bus::{BusError, BusResult};

/// Redis pool configuration
#[derive(Debug, Clone)]
pub struct RedisPoolConfig {
    /// Redis connection URL (e.g., `redis://localhost:6379`)
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: usize,
}

impl RedisPoolConfig {
    /// Build from app config; a Redis backend without a URL is a config error
    pub fn from_config(config: &dreamx_common::RedisConfig) -> BusResult<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| BusError::NotConfigured("REDIS_URL is required for the redis backend".to_string()))?;
        Ok(Self {
            url,
            max_connections: config.max_connections as usize,
        })
    }

    /// URL with credentials stripped, for logging
    #[must_use]
    pub fn safe_url(&self) -> &str {
        self.url.split('@').next_back().unwrap_or(&self.url)
    }
}

/// Managed Redis connection pool
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPool")
            .field("status", &self.pool.status())
            .finish()
    }
}

impl RedisPool {
    pub fn new(config: &RedisPoolConfig) -> BusResult<Self> {
        let pool = Config::from_url(&config.url)
            .builder()
            .map_err(|e| BusError::CreatePool(e.to_string()))?
            .max_size(config.max_connections.max(1))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| BusError::CreatePool(e.to_string()))?;

        tracing::info!(
            url = %config.safe_url(),
            max_connections = config.max_connections,
            "Redis pool created"
        );

        Ok(Self { pool })
    }

    pub async fn get(&self) -> BusResult<deadpool_redis::Connection> {
        self.pool.get().await.map_err(BusError::Pool)
    }

    /// Ping Redis through a pooled connection
    pub async fn health_check(&self) -> BusResult<()> {
        let mut conn = self.get().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}
