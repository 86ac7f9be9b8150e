//! SQLite connection pool management
//!
//! One database file, WAL journal, foreign keys enforced, and a busy timeout
//! so concurrent writers wait instead of failing.

use std::str::FromStr;
use std::time::Duration;

use dreamx_common::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use tracing::info;

/// Create a pool for the configured database file, creating it if missing
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await?;

    info!(url = %config.url, max_connections = config.max_connections, "Database pool ready");
    Ok(pool)
}

/// Single-connection in-memory database, used by tests
///
/// The connection is never recycled; closing it would drop the database.
pub async fn create_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_pool_enforces_foreign_keys() {
        let pool = create_memory_pool().await.unwrap();
        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys").fetch_one(&pool).await.unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_file_pool_uses_wal() {
        let dir = std::env::temp_dir().join(format!("dreamx-pool-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.join("pool.db").display()),
            max_connections: 2,
            busy_timeout_ms: 1000,
        };
        let pool = create_pool(&config).await.unwrap();
        let mode: String = sqlx::query_scalar("PRAGMA journal_mode").fetch_one(&pool).await.unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        pool.close().await;
        let _ = std::fs::remove_dir_all(dir);
    }
}
