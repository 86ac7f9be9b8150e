//! # dreamx-db
//!
//! Database layer implementing repository traits with SQLite via SQLx.
//!
//! ## Overview
//!
//! This crate provides SQLite implementations for all repository traits
//! defined in `dreamx-core`. It handles:
//!
//! - Connection pool management (WAL, foreign keys, busy timeout)
//! - Additive, idempotent startup migrations
//! - Database models with SQLx `FromRow` derives
//! - Model to entity mappers
//! - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dreamx_db::{create_pool, run_migrations, SqliteUserRepository};
//! use dreamx_core::traits::UserRepository;
//!
//! async fn example(config: &dreamx_common::DatabaseConfig) -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(config).await?;
//!     run_migrations(&pool).await?;
//!     let users = SqliteUserRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use migrations::run_migrations;
pub use pool::{create_memory_pool, create_pool, SqlitePool};
pub use repositories::*;
