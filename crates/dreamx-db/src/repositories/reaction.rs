//! SQLite implementation of ReactionRepository
//!
//! Posts, messages and comments each have their own reaction table keyed by
//! `(subject, user)`, so a user holds at most one reaction per subject.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, instrument};

use dreamx_core::traits::{ReactionRepository, RepoResult};
use dreamx_core::value_objects::{ReactionKind, ReactionSummary, ReactionTarget, ReactionToggle, Snowflake, ToggleOutcome};

use crate::models::ReactionCountModel;

use super::error::map_db_error;

/// Table and subject column for a reaction target
fn table_for(target: ReactionTarget) -> (&'static str, &'static str) {
    match target {
        ReactionTarget::Post => ("post_reactions", "post_id"),
        ReactionTarget::Message => ("message_reactions", "message_id"),
        ReactionTarget::Comment => ("comment_likes", "comment_id"),
    }
}

async fn counts(conn: &mut SqliteConnection, target: ReactionTarget, subject_id: Snowflake) -> RepoResult<ReactionSummary> {
    let (table, column) = table_for(target);
    let rows = sqlx::query_as::<_, ReactionCountModel>(&format!(
        "SELECT kind, COUNT(*) AS count FROM {table} WHERE {column} = ?1 GROUP BY kind"
    ))
    .bind(subject_id.into_inner())
    .fetch_all(conn)
    .await
    .map_err(map_db_error)?;

    Ok(rows.into_iter().collect())
}

/// SQLite implementation of ReactionRepository
#[derive(Clone)]
pub struct SqliteReactionRepository {
    pool: SqlitePool,
}

impl SqliteReactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReactionRepository for SqliteReactionRepository {
    #[instrument(skip(self), fields(target = target.as_str(), kind = kind.as_str()))]
    async fn toggle(
        &self,
        target: ReactionTarget,
        subject_id: Snowflake,
        user_id: Snowflake,
        kind: &ReactionKind,
    ) -> RepoResult<ReactionToggle> {
        let (table, column) = table_for(target);
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let cleared = sqlx::query(&format!("DELETE FROM {table} WHERE {column} = ?1 AND user_id = ?2 AND kind = ?3"))
            .bind(subject_id.into_inner())
            .bind(user_id.into_inner())
            .bind(kind.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?
            .rows_affected();

        let outcome = if cleared > 0 {
            ToggleOutcome::Cleared
        } else {
            let updated = sqlx::query(&format!(
                "UPDATE {table} SET kind = ?3, created_at = ?4 WHERE {column} = ?1 AND user_id = ?2"
            ))
            .bind(subject_id.into_inner())
            .bind(user_id.into_inner())
            .bind(kind.as_str())
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?
            .rows_affected();

            if updated > 0 {
                ToggleOutcome::Updated
            } else {
                sqlx::query(&format!(
                    "INSERT INTO {table} ({column}, user_id, kind, created_at) VALUES (?1, ?2, ?3, ?4)"
                ))
                .bind(subject_id.into_inner())
                .bind(user_id.into_inner())
                .bind(kind.as_str())
                .bind(Utc::now())
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
                ToggleOutcome::Set
            }
        };

        let summary = counts(&mut tx, target, subject_id).await?;
        tx.commit().await.map_err(map_db_error)?;

        debug!(outcome = outcome.as_str(), total = summary.total(), "Reaction toggled");

        Ok(ReactionToggle {
            outcome,
            kind: outcome.is_active().then(|| kind.as_str().to_string()),
            counts: summary,
        })
    }

    #[instrument(skip(self))]
    async fn summary(&self, target: ReactionTarget, subject_id: Snowflake) -> RepoResult<ReactionSummary> {
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
        counts(&mut conn, target, subject_id).await
    }

    #[instrument(skip(self))]
    async fn user_reaction(
        &self,
        target: ReactionTarget,
        subject_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<String>> {
        let (table, column) = table_for(target);
        sqlx::query_scalar(&format!("SELECT kind FROM {table} WHERE {column} = ?1 AND user_id = ?2"))
            .bind(subject_id.into_inner())
            .bind(user_id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }
}
