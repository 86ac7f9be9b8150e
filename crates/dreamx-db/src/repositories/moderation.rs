//! SQLite implementations of the moderation repositories

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use dreamx_core::entities::{Appeal, AppealKind, AppealStatus, AuditEntry, Block, Report, ReportStatus};
use dreamx_core::error::DomainError;
use dreamx_core::traits::{
    AppealRepository, AuditRepository, BlockRepository, CursorQuery, PageQuery, RepoResult, ReportRepository,
};
use dreamx_core::value_objects::Snowflake;

use crate::mappers::json_text;
use crate::models::{AppealModel, AuditEntryModel, BlockModel, ReportModel};

use super::error::{map_db_error, map_unique_violation};

const REPORT_COLUMNS: &str = "id, reporter_id, subject_type, subject_id, reason, details, status, \
     reviewer_id, resolution_note, created_at, resolved_at";

const APPEAL_COLUMNS: &str =
    "id, user_id, kind, subject_id, message, status, reviewer_id, decision_note, created_at, decided_at";

// ============================================================================
// Blocks
// ============================================================================

#[derive(Clone)]
pub struct SqliteBlockRepository {
    pool: SqlitePool,
}

impl SqliteBlockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlockRepository for SqliteBlockRepository {
    #[instrument(skip(self))]
    async fn block(&self, blocker_id: Snowflake, blocked_id: Snowflake, at: DateTime<Utc>) -> RepoResult<()> {
        sqlx::query("INSERT OR IGNORE INTO blocks (blocker_id, blocked_id, created_at) VALUES (?1, ?2, ?3)")
            .bind(blocker_id.into_inner())
            .bind(blocked_id.into_inner())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn unblock(&self, blocker_id: Snowflake, blocked_id: Snowflake) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM blocks WHERE blocker_id = ?1 AND blocked_id = ?2")
            .bind(blocker_id.into_inner())
            .bind(blocked_id.into_inner())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn list(&self, blocker_id: Snowflake) -> RepoResult<Vec<Block>> {
        let results = sqlx::query_as::<_, BlockModel>(
            "SELECT blocker_id, blocked_id, created_at FROM blocks WHERE blocker_id = ?1 ORDER BY created_at DESC",
        )
        .bind(blocker_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Block::from).collect())
    }

    #[instrument(skip(self))]
    async fn has_blocked(&self, blocker_id: Snowflake, blocked_id: Snowflake) -> RepoResult<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM blocks WHERE blocker_id = ?1 AND blocked_id = ?2)")
            .bind(blocker_id.into_inner())
            .bind(blocked_id.into_inner())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn is_blocked_either(&self, a: Snowflake, b: Snowflake) -> RepoResult<bool> {
        sqlx::query_scalar(
            r"
            SELECT EXISTS(
                SELECT 1 FROM blocks
                WHERE (blocker_id = ?1 AND blocked_id = ?2) OR (blocker_id = ?2 AND blocked_id = ?1)
            )
            ",
        )
        .bind(a.into_inner())
        .bind(b.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Clone)]
pub struct SqliteReportRepository {
    pool: SqlitePool,
}

impl SqliteReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportRepository for SqliteReportRepository {
    #[instrument(skip(self, report), fields(reporter_id = %report.reporter_id, subject = report.subject_type.as_str()))]
    async fn create(&self, report: &Report) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO reports (id, reporter_id, subject_type, subject_id, reason, details, status,
                                 reviewer_id, resolution_note, created_at, resolved_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(report.id.into_inner())
        .bind(report.reporter_id.into_inner())
        .bind(report.subject_type.as_str())
        .bind(report.subject_id.into_inner())
        .bind(&report.reason)
        .bind(&report.details)
        .bind(report.status.as_str())
        .bind(report.reviewer_id.map(Snowflake::into_inner))
        .bind(&report.resolution_note)
        .bind(report.created_at)
        .bind(report.resolved_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || DomainError::DuplicateReport))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Report>> {
        let result = sqlx::query_as::<_, ReportModel>(&format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1"))
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.map(Report::from))
    }

    #[instrument(skip(self))]
    async fn list(&self, status: Option<ReportStatus>, query: CursorQuery) -> RepoResult<Vec<Report>> {
        let results = sqlx::query_as::<_, ReportModel>(&format!(
            r"
            SELECT {REPORT_COLUMNS}
            FROM reports
            WHERE (?1 IS NULL OR status = ?1)
              AND (?2 IS NULL OR id < ?2)
              AND (?3 IS NULL OR id > ?3)
            ORDER BY id DESC
            LIMIT ?4
            "
        ))
        .bind(status.map(ReportStatus::as_str))
        .bind(query.before.map(Snowflake::into_inner))
        .bind(query.after.map(Snowflake::into_inner))
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Report::from).collect())
    }

    #[instrument(skip(self, report), fields(report_id = %report.id, status = report.status.as_str()))]
    async fn resolve(&self, report: &Report) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE reports SET status = ?2, reviewer_id = ?3, resolution_note = ?4, resolved_at = ?5 WHERE id = ?1",
        )
        .bind(report.id.into_inner())
        .bind(report.status.as_str())
        .bind(report.reviewer_id.map(Snowflake::into_inner))
        .bind(&report.resolution_note)
        .bind(report.resolved_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ReportNotFound(report.id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn count_open(&self) -> RepoResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE status = ?1")
            .bind(ReportStatus::Open.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }
}

// ============================================================================
// Audit log
// ============================================================================

#[derive(Clone)]
pub struct SqliteAuditRepository {
    pool: SqlitePool,
}

impl SqliteAuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for SqliteAuditRepository {
    #[instrument(skip(self, entry), fields(actor_id = %entry.actor_id, action = %entry.action))]
    async fn record(&self, entry: &AuditEntry) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO audit_log (id, actor_id, action, target_type, target_id, details, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(entry.id.into_inner())
        .bind(entry.actor_id.into_inner())
        .bind(&entry.action)
        .bind(&entry.target_type)
        .bind(entry.target_id.map(Snowflake::into_inner))
        .bind(json_text(&entry.details))
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self, page: PageQuery) -> RepoResult<(Vec<AuditEntry>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_log")
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        let results = sqlx::query_as::<_, AuditEntryModel>(
            r"
            SELECT id, actor_id, action, target_type, target_id, details, created_at
            FROM audit_log
            ORDER BY id DESC
            LIMIT ?1 OFFSET ?2
            ",
        )
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok((results.into_iter().map(AuditEntry::from).collect(), total))
    }
}

// ============================================================================
// Appeals
// ============================================================================

#[derive(Clone)]
pub struct SqliteAppealRepository {
    pool: SqlitePool,
}

impl SqliteAppealRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AppealRepository for SqliteAppealRepository {
    #[instrument(skip(self, appeal), fields(user_id = %appeal.user_id, kind = appeal.kind.as_str()))]
    async fn create(&self, appeal: &Appeal) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO appeals (id, user_id, kind, subject_id, message, status, reviewer_id,
                                 decision_note, created_at, decided_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(appeal.id.into_inner())
        .bind(appeal.user_id.into_inner())
        .bind(appeal.kind.as_str())
        .bind(appeal.subject_id.map(Snowflake::into_inner))
        .bind(&appeal.message)
        .bind(appeal.status.as_str())
        .bind(appeal.reviewer_id.map(Snowflake::into_inner))
        .bind(&appeal.decision_note)
        .bind(appeal.created_at)
        .bind(appeal.decided_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || DomainError::DuplicateAppeal))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Appeal>> {
        let result = sqlx::query_as::<_, AppealModel>(&format!("SELECT {APPEAL_COLUMNS} FROM appeals WHERE id = ?1"))
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.map(Appeal::from))
    }

    #[instrument(skip(self))]
    async fn list(&self, status: Option<AppealStatus>, query: CursorQuery) -> RepoResult<Vec<Appeal>> {
        let results = sqlx::query_as::<_, AppealModel>(&format!(
            r"
            SELECT {APPEAL_COLUMNS}
            FROM appeals
            WHERE (?1 IS NULL OR status = ?1)
              AND (?2 IS NULL OR id < ?2)
              AND (?3 IS NULL OR id > ?3)
            ORDER BY id DESC
            LIMIT ?4
            "
        ))
        .bind(status.map(AppealStatus::as_str))
        .bind(query.before.map(Snowflake::into_inner))
        .bind(query.after.map(Snowflake::into_inner))
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Appeal::from).collect())
    }

    #[instrument(skip(self))]
    async fn list_by_user(&self, user_id: Snowflake) -> RepoResult<Vec<Appeal>> {
        let results = sqlx::query_as::<_, AppealModel>(&format!(
            "SELECT {APPEAL_COLUMNS} FROM appeals WHERE user_id = ?1 ORDER BY id DESC"
        ))
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Appeal::from).collect())
    }

    #[instrument(skip(self))]
    async fn has_pending(&self, user_id: Snowflake, kind: AppealKind, subject_id: Option<Snowflake>) -> RepoResult<bool> {
        sqlx::query_scalar(
            r"
            SELECT EXISTS(
                SELECT 1 FROM appeals
                WHERE user_id = ?1 AND kind = ?2 AND COALESCE(subject_id, 0) = COALESCE(?3, 0) AND status = ?4
            )
            ",
        )
        .bind(user_id.into_inner())
        .bind(kind.as_str())
        .bind(subject_id.map(Snowflake::into_inner))
        .bind(AppealStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self, appeal), fields(appeal_id = %appeal.id, status = appeal.status.as_str()))]
    async fn decide(&self, appeal: &Appeal) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE appeals SET status = ?2, reviewer_id = ?3, decision_note = ?4, decided_at = ?5 WHERE id = ?1",
        )
        .bind(appeal.id.into_inner())
        .bind(appeal.status.as_str())
        .bind(appeal.reviewer_id.map(Snowflake::into_inner))
        .bind(&appeal.decision_note)
        .bind(appeal.decided_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::AppealNotFound(appeal.id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn count_pending(&self) -> RepoResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM appeals WHERE status = ?1")
            .bind(AppealStatus::Pending.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }
}
