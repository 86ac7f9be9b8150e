//! Moderation service
//!
//! Blocks between users, content reports, account suspension and bans,
//! role changes, appeals and the audit log. Every staff action is recorded
//! in the append-only audit log.

use chrono::Utc;
use dreamx_core::{
    Appeal, AppealKind, AppealStatus, AuditEntry, CursorQuery, DomainError, Notification,
    NotificationKind, Report, ReportStatus, ReportSubject, Snowflake, User, UserStatus,
};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::dto::{
    AppealListQuery, AppealResponse, AuditEntryResponse, BanUserRequest, BlockResponse,
    CreateAppealRequest, CreateReportRequest, CurrentUserResponse, DecideAppealRequest,
    PageParams, PagedResponse, ReportListQuery, ReportResponse, ResolveReportRequest,
    SetRoleRequest, SuspendUserRequest,
};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::notification::NotificationService;

/// Append an audit entry for a privileged action
pub(crate) async fn record_audit(
    ctx: &ServiceContext,
    actor_id: Snowflake,
    action: &str,
    target_type: &str,
    target_id: Option<Snowflake>,
    details: serde_json::Value,
) -> ServiceResult<()> {
    let entry = AuditEntry {
        id: ctx.generate_id(),
        actor_id,
        action: action.to_string(),
        target_type: target_type.to_string(),
        target_id,
        details,
        created_at: Utc::now(),
    };
    ctx.audit_repo().record(&entry).await?;
    info!(actor_id = %actor_id, action, "Audit entry recorded");
    Ok(())
}

/// Moderation service
pub struct ModerationService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ModerationService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    async fn notify(&self, user_id: Snowflake, actor_id: Snowflake, body: String, data: serde_json::Value) {
        NotificationService::new(self.ctx)
            .notify(
                Notification::new(self.ctx.generate_id(), user_id, Some(actor_id), NotificationKind::Moderation, body)
                    .with_data(data),
            )
            .await;
    }

    /// The account a staff member is about to act on
    ///
    /// Nobody acts on themselves, and only admins act on admins.
    async fn moderation_target(&self, actor: &User, target_id: Snowflake) -> ServiceResult<User> {
        if actor.id == target_id {
            return Err(DomainError::CannotTargetSelf.into());
        }
        let target = self.ctx.load_user(target_id).await?;
        if target.is_admin() && !actor.is_admin() {
            return Err(DomainError::Forbidden("only admins can act on an admin".into()).into());
        }
        Ok(target)
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// Block a user; blocking twice is a no-op
    #[instrument(skip(self))]
    pub async fn block(&self, user_id: Snowflake, target_id: Snowflake) -> ServiceResult<()> {
        if user_id == target_id {
            return Err(DomainError::CannotTargetSelf.into());
        }
        self.ctx.load_user(target_id).await?;
        self.ctx.block_repo().block(user_id, target_id, Utc::now()).await?;

        info!(user_id = %user_id, target_id = %target_id, "User blocked");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn unblock(&self, user_id: Snowflake, target_id: Snowflake) -> ServiceResult<()> {
        if self.ctx.block_repo().unblock(user_id, target_id).await? {
            info!(user_id = %user_id, target_id = %target_id, "User unblocked");
        }
        Ok(())
    }

    pub async fn list_blocks(&self, user_id: Snowflake) -> ServiceResult<Vec<BlockResponse>> {
        let blocks = self.ctx.block_repo().list(user_id).await?;
        Ok(blocks.into_iter().map(BlockResponse::from).collect())
    }

    // =========================================================================
    // Reports
    // =========================================================================

    async fn subject_exists(&self, subject: ReportSubject, id: Snowflake) -> ServiceResult<bool> {
        let found = match subject {
            ReportSubject::User => self.ctx.user_repo().find_by_id(id).await?.is_some(),
            ReportSubject::Post => self.ctx.post_repo().find_by_id(id).await?.is_some(),
            ReportSubject::Comment => self.ctx.comment_repo().find_by_id(id).await?.is_some(),
            ReportSubject::Message => self.ctx.message_repo().find_by_id(id).await?.is_some(),
            ReportSubject::Service => self.ctx.service_repo().find_by_id(id).await?.is_some(),
        };
        Ok(found)
    }

    /// File a report; one open report per reporter and subject
    #[instrument(skip(self, request))]
    pub async fn report(&self, user_id: Snowflake, request: CreateReportRequest) -> ServiceResult<ReportResponse> {
        self.ctx.acting_user(user_id).await?;

        if request.subject_type == ReportSubject::User && request.subject_id == user_id {
            return Err(DomainError::CannotTargetSelf.into());
        }
        if !self.subject_exists(request.subject_type, request.subject_id).await? {
            return Err(ServiceError::not_found("Report subject", request.subject_id.to_string()));
        }

        let report = Report {
            id: self.ctx.generate_id(),
            reporter_id: user_id,
            subject_type: request.subject_type,
            subject_id: request.subject_id,
            reason: request.reason.trim().to_string(),
            details: request.details.filter(|d| !d.trim().is_empty()),
            status: ReportStatus::Open,
            reviewer_id: None,
            resolution_note: None,
            created_at: Utc::now(),
            resolved_at: None,
        };
        self.ctx.report_repo().create(&report).await?;

        info!(
            report_id = %report.id,
            subject_type = report.subject_type.as_str(),
            subject_id = %report.subject_id,
            "Report filed"
        );
        Ok(ReportResponse::from(report))
    }

    #[instrument(skip(self))]
    pub async fn list_reports(&self, staff_id: Snowflake, query: ReportListQuery) -> ServiceResult<Vec<ReportResponse>> {
        self.ctx.staff_user(staff_id).await?;
        let reports = self
            .ctx
            .report_repo()
            .list(query.status, CursorQuery::new(query.before, None, query.limit))
            .await?;
        Ok(reports.into_iter().map(ReportResponse::from).collect())
    }

    #[instrument(skip(self, request))]
    pub async fn resolve_report(
        &self,
        staff_id: Snowflake,
        report_id: Snowflake,
        request: ResolveReportRequest,
    ) -> ServiceResult<ReportResponse> {
        self.ctx.staff_user(staff_id).await?;
        if request.status == ReportStatus::Open {
            return Err(ServiceError::validation("A report can only be resolved or dismissed"));
        }

        let mut report = self
            .ctx
            .report_repo()
            .find_by_id(report_id)
            .await?
            .ok_or(DomainError::ReportNotFound(report_id))?;
        if !report.is_open() {
            return Err(ServiceError::conflict("Report is already closed"));
        }

        report.status = request.status;
        report.reviewer_id = Some(staff_id);
        report.resolution_note = request.note;
        report.resolved_at = Some(Utc::now());
        self.ctx.report_repo().resolve(&report).await?;

        record_audit(
            self.ctx,
            staff_id,
            "report.resolve",
            "report",
            Some(report_id),
            json!({ "status": report.status.as_str(), "subject_type": report.subject_type.as_str(), "subject_id": report.subject_id }),
        )
        .await?;

        self.notify(
            report.reporter_id,
            staff_id,
            format!("Your report was {}", report.status.as_str()),
            json!({ "report_id": report_id }),
        )
        .await;

        Ok(ReportResponse::from(report))
    }

    // =========================================================================
    // Account status
    // =========================================================================

    #[instrument(skip(self, request))]
    pub async fn suspend_user(
        &self,
        staff_id: Snowflake,
        target_id: Snowflake,
        request: SuspendUserRequest,
    ) -> ServiceResult<CurrentUserResponse> {
        let actor = self.ctx.staff_user(staff_id).await?;
        let mut target = self.moderation_target(&actor, target_id).await?;

        if request.until.is_some_and(|until| until <= Utc::now()) {
            return Err(ServiceError::validation("Suspension end must be in the future"));
        }
        if target.is_banned() {
            return Err(ServiceError::conflict("User is banned"));
        }

        let reason = request.reason.trim().to_string();
        target.suspend(request.until, reason.clone());
        self.ctx.user_repo().update(&target).await?;

        record_audit(
            self.ctx,
            staff_id,
            "user.suspend",
            "user",
            Some(target_id),
            json!({ "until": request.until, "reason": reason }),
        )
        .await?;

        let body = match request.until {
            Some(until) => format!("Your account is suspended until {}: {reason}", until.format("%Y-%m-%d %H:%M UTC")),
            None => format!("Your account is suspended: {reason}"),
        };
        self.notify(target_id, staff_id, body, json!({ "until": request.until })).await;

        info!(target_id = %target_id, "User suspended");
        Ok(CurrentUserResponse::from(&target))
    }

    #[instrument(skip(self))]
    pub async fn unsuspend_user(&self, staff_id: Snowflake, target_id: Snowflake) -> ServiceResult<CurrentUserResponse> {
        let actor = self.ctx.staff_user(staff_id).await?;
        let mut target = self.moderation_target(&actor, target_id).await?;

        if target.status != UserStatus::Suspended {
            return Err(ServiceError::conflict("User is not suspended"));
        }

        target.reinstate();
        self.ctx.user_repo().update(&target).await?;

        record_audit(self.ctx, staff_id, "user.unsuspend", "user", Some(target_id), json!({})).await?;
        self.notify(target_id, staff_id, "Your suspension was lifted".into(), json!({})).await;

        info!(target_id = %target_id, "User unsuspended");
        Ok(CurrentUserResponse::from(&target))
    }

    /// Ban a user and revoke every session they hold
    #[instrument(skip(self, request))]
    pub async fn ban_user(
        &self,
        staff_id: Snowflake,
        target_id: Snowflake,
        request: BanUserRequest,
    ) -> ServiceResult<CurrentUserResponse> {
        let actor = self.ctx.staff_user(staff_id).await?;
        let mut target = self.moderation_target(&actor, target_id).await?;

        let reason = request.reason.trim().to_string();
        target.ban(reason.clone());
        self.ctx.user_repo().update(&target).await?;

        let revoked = self
            .ctx
            .refresh_token_repo()
            .revoke_all_for_user(target_id, Utc::now())
            .await?;

        record_audit(
            self.ctx,
            staff_id,
            "user.ban",
            "user",
            Some(target_id),
            json!({ "reason": reason, "sessions_revoked": revoked }),
        )
        .await?;
        self.notify(target_id, staff_id, format!("Your account was banned: {reason}"), json!({})).await;

        info!(target_id = %target_id, revoked, "User banned");
        Ok(CurrentUserResponse::from(&target))
    }

    /// Change a user's role; admins only
    #[instrument(skip(self))]
    pub async fn set_role(
        &self,
        admin_id: Snowflake,
        target_id: Snowflake,
        request: SetRoleRequest,
    ) -> ServiceResult<CurrentUserResponse> {
        let actor = self.ctx.acting_user(admin_id).await?;
        if !actor.is_admin() {
            return Err(ServiceError::permission_denied("admin"));
        }
        let mut target = self.moderation_target(&actor, target_id).await?;

        let previous = target.role;
        target.role = request.role;
        target.updated_at = Utc::now();
        self.ctx.user_repo().update(&target).await?;

        record_audit(
            self.ctx,
            admin_id,
            "user.set_role",
            "user",
            Some(target_id),
            json!({ "from": previous.as_str(), "to": request.role.as_str() }),
        )
        .await?;

        info!(target_id = %target_id, role = request.role.as_str(), "Role changed");
        Ok(CurrentUserResponse::from(&target))
    }

    // =========================================================================
    // Appeals
    // =========================================================================

    /// Appeal a suspension, ban, or content removal
    ///
    /// Suspended users may appeal; the account only needs to exist.
    #[instrument(skip(self, request))]
    pub async fn create_appeal(&self, user_id: Snowflake, request: CreateAppealRequest) -> ServiceResult<AppealResponse> {
        let user = self.ctx.load_user(user_id).await?;

        let subject_id = match request.kind {
            AppealKind::Account => {
                if user.status == UserStatus::Active {
                    return Err(ServiceError::validation("Account is in good standing"));
                }
                None
            }
            AppealKind::Content => Some(
                request
                    .subject_id
                    .ok_or_else(|| ServiceError::validation("Content appeals need a subject_id"))?,
            ),
        };

        if self.ctx.appeal_repo().has_pending(user_id, request.kind, subject_id).await? {
            return Err(DomainError::DuplicateAppeal.into());
        }

        let appeal = Appeal {
            id: self.ctx.generate_id(),
            user_id,
            kind: request.kind,
            subject_id,
            message: request.message.trim().to_string(),
            status: AppealStatus::Pending,
            reviewer_id: None,
            decision_note: None,
            created_at: Utc::now(),
            decided_at: None,
        };
        self.ctx.appeal_repo().create(&appeal).await?;

        info!(appeal_id = %appeal.id, kind = appeal.kind.as_str(), "Appeal filed");
        Ok(AppealResponse::from(appeal))
    }

    pub async fn my_appeals(&self, user_id: Snowflake) -> ServiceResult<Vec<AppealResponse>> {
        let appeals = self.ctx.appeal_repo().list_by_user(user_id).await?;
        Ok(appeals.into_iter().map(AppealResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn list_appeals(&self, staff_id: Snowflake, query: AppealListQuery) -> ServiceResult<Vec<AppealResponse>> {
        self.ctx.staff_user(staff_id).await?;
        let appeals = self
            .ctx
            .appeal_repo()
            .list(query.status, CursorQuery::new(query.before, None, query.limit))
            .await?;
        Ok(appeals.into_iter().map(AppealResponse::from).collect())
    }

    /// Approve or deny an appeal; an approved account appeal reinstates the user
    #[instrument(skip(self, request))]
    pub async fn decide_appeal(
        &self,
        staff_id: Snowflake,
        appeal_id: Snowflake,
        request: DecideAppealRequest,
    ) -> ServiceResult<AppealResponse> {
        let actor = self.ctx.staff_user(staff_id).await?;
        if request.status == AppealStatus::Pending {
            return Err(ServiceError::validation("An appeal can only be approved or denied"));
        }

        let mut appeal = self
            .ctx
            .appeal_repo()
            .find_by_id(appeal_id)
            .await?
            .ok_or(DomainError::AppealNotFound(appeal_id))?;
        if !appeal.is_pending() {
            return Err(ServiceError::conflict("Appeal is already decided"));
        }
        if appeal.user_id == staff_id {
            return Err(DomainError::CannotTargetSelf.into());
        }

        if request.status == AppealStatus::Approved && appeal.kind == AppealKind::Account {
            let mut user = self.moderation_target(&actor, appeal.user_id).await?;
            if user.status != UserStatus::Active {
                user.reinstate();
                self.ctx.user_repo().update(&user).await?;
                info!(user_id = %user.id, "Account reinstated on appeal");
            }
        }

        appeal.status = request.status;
        appeal.reviewer_id = Some(staff_id);
        appeal.decision_note = request.note;
        appeal.decided_at = Some(Utc::now());
        self.ctx.appeal_repo().decide(&appeal).await?;

        record_audit(
            self.ctx,
            staff_id,
            "appeal.decide",
            "appeal",
            Some(appeal_id),
            json!({ "status": appeal.status.as_str(), "kind": appeal.kind.as_str(), "user_id": appeal.user_id }),
        )
        .await?;

        let body = match appeal.status {
            AppealStatus::Approved => "Your appeal was approved".to_string(),
            _ => "Your appeal was denied".to_string(),
        };
        self.notify(appeal.user_id, staff_id, body, json!({ "appeal_id": appeal_id })).await;

        Ok(AppealResponse::from(appeal))
    }

    // =========================================================================
    // Audit log
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn list_audit(
        &self,
        staff_id: Snowflake,
        params: PageParams,
    ) -> ServiceResult<PagedResponse<AuditEntryResponse>> {
        self.ctx.staff_user(staff_id).await?;
        let page = params.into();
        let (entries, total) = self.ctx.audit_repo().list(page).await?;
        if entries.is_empty() && total > 0 {
            warn!(page = page.page, total, "Audit page past the end");
        }

        Ok(PagedResponse {
            items: entries.into_iter().map(AuditEntryResponse::from).collect(),
            page: page.page,
            per_page: page.per_page,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::RefreshTokenRequest;
    use crate::services::auth::AuthService;
    use crate::services::test_support::{context, create_staff, create_user};
    use dreamx_core::{Post, UserRole};

    fn report_request(subject_type: ReportSubject, subject_id: Snowflake) -> CreateReportRequest {
        CreateReportRequest { subject_type, subject_id, reason: "spam".into(), details: None }
    }

    #[tokio::test]
    async fn test_block_is_idempotent_and_not_self() {
        let ctx = context().await;
        let ana = create_user(&ctx, "ana").await;
        let bo = create_user(&ctx, "bo").await;
        let moderation = ModerationService::new(&ctx);

        moderation.block(ana.id, bo.id).await.unwrap();
        moderation.block(ana.id, bo.id).await.unwrap();
        assert_eq!(moderation.list_blocks(ana.id).await.unwrap().len(), 1);
        assert!(ctx.block_repo().is_blocked_either(bo.id, ana.id).await.unwrap());

        let err = moderation.block(ana.id, ana.id).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        moderation.unblock(ana.id, bo.id).await.unwrap();
        assert!(moderation.list_blocks(ana.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_report_lifecycle() {
        let ctx = context().await;
        let ana = create_user(&ctx, "ana").await;
        let bo = create_user(&ctx, "bo").await;
        let mo = create_staff(&ctx, "mo", UserRole::Moderator).await;
        let moderation = ModerationService::new(&ctx);

        let post = Post::new(ctx.generate_id(), bo.id, "buy pills".into(), None);
        ctx.post_repo().create(&post).await.unwrap();

        let report = moderation.report(ana.id, report_request(ReportSubject::Post, post.id)).await.unwrap();
        let err = moderation.report(ana.id, report_request(ReportSubject::Post, post.id)).await.unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_REPORT");

        let err = moderation
            .report(ana.id, report_request(ReportSubject::Comment, Snowflake::new(1)))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);

        assert_eq!(moderation.list_reports(ana.id, ReportListQuery::default()).await.unwrap_err().status_code(), 403);

        let open = moderation
            .list_reports(mo.id, ReportListQuery { status: Some(ReportStatus::Open), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(open.len(), 1);

        let resolved = moderation
            .resolve_report(mo.id, report.id, ResolveReportRequest { status: ReportStatus::Resolved, note: Some("removed".into()) })
            .await
            .unwrap();
        assert_eq!(resolved.reviewer_id, Some(mo.id));

        let again = moderation
            .resolve_report(mo.id, report.id, ResolveReportRequest { status: ReportStatus::Dismissed, note: None })
            .await
            .unwrap_err();
        assert_eq!(again.status_code(), 409);

        let inbox = ctx.notification_repo().list(ana.id, CursorQuery::default(), false).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationKind::Moderation);

        let audit = moderation.list_audit(mo.id, PageParams::default()).await.unwrap();
        assert_eq!(audit.total, 1);
        assert_eq!(audit.items[0].action, "report.resolve");

        // a closed report no longer blocks a new one
        moderation.report(ana.id, report_request(ReportSubject::Post, post.id)).await.unwrap();
    }

    #[tokio::test]
    async fn test_staff_guards() {
        let ctx = context().await;
        let mo = create_staff(&ctx, "mo", UserRole::Moderator).await;
        let admin = create_staff(&ctx, "root", UserRole::Admin).await;
        let ana = create_user(&ctx, "ana").await;
        let moderation = ModerationService::new(&ctx);

        let suspend = || SuspendUserRequest { until: None, reason: "spam".into() };

        assert_eq!(moderation.suspend_user(ana.id, mo.id, suspend()).await.unwrap_err().status_code(), 403);
        assert_eq!(moderation.suspend_user(mo.id, mo.id, suspend()).await.unwrap_err().status_code(), 400);
        assert_eq!(moderation.suspend_user(mo.id, admin.id, suspend()).await.unwrap_err().status_code(), 403);

        let past = SuspendUserRequest { until: Some(Utc::now() - chrono::Duration::hours(1)), reason: "x".into() };
        assert_eq!(moderation.suspend_user(mo.id, ana.id, past).await.unwrap_err().status_code(), 400);

        let err = moderation
            .set_role(mo.id, ana.id, SetRoleRequest { role: UserRole::Moderator })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
        let promoted = moderation
            .set_role(admin.id, ana.id, SetRoleRequest { role: UserRole::Moderator })
            .await
            .unwrap();
        assert_eq!(promoted.role, UserRole::Moderator);
    }

    #[tokio::test]
    async fn test_suspension_blocks_writes_until_lifted() {
        let ctx = context().await;
        let mo = create_staff(&ctx, "mo", UserRole::Moderator).await;
        let ana = create_user(&ctx, "ana").await;
        let moderation = ModerationService::new(&ctx);

        let until = Utc::now() + chrono::Duration::days(1);
        let suspended = moderation
            .suspend_user(mo.id, ana.id, SuspendUserRequest { until: Some(until), reason: "spam".into() })
            .await
            .unwrap();
        assert_eq!(suspended.status, UserStatus::Suspended);

        let err = ctx.acting_user(ana.id).await.unwrap_err();
        assert_eq!(err.error_code(), "ACCOUNT_SUSPENDED");

        moderation.unsuspend_user(mo.id, ana.id).await.unwrap();
        ctx.acting_user(ana.id).await.unwrap();
        assert_eq!(moderation.unsuspend_user(mo.id, ana.id).await.unwrap_err().status_code(), 409);
    }

    #[tokio::test]
    async fn test_ban_revokes_sessions() {
        let ctx = context().await;
        let mo = create_staff(&ctx, "mo", UserRole::Moderator).await;
        let ana = create_user(&ctx, "ana").await;

        let session = AuthService::new(&ctx).complete_login(ana.clone()).await.unwrap();
        ModerationService::new(&ctx)
            .ban_user(mo.id, ana.id, BanUserRequest { reason: "fraud".into() })
            .await
            .unwrap();

        let err = AuthService::new(&ctx)
            .refresh_tokens(RefreshTokenRequest { refresh_token: session.refresh_token })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 401);

        let (audit, _) = ctx.audit_repo().list(dreamx_core::PageQuery::default()).await.unwrap();
        assert_eq!(audit[0].action, "user.ban");
    }

    #[tokio::test]
    async fn test_account_appeal_reinstates() {
        let ctx = context().await;
        let mo = create_staff(&ctx, "mo", UserRole::Moderator).await;
        let ana = create_user(&ctx, "ana").await;
        let moderation = ModerationService::new(&ctx);

        let appeal = || CreateAppealRequest { kind: AppealKind::Account, subject_id: None, message: "sorry".into() };
        assert_eq!(moderation.create_appeal(ana.id, appeal()).await.unwrap_err().status_code(), 400);

        moderation
            .suspend_user(mo.id, ana.id, SuspendUserRequest { until: None, reason: "spam".into() })
            .await
            .unwrap();
        let filed = moderation.create_appeal(ana.id, appeal()).await.unwrap();
        assert_eq!(moderation.create_appeal(ana.id, appeal()).await.unwrap_err().error_code(), "DUPLICATE_APPEAL");

        let pending = moderation
            .list_appeals(mo.id, AppealListQuery { status: Some(AppealStatus::Pending), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);

        let decided = moderation
            .decide_appeal(mo.id, filed.id, DecideAppealRequest { status: AppealStatus::Approved, note: None })
            .await
            .unwrap();
        assert_eq!(decided.status, AppealStatus::Approved);
        assert_eq!(ctx.load_user(ana.id).await.unwrap().status, UserStatus::Active);
        assert_eq!(moderation.my_appeals(ana.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_content_appeal_needs_subject() {
        let ctx = context().await;
        let ana = create_user(&ctx, "ana").await;
        let moderation = ModerationService::new(&ctx);

        let err = moderation
            .create_appeal(ana.id, CreateAppealRequest { kind: AppealKind::Content, subject_id: None, message: "x".into() })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);

        moderation
            .create_appeal(
                ana.id,
                CreateAppealRequest { kind: AppealKind::Content, subject_id: Some(Snowflake::new(9)), message: "x".into() },
            )
            .await
            .unwrap();
    }
}
