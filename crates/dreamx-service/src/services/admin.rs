//! Admin service
//!
//! Startup admin seeding, the paged user directory for staff screens and
//! site-wide counters.

use std::collections::BTreeMap;

use dreamx_common::auth::{hash_password, validate_password_strength};
use dreamx_core::{DomainError, PageQuery, Snowflake, User, UserFilter, UserRole};
use tracing::{info, instrument};

use crate::dto::{AdminUserResponse, PagedResponse, StatsResponse, UserListQuery};

use super::auth::normalize_email;
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Admin service
pub struct AdminService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AdminService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Promote or create the configured admin account
    ///
    /// Returns the admin's id, or `None` when no seed is configured.
    #[instrument(skip(self))]
    pub async fn seed_admin(&self) -> ServiceResult<Option<Snowflake>> {
        let Some(seed) = self.ctx.config().admin.seed.clone() else {
            return Ok(None);
        };
        let email = normalize_email(&seed.email);

        if let Some(mut user) = self.ctx.user_repo().find_by_email(&email).await? {
            if !user.is_admin() {
                user.role = UserRole::Admin;
                self.ctx.user_repo().update(&user).await?;
                info!(user_id = %user.id, "Existing user promoted to admin");
            }
            return Ok(Some(user.id));
        }

        let username = seed.username.trim().to_string();
        if self.ctx.user_repo().username_exists(&username).await? {
            return Err(DomainError::UsernameAlreadyExists.into());
        }
        validate_password_strength(&seed.password)?;
        let password_hash = hash_password(&seed.password)?;

        let mut user = User::new(self.ctx.generate_id(), username.clone(), email, username);
        user.role = UserRole::Admin;
        user.email_verified = true;
        self.ctx.user_repo().create(&user, Some(&password_hash)).await?;

        info!(user_id = %user.id, "Admin account created");
        Ok(Some(user.id))
    }

    /// Paged user directory; moderators need it to find accounts
    #[instrument(skip(self, query))]
    pub async fn list_users(&self, staff_id: Snowflake, query: UserListQuery) -> ServiceResult<PagedResponse<AdminUserResponse>> {
        self.ctx.staff_user(staff_id).await?;

        let page = PageQuery::new(query.page, query.per_page);
        let filter = UserFilter {
            q: query.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
            status: query.status,
            role: query.role,
        };
        let (users, total) = self.ctx.user_repo().list(&filter, page).await?;

        Ok(PagedResponse {
            items: users.iter().map(AdminUserResponse::from).collect(),
            page: page.page,
            per_page: page.per_page,
            total,
        })
    }

    #[instrument(skip(self))]
    pub async fn stats(&self, admin_id: Snowflake) -> ServiceResult<StatsResponse> {
        let admin = self.ctx.load_user(admin_id).await?;
        if !admin.is_admin() {
            return Err(ServiceError::permission_denied("Admin only"));
        }

        let users_by_status: BTreeMap<String, i64> = self
            .ctx
            .user_repo()
            .count_by_status()
            .await?
            .into_iter()
            .map(|(status, count)| (status.as_str().to_string(), count))
            .collect();
        let orders_by_status: BTreeMap<String, i64> = self
            .ctx
            .order_repo()
            .count_by_status()
            .await?
            .into_iter()
            .map(|(status, count)| (status.as_str().to_string(), count))
            .collect();

        Ok(StatsResponse {
            users_by_status,
            posts: self.ctx.post_repo().count().await?,
            messages: self.ctx.message_repo().count().await?,
            open_reports: self.ctx.report_repo().count_open().await?,
            pending_appeals: self.ctx.appeal_repo().count_pending().await?,
            active_subscriptions: self.ctx.subscription_repo().count_live().await?,
            orders_by_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::{LoginRequest, SubscribeRequest};
    use crate::services::auth::AuthService;
    use crate::services::billing::BillingService;
    use crate::services::test_support::{create_staff, create_user, harness, harness_with, test_config};
    use dreamx_core::UserStatus;

    const SEED: &[(&str, &str)] = &[
        ("ADMIN_EMAIL", "Root@Example.com"),
        ("ADMIN_USERNAME", "root"),
        ("ADMIN_PASSWORD", "Sup3rSecretPass"),
    ];

    #[tokio::test]
    async fn test_seed_creates_admin_once() {
        let h = harness_with(test_config(SEED)).await;
        let admin = AdminService::new(&h.ctx);

        let id = admin.seed_admin().await.unwrap().unwrap();
        assert_eq!(admin.seed_admin().await.unwrap(), Some(id));

        let user = h.ctx.load_user(id).await.unwrap();
        assert!(user.is_admin());
        assert_eq!(user.email, "root@example.com");

        let auth = AuthService::new(&h.ctx)
            .login(LoginRequest { login: "root".into(), password: "Sup3rSecretPass".into() })
            .await
            .unwrap();
        assert_eq!(auth.user.id, id);
    }

    #[tokio::test]
    async fn test_seed_promotes_existing_user() {
        let h = harness_with(test_config(&[
            ("ADMIN_EMAIL", "ana@example.com"),
            ("ADMIN_PASSWORD", "Sup3rSecretPass"),
        ]))
        .await;
        let ana = create_user(&h.ctx, "ana").await;

        let id = AdminService::new(&h.ctx).seed_admin().await.unwrap();
        assert_eq!(id, Some(ana.id));
        assert!(h.ctx.load_user(ana.id).await.unwrap().is_admin());
    }

    #[tokio::test]
    async fn test_seed_unset_is_noop() {
        let h = harness().await;
        assert_eq!(AdminService::new(&h.ctx).seed_admin().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_users_filters_and_pages() {
        let h = harness().await;
        let mo = create_staff(&h.ctx, "mo", UserRole::Moderator).await;
        for name in ["ana", "anabel", "bo"] {
            create_user(&h.ctx, name).await;
        }
        let mut banned = create_user(&h.ctx, "zed").await;
        banned.ban("spam".into());
        h.ctx.user_repo().update(&banned).await.unwrap();

        let admin = AdminService::new(&h.ctx);
        let all = admin.list_users(mo.id, UserListQuery { per_page: Some(2), ..Default::default() }).await.unwrap();
        assert_eq!(all.total, 5);
        assert_eq!(all.items.len(), 2);
        assert_eq!(all.per_page, 2);

        let found = admin
            .list_users(mo.id, UserListQuery { q: Some("ana".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(found.total, 2);

        let banned_only = admin
            .list_users(mo.id, UserListQuery { status: Some(UserStatus::Banned), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(banned_only.items.len(), 1);
        assert_eq!(banned_only.items[0].username, "zed");

        let ana = create_user(&h.ctx, "plain").await;
        let err = admin.list_users(ana.id, UserListQuery::default()).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let h = harness().await;
        let root = create_staff(&h.ctx, "root", UserRole::Admin).await;
        let mo = create_staff(&h.ctx, "mo", UserRole::Moderator).await;
        let ana = create_user(&h.ctx, "ana").await;
        BillingService::new(&h.ctx)
            .subscribe(ana.id, SubscribeRequest { plan: "premium".into(), payment_method_id: None })
            .await
            .unwrap();

        let stats = AdminService::new(&h.ctx).stats(root.id).await.unwrap();
        assert_eq!(stats.users_by_status.get("active"), Some(&3));
        assert_eq!(stats.active_subscriptions, 1);
        assert_eq!(stats.posts, 0);
        assert_eq!(stats.open_reports, 0);

        let err = AdminService::new(&h.ctx).stats(mo.id).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
    }
}
