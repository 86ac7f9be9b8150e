//! Service context - dependency container for services
//!
//! Holds all repositories, the realtime bus, outbound integrations, and the
//! notification delivery queue needed by services.

use std::sync::Arc;

use chrono::Utc;
use dreamx_common::{AppConfig, JwtService};
use dreamx_core::traits::{
    AppealRepository, AuditRepository, AuthChallengeRepository, BlockRepository,
    CommentRepository, ConversationRepository, InvoiceRepository, MessageRepository,
    NotificationRepository, OAuthAccountRepository, OrderRepository, PaymentCustomerRepository,
    PaymentEventRepository, PaymentMethodRepository, PostRepository, PushSubscriptionRepository,
    ReactionRepository, RefreshTokenRepository, ReportRepository, ReviewRepository,
    ServiceListingRepository, SubscriptionRepository, UserRepository,
    WebAuthnCredentialRepository,
};
use dreamx_core::{
    DomainEvent, Mailer, PaymentProcessor, PushSender, Snowflake, SnowflakeGenerator, User,
};
use dreamx_db::{
    SqliteAppealRepository, SqliteAuditRepository, SqliteAuthChallengeRepository,
    SqliteBlockRepository, SqliteCommentRepository, SqliteConversationRepository,
    SqliteInvoiceRepository, SqliteMessageRepository, SqliteNotificationRepository,
    SqliteOAuthAccountRepository, SqliteOrderRepository, SqlitePaymentCustomerRepository,
    SqlitePaymentEventRepository, SqlitePaymentMethodRepository, SqlitePool, SqlitePostRepository,
    SqlitePushSubscriptionRepository, SqliteReactionRepository, SqliteRefreshTokenRepository,
    SqliteReportRepository, SqliteReviewRepository, SqliteServiceListingRepository,
    SqliteSubscriptionRepository, SqliteUserRepository, SqliteWebAuthnCredentialRepository,
};
use dreamx_integrations::IdentityProviders;
use dreamx_realtime::{BusMessage, EventBus, Room};
use tracing::warn;

use super::delivery::{DeliveryJob, DeliveryWorker, NotificationQueue};
use super::error::{ServiceError, ServiceResult};

/// Every repository the services use
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub oauth_accounts: Arc<dyn OAuthAccountRepository>,
    pub webauthn_credentials: Arc<dyn WebAuthnCredentialRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    pub challenges: Arc<dyn AuthChallengeRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub reactions: Arc<dyn ReactionRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub push_subscriptions: Arc<dyn PushSubscriptionRepository>,
    pub services: Arc<dyn ServiceListingRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub payment_methods: Arc<dyn PaymentMethodRepository>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub payment_customers: Arc<dyn PaymentCustomerRepository>,
    pub payment_events: Arc<dyn PaymentEventRepository>,
    pub blocks: Arc<dyn BlockRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub audit: Arc<dyn AuditRepository>,
    pub appeals: Arc<dyn AppealRepository>,
}

impl Repositories {
    /// SQLite implementations sharing one pool
    pub fn sqlite(pool: &SqlitePool) -> Self {
        Self {
            users: Arc::new(SqliteUserRepository::new(pool.clone())),
            oauth_accounts: Arc::new(SqliteOAuthAccountRepository::new(pool.clone())),
            webauthn_credentials: Arc::new(SqliteWebAuthnCredentialRepository::new(pool.clone())),
            refresh_tokens: Arc::new(SqliteRefreshTokenRepository::new(pool.clone())),
            challenges: Arc::new(SqliteAuthChallengeRepository::new(pool.clone())),
            posts: Arc::new(SqlitePostRepository::new(pool.clone())),
            comments: Arc::new(SqliteCommentRepository::new(pool.clone())),
            reactions: Arc::new(SqliteReactionRepository::new(pool.clone())),
            conversations: Arc::new(SqliteConversationRepository::new(pool.clone())),
            messages: Arc::new(SqliteMessageRepository::new(pool.clone())),
            notifications: Arc::new(SqliteNotificationRepository::new(pool.clone())),
            push_subscriptions: Arc::new(SqlitePushSubscriptionRepository::new(pool.clone())),
            services: Arc::new(SqliteServiceListingRepository::new(pool.clone())),
            orders: Arc::new(SqliteOrderRepository::new(pool.clone())),
            reviews: Arc::new(SqliteReviewRepository::new(pool.clone())),
            subscriptions: Arc::new(SqliteSubscriptionRepository::new(pool.clone())),
            payment_methods: Arc::new(SqlitePaymentMethodRepository::new(pool.clone())),
            invoices: Arc::new(SqliteInvoiceRepository::new(pool.clone())),
            payment_customers: Arc::new(SqlitePaymentCustomerRepository::new(pool.clone())),
            payment_events: Arc::new(SqlitePaymentEventRepository::new(pool.clone())),
            blocks: Arc::new(SqliteBlockRepository::new(pool.clone())),
            reports: Arc::new(SqliteReportRepository::new(pool.clone())),
            audit: Arc::new(SqliteAuditRepository::new(pool.clone())),
            appeals: Arc::new(SqliteAppealRepository::new(pool.clone())),
        }
    }
}

/// Service context containing all dependencies
///
/// This is the main dependency container that gets passed to all services.
/// It provides access to:
/// - Database repositories
/// - JWT service and Snowflake generator
/// - The realtime event bus
/// - Payment processor, identity providers, mailer and push sender
/// - The notification delivery queue
#[derive(Clone)]
pub struct ServiceContext {
    pool: SqlitePool,
    repos: Repositories,
    jwt_service: Arc<JwtService>,
    snowflake_generator: Arc<SnowflakeGenerator>,
    event_bus: Arc<dyn EventBus>,
    payments: Arc<dyn PaymentProcessor>,
    identity_providers: IdentityProviders,
    mailer: Arc<dyn Mailer>,
    push_sender: Option<Arc<dyn PushSender>>,
    notifications: NotificationQueue,
    config: Arc<AppConfig>,
}

impl ServiceContext {
    // === Database Pool ===

    /// Get the SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // === Repositories ===

    pub fn user_repo(&self) -> &dyn UserRepository {
        self.repos.users.as_ref()
    }

    pub fn oauth_account_repo(&self) -> &dyn OAuthAccountRepository {
        self.repos.oauth_accounts.as_ref()
    }

    pub fn webauthn_repo(&self) -> &dyn WebAuthnCredentialRepository {
        self.repos.webauthn_credentials.as_ref()
    }

    pub fn refresh_token_repo(&self) -> &dyn RefreshTokenRepository {
        self.repos.refresh_tokens.as_ref()
    }

    pub fn challenge_repo(&self) -> &dyn AuthChallengeRepository {
        self.repos.challenges.as_ref()
    }

    pub fn post_repo(&self) -> &dyn PostRepository {
        self.repos.posts.as_ref()
    }

    pub fn comment_repo(&self) -> &dyn CommentRepository {
        self.repos.comments.as_ref()
    }

    pub fn reaction_repo(&self) -> &dyn ReactionRepository {
        self.repos.reactions.as_ref()
    }

    pub fn conversation_repo(&self) -> &dyn ConversationRepository {
        self.repos.conversations.as_ref()
    }

    pub fn message_repo(&self) -> &dyn MessageRepository {
        self.repos.messages.as_ref()
    }

    pub fn notification_repo(&self) -> &dyn NotificationRepository {
        self.repos.notifications.as_ref()
    }

    pub fn push_subscription_repo(&self) -> &dyn PushSubscriptionRepository {
        self.repos.push_subscriptions.as_ref()
    }

    pub fn service_repo(&self) -> &dyn ServiceListingRepository {
        self.repos.services.as_ref()
    }

    pub fn order_repo(&self) -> &dyn OrderRepository {
        self.repos.orders.as_ref()
    }

    pub fn review_repo(&self) -> &dyn ReviewRepository {
        self.repos.reviews.as_ref()
    }

    pub fn subscription_repo(&self) -> &dyn SubscriptionRepository {
        self.repos.subscriptions.as_ref()
    }

    pub fn payment_method_repo(&self) -> &dyn PaymentMethodRepository {
        self.repos.payment_methods.as_ref()
    }

    pub fn invoice_repo(&self) -> &dyn InvoiceRepository {
        self.repos.invoices.as_ref()
    }

    pub fn payment_customer_repo(&self) -> &dyn PaymentCustomerRepository {
        self.repos.payment_customers.as_ref()
    }

    pub fn payment_event_repo(&self) -> &dyn PaymentEventRepository {
        self.repos.payment_events.as_ref()
    }

    pub fn block_repo(&self) -> &dyn BlockRepository {
        self.repos.blocks.as_ref()
    }

    pub fn report_repo(&self) -> &dyn ReportRepository {
        self.repos.reports.as_ref()
    }

    pub fn audit_repo(&self) -> &dyn AuditRepository {
        self.repos.audit.as_ref()
    }

    pub fn appeal_repo(&self) -> &dyn AppealRepository {
        self.repos.appeals.as_ref()
    }

    // === Realtime ===

    pub fn event_bus(&self) -> &dyn EventBus {
        self.event_bus.as_ref()
    }

    /// Publish an event to the rooms of `user_ids`; failures are logged
    pub async fn publish_to_users(&self, user_ids: &[Snowflake], event: &DomainEvent) {
        let payload = event.payload();
        for user_id in user_ids {
            let message = BusMessage::new(Room::user(*user_id), event.event_type(), payload.clone());
            if let Err(e) = self.event_bus.publish(message).await {
                warn!(error = %e, event = event.event_type(), "Realtime publish failed");
            }
        }
    }

    // === Integrations ===

    pub fn payments(&self) -> &dyn PaymentProcessor {
        self.payments.as_ref()
    }

    pub fn identity_providers(&self) -> &IdentityProviders {
        &self.identity_providers
    }

    pub fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    pub fn push_sender(&self) -> Option<&dyn PushSender> {
        self.push_sender.as_deref()
    }

    /// Queue for notification fan-out and transactional mail
    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn enqueue(&self, job: DeliveryJob) -> bool {
        self.notifications.enqueue(job)
    }

    // === Services ===

    /// Get the JWT service
    pub fn jwt_service(&self) -> &JwtService {
        self.jwt_service.as_ref()
    }

    /// Get the snowflake ID generator
    pub fn snowflake_generator(&self) -> &SnowflakeGenerator {
        self.snowflake_generator.as_ref()
    }

    /// Generate a new Snowflake ID
    pub fn generate_id(&self) -> Snowflake {
        self.snowflake_generator.generate()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    // === Actors ===

    pub async fn load_user(&self, user_id: Snowflake) -> ServiceResult<User> {
        self.user_repo()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id.to_string()))
    }

    /// Load a user about to change state; banned and suspended accounts are refused
    pub async fn acting_user(&self, user_id: Snowflake) -> ServiceResult<User> {
        let user = self.load_user(user_id).await?;
        user.ensure_can_act(Utc::now())?;
        Ok(user)
    }

    /// Acting user who must be a moderator or admin
    pub async fn staff_user(&self, user_id: Snowflake) -> ServiceResult<User> {
        let user = self.acting_user(user_id).await?;
        if !user.is_staff() {
            return Err(ServiceError::permission_denied("staff"));
        }
        Ok(user)
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("pool", &"SqlitePool")
            .field("repositories", &"...")
            .field("event_bus", &self.event_bus.name())
            .field("payments", &self.payments.provider())
            .field("push", &self.push_sender.is_some())
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
#[derive(Default)]
pub struct ServiceContextBuilder {
    pool: Option<SqlitePool>,
    repos: Option<Repositories>,
    jwt_service: Option<Arc<JwtService>>,
    snowflake_generator: Option<Arc<SnowflakeGenerator>>,
    event_bus: Option<Arc<dyn EventBus>>,
    payments: Option<Arc<dyn PaymentProcessor>>,
    identity_providers: IdentityProviders,
    mailer: Option<Arc<dyn Mailer>>,
    push_sender: Option<Arc<dyn PushSender>>,
    config: Option<Arc<AppConfig>>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool(mut self, pool: SqlitePool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Override the repositories; defaults to SQLite on `pool`
    pub fn repositories(mut self, repos: Repositories) -> Self {
        self.repos = Some(repos);
        self
    }

    pub fn jwt_service(mut self, service: Arc<JwtService>) -> Self {
        self.jwt_service = Some(service);
        self
    }

    pub fn snowflake_generator(mut self, generator: Arc<SnowflakeGenerator>) -> Self {
        self.snowflake_generator = Some(generator);
        self
    }

    pub fn event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn payments(mut self, processor: Arc<dyn PaymentProcessor>) -> Self {
        self.payments = Some(processor);
        self
    }

    pub fn identity_providers(mut self, providers: IdentityProviders) -> Self {
        self.identity_providers = providers;
        self
    }

    pub fn mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn push_sender(mut self, sender: Option<Arc<dyn PushSender>>) -> Self {
        self.push_sender = sender;
        self
    }

    pub fn config(mut self, config: Arc<AppConfig>) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the ServiceContext and start the delivery worker
    ///
    /// Must run inside a Tokio runtime. The worker stops once every clone of
    /// the context is dropped.
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any required dependency is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        let pool = self.pool.ok_or_else(|| ServiceError::validation("pool is required"))?;
        let config = self.config.ok_or_else(|| ServiceError::validation("config is required"))?;
        let event_bus = self
            .event_bus
            .ok_or_else(|| ServiceError::validation("event_bus is required"))?;
        let payments = self
            .payments
            .ok_or_else(|| ServiceError::validation("payments is required"))?;
        let mailer = self.mailer.ok_or_else(|| ServiceError::validation("mailer is required"))?;

        let repos = self.repos.unwrap_or_else(|| Repositories::sqlite(&pool));
        let jwt_service = self.jwt_service.unwrap_or_else(|| {
            Arc::new(JwtService::new(
                &config.jwt.secret,
                config.jwt.access_token_expiry,
                config.jwt.refresh_token_expiry,
            ))
        });
        let snowflake_generator = self
            .snowflake_generator
            .unwrap_or_else(|| Arc::new(SnowflakeGenerator::new(config.snowflake.worker_id)));

        let (notifications, rx) = NotificationQueue::new(config.realtime.queue_capacity);
        DeliveryWorker::new(
            rx,
            Arc::clone(&repos.users),
            Arc::clone(&repos.push_subscriptions),
            Arc::clone(&event_bus),
            self.push_sender.clone(),
            Arc::clone(&mailer),
            config.app.public_url.clone(),
        )
        .spawn();

        Ok(ServiceContext {
            pool,
            repos,
            jwt_service,
            snowflake_generator,
            event_bus,
            payments,
            identity_providers: self.identity_providers,
            mailer,
            push_sender: self.push_sender,
            notifications,
            config,
        })
    }
}
