//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{
    Appeal, AppealKind, AppealStatus, AuditEntry, AuthChallenge, Block, ChallengePurpose, Comment,
    Conversation, ConversationMember, Invoice, Message, Notification, OAuthAccount, OAuthProvider,
    OrderStatus, PaymentCustomer, PaymentMethod, PaymentProvider, Post, PushSubscription,
    RatingSummary, RefreshToken, Report, ReportStatus, ServiceListing, ServiceOrder,
    ServiceReview, ServiceStatus, Subscription, User, UserRole, UserStatus, WebAuthnCredential,
};
use crate::error::DomainError;
use crate::value_objects::{ReactionKind, ReactionSummary, ReactionTarget, ReactionToggle, Snowflake};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Pagination
// ============================================================================

/// Default and maximum page size for cursor lists
pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 100;

/// Cursor pagination over Snowflake ids
#[derive(Debug, Clone, Copy)]
pub struct CursorQuery {
    pub before: Option<Snowflake>,
    pub after: Option<Snowflake>,
    pub limit: i64,
}

impl CursorQuery {
    pub fn new(before: Option<Snowflake>, after: Option<Snowflake>, limit: Option<i64>) -> Self {
        Self {
            before,
            after,
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    pub fn latest(limit: i64) -> Self {
        Self::new(None, None, Some(limit))
    }
}

impl Default for CursorQuery {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

/// Page/offset pagination for admin screens
#[derive(Debug, Clone, Copy)]
pub struct PageQuery {
    pub page: i64,
    pub per_page: i64,
}

impl PageQuery {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(20).clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self::new(None, None)
    }
}

// ============================================================================
// User Repository
// ============================================================================

/// Filters for the admin user list
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub q: Option<String>,
    pub status: Option<UserStatus>,
    pub role: Option<UserRole>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<User>>;

    /// Find user by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    /// Find user by username (case-insensitive)
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;

    async fn email_exists(&self, email: &str) -> RepoResult<bool>;

    async fn username_exists(&self, username: &str) -> RepoResult<bool>;

    /// Create a new user; OAuth-only accounts have no password
    async fn create(&self, user: &User, password_hash: Option<&str>) -> RepoResult<()>;

    /// Persist profile, preference, role and status fields
    async fn update(&self, user: &User) -> RepoResult<()>;

    /// Get password hash for authentication
    async fn get_password_hash(&self, id: Snowflake) -> RepoResult<Option<String>>;

    async fn update_password(&self, id: Snowflake, password_hash: &str) -> RepoResult<()>;

    async fn touch_login(&self, id: Snowflake, at: DateTime<Utc>) -> RepoResult<()>;

    /// Prefix search on username or display name, banned users excluded
    async fn search(&self, q: &str, limit: i64) -> RepoResult<Vec<User>>;

    /// Paged list with total count
    async fn list(&self, filter: &UserFilter, page: PageQuery) -> RepoResult<(Vec<User>, i64)>;

    async fn count_by_status(&self) -> RepoResult<Vec<(UserStatus, i64)>>;
}

// ============================================================================
// Credential Repositories
// ============================================================================

#[async_trait]
pub trait OAuthAccountRepository: Send + Sync {
    async fn find(&self, provider: OAuthProvider, provider_user_id: &str) -> RepoResult<Option<OAuthAccount>>;

    async fn create(&self, account: &OAuthAccount) -> RepoResult<()>;

    async fn list_by_user(&self, user_id: Snowflake) -> RepoResult<Vec<OAuthAccount>>;
}

#[async_trait]
pub trait WebAuthnCredentialRepository: Send + Sync {
    async fn find_by_credential_id(&self, credential_id: &str) -> RepoResult<Option<WebAuthnCredential>>;

    async fn list_by_user(&self, user_id: Snowflake) -> RepoResult<Vec<WebAuthnCredential>>;

    async fn create(&self, credential: &WebAuthnCredential) -> RepoResult<()>;

    /// Store the new signature counter after a successful assertion
    async fn record_use(&self, id: Snowflake, sign_count: i64, at: DateTime<Utc>) -> RepoResult<()>;

    async fn delete(&self, id: Snowflake, user_id: Snowflake) -> RepoResult<()>;
}

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn create(&self, token: &RefreshToken) -> RepoResult<()>;

    async fn find_by_hash(&self, token_hash: &str) -> RepoResult<Option<RefreshToken>>;

    /// Revoke one token; false when it was already revoked
    async fn revoke(&self, id: Snowflake, at: DateTime<Utc>) -> RepoResult<bool>;

    async fn revoke_all_for_user(&self, user_id: Snowflake, at: DateTime<Utc>) -> RepoResult<u64>;
}

#[async_trait]
pub trait AuthChallengeRepository: Send + Sync {
    async fn create(&self, challenge: &AuthChallenge) -> RepoResult<()>;

    /// Delete and return a challenge; it can be redeemed only once
    async fn take(&self, token: &str, purpose: ChallengePurpose) -> RepoResult<Option<AuthChallenge>>;

    async fn purge_expired(&self, now: DateTime<Utc>) -> RepoResult<u64>;
}

// ============================================================================
// Feed Repositories
// ============================================================================

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Post>>;

    async fn create(&self, post: &Post) -> RepoResult<()>;

    async fn update(&self, post: &Post) -> RepoResult<()>;

    /// Delete a post with its comments and reactions
    async fn delete(&self, id: Snowflake) -> RepoResult<()>;

    /// Newest-first feed as seen by `viewer`
    ///
    /// Hides blocked and blocking authors, banned authors, and private
    /// profiles other than the viewer's own.
    async fn feed(&self, viewer: Snowflake, author: Option<Snowflake>, query: CursorQuery) -> RepoResult<Vec<Post>>;

    async fn count(&self) -> RepoResult<i64>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Comment>>;

    async fn create(&self, comment: &Comment) -> RepoResult<()>;

    /// Delete a comment and its direct replies
    async fn delete(&self, id: Snowflake) -> RepoResult<()>;

    /// Oldest-first comments of a post
    async fn list_by_post(&self, post_id: Snowflake, query: CursorQuery) -> RepoResult<Vec<Comment>>;

    async fn count_by_post(&self, post_id: Snowflake) -> RepoResult<i64>;
}

#[async_trait]
pub trait ReactionRepository: Send + Sync {
    /// Set, flip, or clear `user`'s reaction on a subject in one transaction
    async fn toggle(
        &self,
        target: ReactionTarget,
        subject_id: Snowflake,
        user_id: Snowflake,
        kind: &ReactionKind,
    ) -> RepoResult<ReactionToggle>;

    async fn summary(&self, target: ReactionTarget, subject_id: Snowflake) -> RepoResult<ReactionSummary>;

    async fn user_reaction(
        &self,
        target: ReactionTarget,
        subject_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<String>>;
}

// ============================================================================
// Messaging Repositories
// ============================================================================

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Conversation>>;

    /// Insert-or-get the direct conversation keyed by `candidate.direct_key`
    ///
    /// Both users become members. Returns the stored row and whether it was created.
    async fn get_or_create_direct(
        &self,
        candidate: &Conversation,
        a: Snowflake,
        b: Snowflake,
    ) -> RepoResult<(Conversation, bool)>;

    /// Create a group; the owner joins as `owner`, the rest as `member`
    async fn create_group(&self, conversation: &Conversation, members: &[Snowflake]) -> RepoResult<()>;

    /// Conversations of a user, most recently active first
    async fn list_for_user(&self, user_id: Snowflake, limit: i64) -> RepoResult<Vec<Conversation>>;

    async fn members(&self, conversation_id: Snowflake) -> RepoResult<Vec<ConversationMember>>;

    async fn find_member(&self, conversation_id: Snowflake, user_id: Snowflake) -> RepoResult<Option<ConversationMember>>;

    /// Add members, skipping existing ones; returns how many were added
    async fn add_members(&self, conversation_id: Snowflake, user_ids: &[Snowflake]) -> RepoResult<u64>;

    async fn remove_member(&self, conversation_id: Snowflake, user_id: Snowflake) -> RepoResult<()>;

    async fn rename(&self, conversation_id: Snowflake, name: &str, at: DateTime<Utc>) -> RepoResult<()>;

    /// Bump `updated_at`
    async fn touch(&self, conversation_id: Snowflake, at: DateTime<Utc>) -> RepoResult<()>;

    async fn mark_read(&self, conversation_id: Snowflake, user_id: Snowflake, at: DateTime<Utc>) -> RepoResult<()>;

    /// Messages from others newer than the member's `last_read_at`
    async fn unread_count(&self, conversation_id: Snowflake, user_id: Snowflake) -> RepoResult<i64>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Message>>;

    /// Newest-first page of a conversation
    async fn list(&self, conversation_id: Snowflake, query: CursorQuery) -> RepoResult<Vec<Message>>;

    async fn latest(&self, conversation_id: Snowflake) -> RepoResult<Option<Message>>;

    async fn create(&self, message: &Message) -> RepoResult<()>;

    async fn update(&self, message: &Message) -> RepoResult<()>;

    async fn delete(&self, id: Snowflake) -> RepoResult<()>;

    async fn count(&self) -> RepoResult<i64>;
}

// ============================================================================
// Notification Repositories
// ============================================================================

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &Notification) -> RepoResult<()>;

    /// Newest-first notifications of a user
    async fn list(&self, user_id: Snowflake, query: CursorQuery, unread_only: bool) -> RepoResult<Vec<Notification>>;

    async fn unread_count(&self, user_id: Snowflake) -> RepoResult<i64>;

    /// Mark one notification read; false when it does not belong to the user
    async fn mark_read(&self, id: Snowflake, user_id: Snowflake, at: DateTime<Utc>) -> RepoResult<bool>;

    async fn mark_all_read(&self, user_id: Snowflake, at: DateTime<Utc>) -> RepoResult<u64>;
}

#[async_trait]
pub trait PushSubscriptionRepository: Send + Sync {
    /// Insert or re-point a subscription, keyed by endpoint
    async fn upsert(&self, subscription: &PushSubscription) -> RepoResult<()>;

    async fn list_by_user(&self, user_id: Snowflake) -> RepoResult<Vec<PushSubscription>>;

    /// Delete by endpoint, optionally only when owned by `user_id`
    async fn delete_by_endpoint(&self, endpoint: &str, user_id: Option<Snowflake>) -> RepoResult<bool>;
}

// ============================================================================
// Marketplace Repositories
// ============================================================================

/// Listing search filters
#[derive(Debug, Clone, Default)]
pub struct ServiceFilter {
    pub category: Option<String>,
    pub q: Option<String>,
    pub seller_id: Option<Snowflake>,
    /// Also include non-active listings owned by this user
    pub owner_view: Option<Snowflake>,
}

#[async_trait]
pub trait ServiceListingRepository: Send + Sync {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<ServiceListing>>;

    async fn create(&self, service: &ServiceListing) -> RepoResult<()>;

    async fn update(&self, service: &ServiceListing) -> RepoResult<()>;

    async fn set_status(&self, id: Snowflake, status: ServiceStatus, at: DateTime<Utc>) -> RepoResult<()>;

    /// Newest-first listings
    async fn list(&self, filter: &ServiceFilter, query: CursorQuery) -> RepoResult<Vec<ServiceListing>>;

    async fn rating(&self, service_id: Snowflake) -> RepoResult<RatingSummary>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<ServiceOrder>>;

    async fn create(&self, order: &ServiceOrder) -> RepoResult<()>;

    /// Persist status, `updated_at` and `completed_at` if the stored status is still `from`
    async fn update_status(&self, order: &ServiceOrder, from: OrderStatus) -> RepoResult<()>;

    async fn list_for_buyer(&self, buyer_id: Snowflake, query: CursorQuery) -> RepoResult<Vec<ServiceOrder>>;

    async fn list_for_seller(&self, seller_id: Snowflake, query: CursorQuery) -> RepoResult<Vec<ServiceOrder>>;

    /// A completed order of `buyer_id` for the service, if any
    async fn find_completed(&self, service_id: Snowflake, buyer_id: Snowflake) -> RepoResult<Option<ServiceOrder>>;

    async fn count_by_status(&self) -> RepoResult<Vec<(OrderStatus, i64)>>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Insert a review; a second review of the same service conflicts
    async fn create(&self, review: &ServiceReview) -> RepoResult<()>;

    async fn find_by_reviewer(&self, service_id: Snowflake, reviewer_id: Snowflake) -> RepoResult<Option<ServiceReview>>;

    async fn list_by_service(&self, service_id: Snowflake, query: CursorQuery) -> RepoResult<Vec<ServiceReview>>;
}

// ============================================================================
// Billing Repositories
// ============================================================================

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn find_by_user(&self, user_id: Snowflake) -> RepoResult<Option<Subscription>>;

    async fn find_by_provider_id(&self, provider: PaymentProvider, provider_subscription_id: &str) -> RepoResult<Option<Subscription>>;

    /// Insert or replace the single subscription row of a user
    async fn upsert(&self, subscription: &Subscription) -> RepoResult<()>;

    async fn count_live(&self) -> RepoResult<i64>;
}

#[async_trait]
pub trait PaymentMethodRepository: Send + Sync {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<PaymentMethod>>;

    /// Default first, then newest
    async fn list_by_user(&self, user_id: Snowflake) -> RepoResult<Vec<PaymentMethod>>;

    /// Insert a method; the first one a user adds becomes the default.
    /// Returns the stored row.
    async fn create(&self, method: &PaymentMethod) -> RepoResult<PaymentMethod>;

    /// Move the default flag to `id` in one transaction
    async fn set_default(&self, user_id: Snowflake, id: Snowflake) -> RepoResult<()>;

    /// Delete a method; removing the default promotes the newest remaining one
    async fn remove(&self, user_id: Snowflake, id: Snowflake) -> RepoResult<()>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Invoices are append-only
    async fn append(&self, invoice: &Invoice) -> RepoResult<()>;

    async fn list_by_user(&self, user_id: Snowflake, query: CursorQuery) -> RepoResult<Vec<Invoice>>;
}

#[async_trait]
pub trait PaymentCustomerRepository: Send + Sync {
    async fn find(&self, user_id: Snowflake, provider: PaymentProvider) -> RepoResult<Option<PaymentCustomer>>;

    async fn find_by_customer_id(&self, provider: PaymentProvider, customer_id: &str) -> RepoResult<Option<PaymentCustomer>>;

    /// Insert the mapping; an existing mapping for the pair is kept
    async fn create(&self, customer: &PaymentCustomer) -> RepoResult<PaymentCustomer>;
}

#[async_trait]
pub trait PaymentEventRepository: Send + Sync {
    /// Record a webhook event id; false when it was already seen
    async fn record(&self, provider: PaymentProvider, event_id: &str, at: DateTime<Utc>) -> RepoResult<bool>;

    /// Drop a recorded event id so a redelivery is processed again
    async fn forget(&self, provider: PaymentProvider, event_id: &str) -> RepoResult<()>;
}

// ============================================================================
// Moderation Repositories
// ============================================================================

#[async_trait]
pub trait BlockRepository: Send + Sync {
    /// Idempotent
    async fn block(&self, blocker_id: Snowflake, blocked_id: Snowflake, at: DateTime<Utc>) -> RepoResult<()>;

    async fn unblock(&self, blocker_id: Snowflake, blocked_id: Snowflake) -> RepoResult<bool>;

    async fn list(&self, blocker_id: Snowflake) -> RepoResult<Vec<Block>>;

    /// Whether `blocker_id` has blocked `blocked_id`
    async fn has_blocked(&self, blocker_id: Snowflake, blocked_id: Snowflake) -> RepoResult<bool>;

    /// Whether either user has blocked the other
    async fn is_blocked_either(&self, a: Snowflake, b: Snowflake) -> RepoResult<bool>;
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Insert a report; a second open report of the same subject conflicts
    async fn create(&self, report: &Report) -> RepoResult<()>;

    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Report>>;

    async fn list(&self, status: Option<ReportStatus>, query: CursorQuery) -> RepoResult<Vec<Report>>;

    /// Persist status, reviewer, note and `resolved_at`
    async fn resolve(&self, report: &Report) -> RepoResult<()>;

    async fn count_open(&self) -> RepoResult<i64>;
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Audit entries are append-only
    async fn record(&self, entry: &AuditEntry) -> RepoResult<()>;

    /// Newest first, with total count
    async fn list(&self, page: PageQuery) -> RepoResult<(Vec<AuditEntry>, i64)>;
}

#[async_trait]
pub trait AppealRepository: Send + Sync {
    /// Insert an appeal; a second pending appeal on the same subject conflicts
    async fn create(&self, appeal: &Appeal) -> RepoResult<()>;

    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Appeal>>;

    async fn list(&self, status: Option<AppealStatus>, query: CursorQuery) -> RepoResult<Vec<Appeal>>;

    async fn list_by_user(&self, user_id: Snowflake) -> RepoResult<Vec<Appeal>>;

    async fn has_pending(&self, user_id: Snowflake, kind: AppealKind, subject_id: Option<Snowflake>) -> RepoResult<bool>;

    /// Persist status, reviewer, note and `decided_at`
    async fn decide(&self, appeal: &Appeal) -> RepoResult<()>;

    async fn count_pending(&self) -> RepoResult<i64>;
}
