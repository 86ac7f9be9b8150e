//! Response DTOs for API endpoints
//!
//! All response DTOs implement `Serialize` for JSON output.
//! Snowflake IDs are serialized as strings for JavaScript compatibility.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dreamx_core::{
    AppealKind, AppealStatus, ConversationKind, InvoiceStatus, MemberRole, MessagePolicy,
    NotificationKind, OrderStatus, PaymentProvider, ProfileVisibility, RatingSummary,
    ReactionSummary, ReportStatus, ReportSubject, ServiceStatus, Snowflake, SubscriptionStatus,
    UserRole, UserStatus,
};
use serde::Serialize;

// ============================================================================
// Common Response Types
// ============================================================================

/// Page-numbered list used by admin screens
#[derive(Debug, Serialize)]
pub struct PagedResponse<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

/// Public URL of a stored upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

// ============================================================================
// Auth Responses
// ============================================================================

/// Authentication response with tokens
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
    pub user: CurrentUserResponse,
}

#[derive(Debug, Serialize)]
pub struct WebAuthnRelyingParty {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct WebAuthnUserEntity {
    /// base64url user handle
    pub id: String,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct PubKeyCredParam {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub alg: i64,
}

/// `PublicKeyCredentialCreationOptions` for `navigator.credentials.create()`
#[derive(Debug, Serialize)]
pub struct RegistrationOptionsResponse {
    pub challenge: String,
    pub rp: WebAuthnRelyingParty,
    pub user: WebAuthnUserEntity,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    pub timeout: i64,
    pub exclude_credentials: Vec<String>,
    pub attestation: &'static str,
}

/// `PublicKeyCredentialRequestOptions` for `navigator.credentials.get()`
#[derive(Debug, Serialize)]
pub struct LoginOptionsResponse {
    pub challenge: String,
    pub rp_id: String,
    pub allow_credentials: Vec<String>,
    pub timeout: i64,
    pub user_verification: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CredentialResponse {
    pub id: Snowflake,
    pub credential_id: String,
    pub name: String,
    pub sign_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

// ============================================================================
// User Responses
// ============================================================================

/// The authenticated user's own account
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUserResponse {
    pub id: Snowflake,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    pub suspended_until: Option<DateTime<Utc>>,
    pub suspension_reason: Option<String>,
    pub email_verified: bool,
    pub preferences: PreferencesResponse,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreferencesResponse {
    pub notify_email: bool,
    pub notify_push: bool,
    pub profile_visibility: ProfileVisibility,
    pub allow_messages: MessagePolicy,
}

/// Another user's profile; private profiles leave the optional fields out
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Snowflake,
    pub username: String,
    pub display_name: String,
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub private: bool,
}

/// Minimal user shape embedded in other responses
#[derive(Debug, Clone, Serialize)]
pub struct PublicUserResponse {
    pub id: Snowflake,
    pub username: String,
    pub display_name: String,
    pub avatar: Option<String>,
}

/// Admin list row
#[derive(Debug, Clone, Serialize)]
pub struct AdminUserResponse {
    pub id: Snowflake,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub suspended_until: Option<DateTime<Utc>>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Feed Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Snowflake,
    pub author: PublicUserResponse,
    pub content: String,
    pub image: Option<String>,
    pub reactions: ReactionSummary,
    pub my_reaction: Option<String>,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Snowflake,
    pub post_id: Snowflake,
    pub author_id: Snowflake,
    pub parent_id: Option<Snowflake>,
    pub content: String,
    pub likes: ReactionSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Messaging Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: Snowflake,
    pub conversation_id: Snowflake,
    pub sender_id: Snowflake,
    pub content: String,
    pub attachment: Option<String>,
    pub reactions: ReactionSummary,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberResponse {
    pub user: PublicUserResponse,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
    pub last_read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub id: Snowflake,
    pub kind: ConversationKind,
    pub name: Option<String>,
    pub owner_id: Option<Snowflake>,
    pub members: Vec<MemberResponse>,
    pub last_message: Option<MessageResponse>,
    pub unread_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Notification Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: Snowflake,
    pub actor_id: Option<Snowflake>,
    pub kind: NotificationKind,
    pub body: String,
    pub link: Option<String>,
    pub data: serde_json::Value,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct VapidKeyResponse {
    pub public_key: Option<String>,
}

// ============================================================================
// Marketplace Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ServiceResponse {
    pub id: Snowflake,
    pub seller_id: Snowflake,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price_cents: i64,
    pub currency: String,
    pub delivery_days: i32,
    pub status: ServiceStatus,
    pub rating: RatingSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Snowflake,
    pub service_id: Snowflake,
    pub buyer_id: Snowflake,
    pub seller_id: Snowflake,
    pub price_cents: i64,
    pub currency: String,
    pub requirements: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: Snowflake,
    pub service_id: Snowflake,
    pub order_id: Snowflake,
    pub reviewer_id: Snowflake,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Billing Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub id: Snowflake,
    pub plan: String,
    pub status: SubscriptionStatus,
    pub provider: PaymentProvider,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    /// Hosted checkout to finish signing up, when the provider uses one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PaymentMethodResponse {
    pub id: Snowflake,
    pub provider: PaymentProvider,
    pub brand: Option<String>,
    pub last4: Option<String>,
    pub exp_month: Option<i32>,
    pub exp_year: Option<i32>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: Snowflake,
    pub subscription_id: Option<Snowflake>,
    pub provider: PaymentProvider,
    pub amount_cents: i64,
    pub currency: String,
    pub status: InvoiceStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub provider: PaymentProvider,
    pub provider_payment_id: String,
    pub client_secret: Option<String>,
    pub checkout_url: Option<String>,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
    pub duplicate: bool,
}

// ============================================================================
// Moderation Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct BlockResponse {
    pub user_id: Snowflake,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub id: Snowflake,
    pub reporter_id: Snowflake,
    pub subject_type: ReportSubject,
    pub subject_id: Snowflake,
    pub reason: String,
    pub details: Option<String>,
    pub status: ReportStatus,
    pub reviewer_id: Option<Snowflake>,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct AppealResponse {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub kind: AppealKind,
    pub subject_id: Option<Snowflake>,
    pub message: String,
    pub status: AppealStatus,
    pub reviewer_id: Option<Snowflake>,
    pub decision_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct AuditEntryResponse {
    pub id: Snowflake,
    pub actor_id: Snowflake,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<Snowflake>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Admin Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub users_by_status: BTreeMap<String, i64>,
    pub posts: i64,
    pub messages: i64,
    pub open_reports: i64,
    pub pending_appeals: i64,
    pub active_subscriptions: i64,
    pub orders_by_status: BTreeMap<String, i64>,
}

// ============================================================================
// Health Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: bool,
    pub realtime: bool,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub realtime_backend: &'static str,
    pub checks: HealthChecks,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

impl ReadinessResponse {
    pub fn ready(database: bool, realtime: bool, realtime_backend: &'static str) -> Self {
        Self {
            status: if database && realtime { "ready" } else { "not_ready" },
            realtime_backend,
            checks: HealthChecks { database, realtime },
        }
    }

    pub fn is_ready(&self) -> bool {
        self.checks.database && self.checks.realtime
    }
}
