//! Request DTOs for API endpoints
//!
//! Bodies implement `Deserialize` and `Validate`; query strings only
//! `Deserialize`. Ids arrive as strings or numbers and parse into `Snowflake`.

use chrono::{DateTime, Utc};
use dreamx_core::{
    AppealKind, AppealStatus, CursorQuery, MessagePolicy, PageQuery, ProfileVisibility,
    ReportStatus, ReportSubject, ServiceStatus, Snowflake, UserRole, UserStatus,
};
use serde::Deserialize;
use validator::Validate;

// ============================================================================
// Pagination
// ============================================================================

/// `?before=&after=&limit=`
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CursorParams {
    pub before: Option<Snowflake>,
    pub after: Option<Snowflake>,
    pub limit: Option<i64>,
}

impl From<CursorParams> for CursorQuery {
    fn from(params: CursorParams) -> Self {
        CursorQuery::new(params.before, params.after, params.limit)
    }
}

/// `?page=&per_page=`
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl From<PageParams> for PageQuery {
    fn from(params: PageParams) -> Self {
        PageQuery::new(params.page, params.per_page)
    }
}

// ============================================================================
// Auth Requests
// ============================================================================

/// User registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32, message = "Username must be 3-32 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 64, message = "Display name must be 1-64 characters"))]
    pub display_name: Option<String>,
}

/// Login with an email address or a username
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(alias = "email", alias = "username")]
    #[validate(length(min = 1, message = "Email or username is required"))]
    pub login: String,

    pub password: String,
}

/// Token refresh request
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Logout request
#[derive(Debug, Clone, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub token: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_password: String,
}

/// Query string the provider redirects back with
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: String,
    pub state: String,
}

// ============================================================================
// WebAuthn Requests
// ============================================================================

/// Result of `navigator.credentials.create()`, binary fields base64url
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WebAuthnRegisterFinishRequest {
    #[validate(length(min = 1, max = 1024))]
    pub credential_id: String,

    /// SubjectPublicKeyInfo from `getPublicKey()`
    pub public_key: String,

    pub client_data_json: String,

    #[validate(length(min = 1, max = 64, message = "Name must be 1-64 characters"))]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebAuthnLoginBeginRequest {
    pub username: Option<String>,
}

/// Result of `navigator.credentials.get()`, binary fields base64url
#[derive(Debug, Clone, Deserialize)]
pub struct WebAuthnLoginFinishRequest {
    pub credential_id: String,
    pub authenticator_data: String,
    pub client_data_json: String,
    pub signature: String,
}

// ============================================================================
// Profile Requests
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 64, message = "Display name must be 1-64 characters"))]
    pub display_name: Option<String>,

    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<String>,

    #[validate(length(max = 100, message = "Location must be at most 100 characters"))]
    pub location: Option<String>,

    #[validate(url(message = "Invalid website URL"))]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePreferencesRequest {
    pub notify_email: Option<bool>,
    pub notify_push: Option<bool>,
    pub profile_visibility: Option<ProfileVisibility>,
    pub allow_messages: Option<MessagePolicy>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchUsersQuery {
    pub q: String,
    pub limit: Option<i64>,
}

// ============================================================================
// Feed Requests
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 5000, message = "Post must be 1-5000 characters"))]
    pub content: String,

    /// Path returned by an upload
    pub image: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 5000, message = "Post must be 1-5000 characters"))]
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct FeedQuery {
    pub before: Option<Snowflake>,
    pub limit: Option<i64>,
    pub author: Option<Snowflake>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 2000, message = "Comment must be 1-2000 characters"))]
    pub content: String,

    pub parent_id: Option<Snowflake>,
}

/// Reaction toggle; the kind defaults to `like`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToggleReactionRequest {
    pub kind: Option<String>,
}

// ============================================================================
// Messaging Requests
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct OpenDirectRequest {
    pub user_id: Snowflake,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 100, message = "Group name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 50, message = "A group needs 1-50 members"))]
    pub member_ids: Vec<Snowflake>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddMembersRequest {
    #[validate(length(min = 1, max = 50, message = "Add 1-50 members at a time"))]
    pub user_ids: Vec<Snowflake>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RenameGroupRequest {
    #[validate(length(min = 1, max = 100, message = "Group name must be 1-100 characters"))]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[serde(default)]
    #[validate(length(max = 4000, message = "Message must be at most 4000 characters"))]
    pub content: String,

    /// Path returned by an attachment upload
    pub attachment: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EditMessageRequest {
    #[validate(length(min = 1, max = 4000, message = "Message must be 1-4000 characters"))]
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ConversationListQuery {
    pub limit: Option<i64>,
}

// ============================================================================
// Notification Requests
// ============================================================================

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct NotificationListQuery {
    pub before: Option<Snowflake>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PushKeys {
    #[validate(length(min = 1))]
    pub p256dh: String,
    #[validate(length(min = 1))]
    pub auth: String,
}

/// Browser `PushSubscription.toJSON()`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PushSubscribeRequest {
    #[validate(url(message = "Invalid push endpoint"))]
    pub endpoint: String,

    #[validate(nested)]
    pub keys: PushKeys,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushUnsubscribeRequest {
    pub endpoint: String,
}

// ============================================================================
// Marketplace Requests
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateServiceRequest {
    #[validate(length(min = 1, max = 120, message = "Title must be 1-120 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 5000, message = "Description must be 1-5000 characters"))]
    pub description: String,

    #[validate(length(min = 1, max = 50, message = "Category must be 1-50 characters"))]
    pub category: String,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price_cents: i64,

    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,

    #[validate(range(min = 1, max = 365, message = "Delivery must take 1-365 days"))]
    pub delivery_days: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateServiceRequest {
    #[validate(length(min = 1, max = 120, message = "Title must be 1-120 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 5000, message = "Description must be 1-5000 characters"))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Category must be 1-50 characters"))]
    pub category: Option<String>,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price_cents: Option<i64>,

    #[validate(range(min = 1, max = 365, message = "Delivery must take 1-365 days"))]
    pub delivery_days: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetServiceStatusRequest {
    pub status: ServiceStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceListQuery {
    pub category: Option<String>,
    pub q: Option<String>,
    pub seller: Option<Snowflake>,
    pub before: Option<Snowflake>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    #[validate(length(max = 2000, message = "Requirements must be at most 2000 characters"))]
    pub requirements: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderRole {
    #[default]
    Buyer,
    Seller,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct OrderListQuery {
    #[serde(default)]
    pub role: OrderRole,
    pub before: Option<Snowflake>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,

    #[validate(length(max = 2000, message = "Comment must be at most 2000 characters"))]
    pub comment: Option<String>,
}

// ============================================================================
// Billing Requests
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubscribeRequest {
    #[validate(length(min = 1, message = "Plan is required"))]
    pub plan: String,

    /// Provider-side payment method to charge
    pub payment_method_id: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelSubscriptionRequest {
    #[serde(default = "default_true")]
    pub at_period_end: bool,
}

impl Default for CancelSubscriptionRequest {
    fn default() -> Self {
        Self { at_period_end: true }
    }
}

/// Record a method already tokenized client-side with the provider
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddPaymentMethodRequest {
    #[validate(length(min = 1, max = 255))]
    pub provider_method_id: String,

    #[validate(length(max = 32))]
    pub brand: Option<String>,

    #[validate(length(equal = 4, message = "last4 must be 4 digits"))]
    pub last4: Option<String>,

    #[validate(range(min = 1, max = 12))]
    pub exp_month: Option<i32>,

    #[validate(range(min = 2000, max = 2100))]
    pub exp_year: Option<i32>,

    #[serde(default)]
    pub make_default: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OneTimePaymentRequest {
    #[validate(range(min = 50, message = "Amount must be at least 50 cents"))]
    pub amount_cents: i64,

    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,

    #[validate(length(min = 1, max = 200, message = "Description must be 1-200 characters"))]
    pub description: String,
}

// ============================================================================
// Moderation Requests
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReportRequest {
    pub subject_type: ReportSubject,

    pub subject_id: Snowflake,

    #[validate(length(min = 1, max = 100, message = "Reason must be 1-100 characters"))]
    pub reason: String,

    #[validate(length(max = 2000, message = "Details must be at most 2000 characters"))]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ReportListQuery {
    pub status: Option<ReportStatus>,
    pub before: Option<Snowflake>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResolveReportRequest {
    pub status: ReportStatus,

    #[validate(length(max = 1000, message = "Note must be at most 1000 characters"))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SuspendUserRequest {
    /// Omit for an indefinite suspension
    pub until: Option<DateTime<Utc>>,

    #[validate(length(min = 1, max = 500, message = "Reason must be 1-500 characters"))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BanUserRequest {
    #[validate(length(min = 1, max = 500, message = "Reason must be 1-500 characters"))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAppealRequest {
    pub kind: AppealKind,

    pub subject_id: Option<Snowflake>,

    #[validate(length(min = 1, max = 2000, message = "Message must be 1-2000 characters"))]
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AppealListQuery {
    pub status: Option<AppealStatus>,
    pub before: Option<Snowflake>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DecideAppealRequest {
    pub status: AppealStatus,

    #[validate(length(max = 1000, message = "Note must be at most 1000 characters"))]
    pub note: Option<String>,
}

// ============================================================================
// Admin Requests
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub status: Option<UserStatus>,
    pub role: Option<UserRole>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let valid = RegisterRequest {
            username: "dreamer".into(),
            email: "dreamer@example.com".into(),
            password: "Secret123".into(),
            display_name: None,
        };
        assert!(valid.validate().is_ok());

        let invalid = RegisterRequest {
            username: "ab".into(),
            email: "not-an-email".into(),
            password: "short".into(),
            display_name: Some(String::new()),
        };
        let errors = invalid.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("display_name"));
    }

    #[test]
    fn test_login_accepts_email_or_username_key() {
        let by_email: LoginRequest =
            serde_json::from_str(r#"{"email":"a@b.co","password":"x"}"#).unwrap();
        assert_eq!(by_email.login, "a@b.co");
        let by_username: LoginRequest =
            serde_json::from_str(r#"{"username":"ana","password":"x"}"#).unwrap();
        assert_eq!(by_username.login, "ana");
    }

    #[test]
    fn test_review_rating_range() {
        let review = CreateReviewRequest { rating: 6, comment: None };
        assert!(review.validate().is_err());
        let review = CreateReviewRequest { rating: 5, comment: None };
        assert!(review.validate().is_ok());
    }

    #[test]
    fn test_push_subscribe_validates_nested_keys() {
        let request: PushSubscribeRequest = serde_json::from_str(
            r#"{"endpoint":"https://push.example/abc","keys":{"p256dh":"","auth":"a"}}"#,
        )
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_cancel_defaults_to_period_end() {
        let request: CancelSubscriptionRequest = serde_json::from_str("{}").unwrap();
        assert!(request.at_period_end);
    }

    #[test]
    fn test_ids_parse_from_strings() {
        let request: OpenDirectRequest = serde_json::from_str(r#"{"user_id":"42"}"#).unwrap();
        assert_eq!(request.user_id, Snowflake::new(42));
    }

    #[test]
    fn test_cursor_params_clamp() {
        let query: CursorQuery = CursorParams { before: None, after: None, limit: Some(500) }.into();
        assert_eq!(query.limit, dreamx_core::MAX_LIMIT);
    }
}
