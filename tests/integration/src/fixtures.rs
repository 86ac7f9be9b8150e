//! Test fixtures and data generators
//!
//! Provides reusable test data for integration tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn unique() -> Self {
        let suffix = unique_suffix();
        Self {
            username: format!("dreamer{suffix}"),
            email: format!("dreamer{suffix}@example.com"),
            password: "TestPass123!".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

impl LoginRequest {
    pub fn from_register(reg: &RegisterRequest) -> Self {
        Self {
            login: reg.email.clone(),
            password: reg.password.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub user: CurrentUserResponse,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

#[derive(Debug, Deserialize)]
pub struct CurrentUserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub status: String,
    pub email_verified: bool,
}

// ============================================================================
// Feed
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CreatePostRequest {
    pub content: String,
}

impl CreatePostRequest {
    pub fn unique() -> Self {
        Self {
            content: format!("Dream journal entry #{}", unique_suffix()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PostResponse {
    pub id: String,
    pub author: PublicUserResponse,
    pub content: String,
    pub reactions: BTreeMap<String, i64>,
    pub my_reaction: Option<String>,
    pub comment_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct PublicUserResponse {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentResponse {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ReactionToggleResponse {
    pub outcome: String,
    pub kind: Option<String>,
    pub counts: BTreeMap<String, i64>,
}

// ============================================================================
// Messaging
// ============================================================================

#[derive(Debug, Serialize)]
pub struct OpenDirectRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ConversationResponse {
    pub id: String,
    pub kind: String,
    pub members: Vec<serde_json::Value>,
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct NotificationResponse {
    pub id: String,
    pub actor_id: Option<String>,
    pub kind: String,
    pub read: bool,
}

#[derive(Debug, Deserialize)]
pub struct CountResponse {
    pub count: i64,
}

// ============================================================================
// Marketplace
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CreateServiceRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub price_cents: i64,
    pub delivery_days: i32,
}

impl CreateServiceRequest {
    pub fn unique() -> Self {
        Self {
            title: format!("Dream interpretation #{}", unique_suffix()),
            description: "A careful reading of your recurring dreams".to_string(),
            category: "Readings".to_string(),
            price_cents: 2500,
            delivery_days: 3,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServiceResponse {
    pub id: String,
    pub seller_id: String,
    pub category: String,
    pub currency: String,
    pub status: String,
    pub rating: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub service_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub status: String,
    pub completed_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateReviewRequest {
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewResponse {
    pub id: String,
    pub service_id: String,
    pub order_id: String,
    pub reviewer_id: String,
    pub rating: i32,
}
