//! Outbound integration ports - payments, identity providers, mail, push

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::{OAuthProvider, PaymentProvider, Plan, PushSubscription, SubscriptionStatus};
use crate::value_objects::Snowflake;

/// Failure talking to a third-party service
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Integration not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Failed to decode provider response: {0}")]
    Decode(String),
}

pub type IntegrationResult<T> = Result<T, IntegrationError>;

impl From<IntegrationError> for crate::error::DomainError {
    fn from(err: IntegrationError) -> Self {
        Self::IntegrationError(err.to_string())
    }
}

// ============================================================================
// Payments
// ============================================================================

#[derive(Debug, Clone)]
pub struct CustomerRequest {
    pub user_id: Snowflake,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub user_id: Snowflake,
    pub customer_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub description: String,
}

/// What the client needs to finish a payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub provider_payment_id: String,
    /// Client secret for providers confirming in the browser
    pub client_secret: Option<String>,
    /// Hosted checkout page for redirect-based providers
    pub checkout_url: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct SubscriptionRequest {
    pub user_id: Snowflake,
    pub email: String,
    pub customer_id: String,
    pub plan: Plan,
    pub payment_method_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSubscription {
    pub provider_subscription_id: String,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub checkout_url: Option<String>,
}

/// Raw webhook delivery as received over HTTP
#[derive(Debug, Clone, Copy)]
pub struct WebhookPayload<'a> {
    pub signature: Option<&'a str>,
    pub body: &'a [u8],
    /// Public URL the provider posted to (part of Square's signed input)
    pub notification_url: &'a str,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventKind {
    PaymentSucceeded,
    PaymentFailed,
    SubscriptionUpdated,
    SubscriptionCancelled,
    Other,
}

/// Provider webhook normalized to the fields billing acts on
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    pub id: String,
    pub kind: WebhookEventKind,
    /// Provider's own event name
    pub name: String,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub invoice_id: Option<String>,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
    pub status: Option<SubscriptionStatus>,
    pub current_period_end: Option<DateTime<Utc>>,
    /// User id echoed back from metadata / custom data
    pub user_id: Option<Snowflake>,
}

impl WebhookEvent {
    pub fn new(id: impl Into<String>, kind: WebhookEventKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            customer_id: None,
            subscription_id: None,
            invoice_id: None,
            amount_cents: None,
            currency: None,
            status: None,
            current_period_end: None,
            user_id: None,
        }
    }
}

/// A payment processor behind the uniform billing surface
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    /// Create the provider-side customer and return its id
    async fn create_customer(&self, request: &CustomerRequest) -> IntegrationResult<String>;

    async fn create_payment(&self, request: &PaymentRequest) -> IntegrationResult<PaymentIntent>;

    async fn create_subscription(&self, request: &SubscriptionRequest) -> IntegrationResult<ProviderSubscription>;

    async fn cancel_subscription(
        &self,
        provider_subscription_id: &str,
        at_period_end: bool,
    ) -> IntegrationResult<ProviderSubscription>;

    /// Check the signature and parse the event
    fn verify_webhook(&self, payload: &WebhookPayload<'_>) -> IntegrationResult<WebhookEvent>;
}

// ============================================================================
// Identity providers
// ============================================================================

/// Profile returned by an OAuth provider after the code exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    pub provider_user_id: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn provider(&self) -> OAuthProvider;

    /// Authorization endpoint URL carrying `state`
    fn authorize_url(&self, state: &str) -> String;

    async fn exchange_code(&self, code: &str) -> IntegrationResult<OAuthProfile>;
}

// ============================================================================
// Mail
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> IntegrationResult<()>;
}

// ============================================================================
// Push
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    /// The endpoint no longer exists and should be forgotten
    Gone,
}

#[async_trait]
pub trait PushSender: Send + Sync {
    /// Application server key for `PushManager.subscribe`, base64url
    fn public_key(&self) -> Option<String>;

    async fn send(&self, subscription: &PushSubscription) -> IntegrationResult<PushOutcome>;
}
