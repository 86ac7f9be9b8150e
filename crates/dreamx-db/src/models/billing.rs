//! Billing models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionModel {
    pub id: i64,
    pub user_id: i64,
    pub plan: String,
    pub status: String,
    pub provider: String,
    pub provider_subscription_id: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PaymentMethodModel {
    pub id: i64,
    pub user_id: i64,
    pub provider: String,
    pub provider_method_id: String,
    pub brand: Option<String>,
    pub last4: Option<String>,
    pub exp_month: Option<i32>,
    pub exp_year: Option<i32>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct InvoiceModel {
    pub id: i64,
    pub user_id: i64,
    pub subscription_id: Option<i64>,
    pub provider: String,
    pub provider_invoice_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PaymentCustomerModel {
    pub user_id: i64,
    pub provider: String,
    pub customer_id: String,
    pub created_at: DateTime<Utc>,
}
