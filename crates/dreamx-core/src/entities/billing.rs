//! Billing records - subscriptions, payment methods, invoices, customer ids

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Payment processor backing a billing record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Stripe,
    Square,
    #[serde(rename = "lemonsqueezy")]
    LemonSqueezy,
}

impl PaymentProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::Square => "square",
            Self::LemonSqueezy => "lemonsqueezy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().replace(['_', '-', ' '], "").as_str() {
            "stripe" => Some(Self::Stripe),
            "square" => Some(Self::Square),
            "lemonsqueezy" => Some(Self::LemonSqueezy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trialing => "trialing",
            Self::PastDue => "past_due",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "trialing" | "on_trial" => Some(Self::Trialing),
            "past_due" | "unpaid" => Some(Self::PastDue),
            "cancelled" | "canceled" | "expired" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Counts as a live subscription for the one-per-user rule
    pub fn is_live(self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

/// The single subscription record a user may hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub plan: String,
    pub status: SubscriptionStatus,
    pub provider: PaymentProvider,
    pub provider_subscription_id: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentMethod {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub provider: PaymentProvider,
    pub provider_method_id: String,
    pub brand: Option<String>,
    pub last4: Option<String>,
    pub exp_month: Option<i32>,
    pub exp_year: Option<i32>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Paid,
    Open,
    Failed,
    Refunded,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Open => "open",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "paid" => Some(Self::Paid),
            "open" => Some(Self::Open),
            "failed" => Some(Self::Failed),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

/// Append-only invoice history entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub id: Snowflake,
    pub user_id: Snowflake,
    pub subscription_id: Option<Snowflake>,
    pub provider: PaymentProvider,
    pub provider_invoice_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub status: InvoiceStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Customer id a provider assigned to a user; one per (user, provider)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCustomer {
    pub user_id: Snowflake,
    pub provider: PaymentProvider,
    pub customer_id: String,
    pub created_at: DateTime<Utc>,
}

/// Subscription plan offered for purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub amount_cents: i64,
    pub currency: String,
    /// Provider-side price / variant identifier
    pub provider_price_id: String,
    pub interval: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!(PaymentProvider::parse("Stripe"), Some(PaymentProvider::Stripe));
        assert_eq!(PaymentProvider::parse("lemon_squeezy"), Some(PaymentProvider::LemonSqueezy));
        assert_eq!(PaymentProvider::parse("lemonsqueezy"), Some(PaymentProvider::LemonSqueezy));
        assert_eq!(PaymentProvider::parse("paypal"), None);
    }

    #[test]
    fn test_subscription_status_aliases() {
        assert_eq!(SubscriptionStatus::parse("canceled"), Some(SubscriptionStatus::Cancelled));
        assert_eq!(SubscriptionStatus::parse("on_trial"), Some(SubscriptionStatus::Trialing));
        assert!(SubscriptionStatus::Trialing.is_live());
        assert!(!SubscriptionStatus::PastDue.is_live());
    }

    #[test]
    fn test_provider_serde_name() {
        assert_eq!(
            serde_json::to_string(&PaymentProvider::LemonSqueezy).unwrap(),
            "\"lemonsqueezy\""
        );
    }
}
