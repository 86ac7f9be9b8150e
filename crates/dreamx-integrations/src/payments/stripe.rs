//! Stripe - form-encoded REST, `Stripe-Signature` webhooks

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dreamx_common::StripeConfig;
use dreamx_core::{
    CustomerRequest, IntegrationError, IntegrationResult, PaymentIntent, PaymentProcessor,
    PaymentProvider, PaymentRequest, ProviderSubscription, Snowflake, SubscriptionRequest,
    SubscriptionStatus, WebhookEvent, WebhookEventKind, WebhookPayload,
};
use serde::Deserialize;
use serde_json::Value;

use crate::http::{self, i64_field, str_field};
use crate::signature::verify_hmac_sha256;

/// Maximum age of a signed webhook timestamp
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

pub struct StripeProcessor {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
    webhook_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    client_secret: Option<String>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct StripeSubscription {
    id: String,
    status: String,
    current_period_end: Option<i64>,
    #[serde(default)]
    cancel_at_period_end: bool,
}

impl From<StripeSubscription> for ProviderSubscription {
    fn from(sub: StripeSubscription) -> Self {
        Self {
            provider_subscription_id: sub.id,
            status: map_status(&sub.status),
            current_period_end: sub.current_period_end.and_then(from_unix),
            cancel_at_period_end: sub.cancel_at_period_end,
            checkout_url: None,
        }
    }
}

fn from_unix(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

/// Stripe subscription status to ours
fn map_status(status: &str) -> SubscriptionStatus {
    match status {
        "active" => SubscriptionStatus::Active,
        "trialing" => SubscriptionStatus::Trialing,
        "canceled" | "incomplete_expired" => SubscriptionStatus::Cancelled,
        // past_due, unpaid, incomplete, paused
        _ => SubscriptionStatus::PastDue,
    }
}

impl StripeProcessor {
    pub fn new(config: &StripeConfig) -> IntegrationResult<Self> {
        let secret_key = config
            .secret_key
            .clone()
            .ok_or(IntegrationError::NotConfigured("STRIPE_SECRET_KEY"))?;

        Ok(Self {
            client: http::client()?,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key,
            webhook_secret: config.webhook_secret.clone(),
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{path}", self.api_base))
            .bearer_auth(&self.secret_key)
    }

    /// Parse `t=...,v1=...[,v1=...]`
    fn parse_signature_header(header: &str) -> Option<(i64, Vec<Vec<u8>>)> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part.trim().split_once('=')?;
            match key {
                "t" => timestamp = value.parse::<i64>().ok(),
                "v1" => {
                    if let Ok(sig) = hex::decode(value) {
                        signatures.push(sig);
                    }
                }
                _ => {}
            }
        }

        Some((timestamp?, signatures))
    }

    fn parse_event(body: &[u8]) -> IntegrationResult<WebhookEvent> {
        let event: Value = serde_json::from_slice(body).map_err(|e| IntegrationError::Decode(e.to_string()))?;

        let id = str_field(&event, "/id").ok_or_else(|| IntegrationError::Decode("event id missing".into()))?;
        let name = str_field(&event, "/type").unwrap_or_default();
        let object = event.pointer("/data/object").cloned().unwrap_or(Value::Null);

        let kind = match name.as_str() {
            "invoice.paid" | "invoice.payment_succeeded" | "payment_intent.succeeded" => {
                WebhookEventKind::PaymentSucceeded
            }
            "invoice.payment_failed" | "payment_intent.payment_failed" => WebhookEventKind::PaymentFailed,
            "customer.subscription.created" | "customer.subscription.updated" => {
                WebhookEventKind::SubscriptionUpdated
            }
            "customer.subscription.deleted" => WebhookEventKind::SubscriptionCancelled,
            _ => WebhookEventKind::Other,
        };

        let mut out = WebhookEvent::new(id, kind, name.clone());
        out.customer_id = str_field(&object, "/customer");
        out.user_id = str_field(&object, "/metadata/user_id")
            .and_then(|s| Snowflake::parse(&s).ok());

        match kind {
            WebhookEventKind::PaymentSucceeded | WebhookEventKind::PaymentFailed => {
                let is_invoice = name.starts_with("invoice.");
                out.amount_cents = if is_invoice {
                    i64_field(&object, "/amount_paid")
                        .filter(|amount| *amount > 0)
                        .or_else(|| i64_field(&object, "/amount_due"))
                } else {
                    i64_field(&object, "/amount_received")
                        .filter(|amount| *amount > 0)
                        .or_else(|| i64_field(&object, "/amount"))
                };
                out.currency = str_field(&object, "/currency");
                if is_invoice {
                    out.invoice_id = str_field(&object, "/id");
                    out.subscription_id = str_field(&object, "/subscription");
                }
            }
            WebhookEventKind::SubscriptionUpdated | WebhookEventKind::SubscriptionCancelled => {
                out.subscription_id = str_field(&object, "/id");
                out.status = if kind == WebhookEventKind::SubscriptionCancelled {
                    Some(SubscriptionStatus::Cancelled)
                } else {
                    str_field(&object, "/status").map(|s| map_status(&s))
                };
                out.current_period_end = i64_field(&object, "/current_period_end").and_then(from_unix);
            }
            WebhookEventKind::Other => {}
        }

        Ok(out)
    }
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Stripe
    }

    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    async fn create_customer(&self, request: &CustomerRequest) -> IntegrationResult<String> {
        let user_id = request.user_id.to_string();
        let form = [
            ("email", request.email.as_str()),
            ("name", request.name.as_str()),
            ("metadata[user_id]", user_id.as_str()),
        ];

        let customer: IdResponse = http::send_json(self.post("/v1/customers").form(&form)).await?;
        tracing::info!(customer_id = %customer.id, "Stripe customer created");
        Ok(customer.id)
    }

    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    async fn create_payment(&self, request: &PaymentRequest) -> IntegrationResult<PaymentIntent> {
        let amount = request.amount_cents.to_string();
        let currency = request.currency.to_lowercase();
        let user_id = request.user_id.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", currency.as_str()),
            ("customer", request.customer_id.as_str()),
            ("description", request.description.as_str()),
            ("automatic_payment_methods[enabled]", "true"),
            ("metadata[user_id]", user_id.as_str()),
        ];

        let intent: StripePaymentIntent = http::send_json(self.post("/v1/payment_intents").form(&form)).await?;
        Ok(PaymentIntent {
            provider_payment_id: intent.id,
            client_secret: intent.client_secret,
            checkout_url: None,
            status: intent.status,
        })
    }

    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id, plan = %request.plan.id))]
    async fn create_subscription(&self, request: &SubscriptionRequest) -> IntegrationResult<ProviderSubscription> {
        let user_id = request.user_id.to_string();
        let mut form = vec![
            ("customer", request.customer_id.as_str()),
            ("items[0][price]", request.plan.provider_price_id.as_str()),
            ("metadata[user_id]", user_id.as_str()),
        ];
        if let Some(method) = &request.payment_method_id {
            form.push(("default_payment_method", method.as_str()));
        }

        let sub: StripeSubscription = http::send_json(self.post("/v1/subscriptions").form(&form)).await?;
        Ok(sub.into())
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_subscription(
        &self,
        provider_subscription_id: &str,
        at_period_end: bool,
    ) -> IntegrationResult<ProviderSubscription> {
        let path = format!("/v1/subscriptions/{provider_subscription_id}");

        let sub: StripeSubscription = if at_period_end {
            http::send_json(self.post(&path).form(&[("cancel_at_period_end", "true")])).await?
        } else {
            let request = self
                .client
                .delete(format!("{}{path}", self.api_base))
                .bearer_auth(&self.secret_key);
            http::send_json(request).await?
        };

        Ok(sub.into())
    }

    fn verify_webhook(&self, payload: &WebhookPayload<'_>) -> IntegrationResult<WebhookEvent> {
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or(IntegrationError::NotConfigured("STRIPE_WEBHOOK_SECRET"))?;
        let header = payload.signature.ok_or(IntegrationError::InvalidSignature)?;

        let (timestamp, signatures) =
            Self::parse_signature_header(header).ok_or(IntegrationError::InvalidSignature)?;

        let skew = payload
            .received_at
            .timestamp()
            .checked_sub(timestamp)
            .map(i64::unsigned_abs)
            .ok_or(IntegrationError::InvalidSignature)?;
        if skew > WEBHOOK_TOLERANCE_SECS.unsigned_abs() {
            return Err(IntegrationError::InvalidSignature);
        }

        let ts = timestamp.to_string();
        let signed: [&[u8]; 3] = [ts.as_bytes(), b".", payload.body];
        if !signatures
            .iter()
            .any(|sig| verify_hmac_sha256(secret.as_bytes(), &signed, sig))
        {
            return Err(IntegrationError::InvalidSignature);
        }

        Self::parse_event(payload.body)
    }
}
