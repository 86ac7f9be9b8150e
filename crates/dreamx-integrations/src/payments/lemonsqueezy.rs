//! Lemon Squeezy - JSON:API checkouts, merchant of record
//!
//! Subscriptions start from a hosted checkout. Until the buyer completes it
//! and `subscription_created` arrives, the local record stays `trialing` and
//! is keyed by the checkout id. The user id travels in
//! `checkout_data.custom.user_id` and comes back as `meta.custom_data`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dreamx_common::LemonSqueezyConfig;
use dreamx_core::{
    CustomerRequest, IntegrationError, IntegrationResult, PaymentIntent, PaymentProcessor,
    PaymentProvider, PaymentRequest, ProviderSubscription, Snowflake, SubscriptionRequest,
    SubscriptionStatus, WebhookEvent, WebhookEventKind, WebhookPayload,
};
use serde_json::{json, Value};

use crate::http::{self, i64_field, str_field};
use crate::signature::verify_hmac_sha256;

const JSON_API: &str = "application/vnd.api+json";

pub struct LemonSqueezyProcessor {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    store_id: String,
    webhook_secret: Option<String>,
    one_time_variant_id: Option<String>,
}

fn map_status(status: &str) -> SubscriptionStatus {
    match status {
        "active" => SubscriptionStatus::Active,
        "on_trial" => SubscriptionStatus::Trialing,
        "cancelled" | "expired" => SubscriptionStatus::Cancelled,
        // past_due, unpaid, paused
        _ => SubscriptionStatus::PastDue,
    }
}

fn parse_time(value: &Value, pointer: &str) -> Option<DateTime<Utc>> {
    let raw = str_field(value, pointer)?;
    DateTime::parse_from_rfc3339(&raw).ok().map(|dt| dt.with_timezone(&Utc))
}

impl LemonSqueezyProcessor {
    pub fn new(config: &LemonSqueezyConfig) -> IntegrationResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(IntegrationError::NotConfigured("LEMONSQUEEZY_API_KEY"))?;
        let store_id = config
            .store_id
            .clone()
            .ok_or(IntegrationError::NotConfigured("LEMONSQUEEZY_STORE_ID"))?;

        Ok(Self {
            client: http::client()?,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            store_id,
            webhook_secret: config.webhook_secret.clone(),
            one_time_variant_id: config.one_time_variant_id.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.api_base))
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, JSON_API)
            .header(reqwest::header::CONTENT_TYPE, JSON_API)
    }

    fn relationship(kind: &str, id: &str) -> Value {
        json!({ "data": { "type": kind, "id": id } })
    }

    /// Create a hosted checkout and return `(checkout id, url)`
    async fn create_checkout(
        &self,
        variant_id: &str,
        email: Option<&str>,
        user_id: Snowflake,
        custom_price: Option<i64>,
    ) -> IntegrationResult<(String, String)> {
        let mut attributes = json!({
            "checkout_data": {
                "custom": { "user_id": user_id.to_string() }
            }
        });
        if let Some(email) = email {
            attributes["checkout_data"]["email"] = json!(email);
        }
        if let Some(price) = custom_price {
            attributes["custom_price"] = json!(price);
        }

        let body = json!({
            "data": {
                "type": "checkouts",
                "attributes": attributes,
                "relationships": {
                    "store": Self::relationship("stores", &self.store_id),
                    "variant": Self::relationship("variants", variant_id),
                }
            }
        });

        let response: Value =
            http::send_json(self.request(reqwest::Method::POST, "/v1/checkouts").json(&body)).await?;

        let id = str_field(&response, "/data/id")
            .ok_or_else(|| IntegrationError::Decode("checkout id missing".into()))?;
        let url = str_field(&response, "/data/attributes/url")
            .ok_or_else(|| IntegrationError::Decode("checkout url missing".into()))?;
        Ok((id, url))
    }

    fn parse_event(body: &[u8]) -> IntegrationResult<WebhookEvent> {
        let event: Value = serde_json::from_slice(body).map_err(|e| IntegrationError::Decode(e.to_string()))?;

        let name = str_field(&event, "/meta/event_name")
            .ok_or_else(|| IntegrationError::Decode("event_name missing".into()))?;
        let data_id = str_field(&event, "/data/id").unwrap_or_default();
        let attrs = event.pointer("/data/attributes").cloned().unwrap_or(Value::Null);
        let updated_at = str_field(&attrs, "/updated_at").unwrap_or_default();

        // Lemon Squeezy has no event id; this triple is stable across retries
        let id = format!("{name}:{data_id}:{updated_at}");

        let kind = match name.as_str() {
            "subscription_payment_success" | "order_created" => WebhookEventKind::PaymentSucceeded,
            "subscription_payment_failed" => WebhookEventKind::PaymentFailed,
            "subscription_created" | "subscription_updated" | "subscription_resumed" => {
                WebhookEventKind::SubscriptionUpdated
            }
            "subscription_cancelled" | "subscription_expired" => WebhookEventKind::SubscriptionCancelled,
            _ => WebhookEventKind::Other,
        };

        let mut out = WebhookEvent::new(id, kind, name.clone());
        out.user_id = str_field(&event, "/meta/custom_data/user_id").and_then(|s| Snowflake::parse(&s).ok());
        out.customer_id = str_field(&attrs, "/customer_id");

        match kind {
            WebhookEventKind::PaymentSucceeded | WebhookEventKind::PaymentFailed => {
                out.amount_cents = i64_field(&attrs, "/total");
                out.currency = str_field(&attrs, "/currency").map(|c| c.to_lowercase());
                out.invoice_id = Some(data_id);
                out.subscription_id = str_field(&attrs, "/subscription_id");
            }
            WebhookEventKind::SubscriptionUpdated | WebhookEventKind::SubscriptionCancelled => {
                out.subscription_id = Some(data_id);
                out.status = if name == "subscription_expired" {
                    Some(SubscriptionStatus::Cancelled)
                } else {
                    str_field(&attrs, "/status").map(|s| map_status(&s))
                };
                out.current_period_end =
                    parse_time(&attrs, "/renews_at").or_else(|| parse_time(&attrs, "/ends_at"));
            }
            WebhookEventKind::Other => {}
        }

        Ok(out)
    }
}

#[async_trait]
impl PaymentProcessor for LemonSqueezyProcessor {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::LemonSqueezy
    }

    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    async fn create_customer(&self, request: &CustomerRequest) -> IntegrationResult<String> {
        let body = json!({
            "data": {
                "type": "customers",
                "attributes": { "name": request.name, "email": request.email },
                "relationships": { "store": Self::relationship("stores", &self.store_id) }
            }
        });

        let response: Value =
            http::send_json(self.request(reqwest::Method::POST, "/v1/customers").json(&body)).await?;
        let id = str_field(&response, "/data/id")
            .ok_or_else(|| IntegrationError::Decode("customer id missing".into()))?;

        tracing::info!(customer_id = %id, "Lemon Squeezy customer created");
        Ok(id)
    }

    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    async fn create_payment(&self, request: &PaymentRequest) -> IntegrationResult<PaymentIntent> {
        let variant = self
            .one_time_variant_id
            .as_deref()
            .ok_or(IntegrationError::NotConfigured("LEMONSQUEEZY_ONE_TIME_VARIANT_ID"))?;

        let (id, url) = self
            .create_checkout(variant, None, request.user_id, Some(request.amount_cents))
            .await?;

        Ok(PaymentIntent {
            provider_payment_id: id,
            client_secret: None,
            checkout_url: Some(url),
            status: "pending".to_string(),
        })
    }

    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id, plan = %request.plan.id))]
    async fn create_subscription(&self, request: &SubscriptionRequest) -> IntegrationResult<ProviderSubscription> {
        let (id, url) = self
            .create_checkout(&request.plan.provider_price_id, Some(&request.email), request.user_id, None)
            .await?;

        Ok(ProviderSubscription {
            provider_subscription_id: id,
            status: SubscriptionStatus::Trialing,
            current_period_end: None,
            cancel_at_period_end: false,
            checkout_url: Some(url),
        })
    }

    /// Cancelling keeps the subscription usable until `ends_at`
    #[tracing::instrument(skip(self))]
    async fn cancel_subscription(
        &self,
        provider_subscription_id: &str,
        at_period_end: bool,
    ) -> IntegrationResult<ProviderSubscription> {
        let path = format!("/v1/subscriptions/{provider_subscription_id}");
        let response: Value = http::send_json(self.request(reqwest::Method::DELETE, &path)).await?;
        let attrs = response.pointer("/data/attributes").cloned().unwrap_or(Value::Null);

        Ok(ProviderSubscription {
            provider_subscription_id: provider_subscription_id.to_string(),
            status: if at_period_end {
                SubscriptionStatus::Active
            } else {
                SubscriptionStatus::Cancelled
            },
            current_period_end: parse_time(&attrs, "/ends_at"),
            cancel_at_period_end: at_period_end,
            checkout_url: None,
        })
    }

    fn verify_webhook(&self, payload: &WebhookPayload<'_>) -> IntegrationResult<WebhookEvent> {
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or(IntegrationError::NotConfigured("LEMONSQUEEZY_WEBHOOK_SECRET"))?;
        let signature = payload
            .signature
            .and_then(|s| hex::decode(s.trim()).ok())
            .ok_or(IntegrationError::InvalidSignature)?;

        if !verify_hmac_sha256(secret.as_bytes(), &[payload.body], &signature) {
            return Err(IntegrationError::InvalidSignature);
        }

        Self::parse_event(payload.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::hmac_sha256;
    use dreamx_core::Plan;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "ls_secret";

    fn processor(api_base: &str) -> LemonSqueezyProcessor {
        LemonSqueezyProcessor::new(&LemonSqueezyConfig {
            api_key: Some("ls_key".into()),
            store_id: Some("11".into()),
            webhook_secret: Some(SECRET.into()),
            one_time_variant_id: None,
            api_base: api_base.into(),
        })
        .unwrap()
    }

    fn verify(body: &str) -> IntegrationResult<WebhookEvent> {
        let sig = hex::encode(hmac_sha256(SECRET.as_bytes(), &[body.as_bytes()]));
        processor("http://unused").verify_webhook(&WebhookPayload {
            signature: Some(&sig),
            body: body.as_bytes(),
            notification_url: "",
            received_at: Utc::now(),
        })
    }

    #[test]
    fn test_webhook_subscription_created() {
        let body = r#"{"meta":{"event_name":"subscription_created","custom_data":{"user_id":"99"}},"data":{"type":"subscriptions","id":"123","attributes":{"status":"active","customer_id":555,"renews_at":"2026-02-01T00:00:00.000000Z","updated_at":"2026-01-01T00:00:00.000000Z"}}}"#;
        let event = verify(body).unwrap();
        assert_eq!(event.id, "subscription_created:123:2026-01-01T00:00:00.000000Z");
        assert_eq!(event.kind, WebhookEventKind::SubscriptionUpdated);
        assert_eq!(event.status, Some(SubscriptionStatus::Active));
        assert_eq!(event.user_id, Some(Snowflake::new(99)));
        assert_eq!(event.customer_id.as_deref(), Some("555"));
        assert_eq!(event.subscription_id.as_deref(), Some("123"));
        assert!(event.current_period_end.is_some());
    }

    #[test]
    fn test_webhook_payment_success() {
        let body = r#"{"meta":{"event_name":"subscription_payment_success"},"data":{"type":"subscription-invoices","id":"inv9","attributes":{"subscription_id":123,"total":999,"currency":"USD","updated_at":"x"}}}"#;
        let event = verify(body).unwrap();
        assert_eq!(event.kind, WebhookEventKind::PaymentSucceeded);
        assert_eq!(event.amount_cents, Some(999));
        assert_eq!(event.currency.as_deref(), Some("usd"));
        assert_eq!(event.invoice_id.as_deref(), Some("inv9"));
        assert_eq!(event.subscription_id.as_deref(), Some("123"));
    }

    #[test]
    fn test_webhook_bad_signature() {
        let result = processor("http://unused").verify_webhook(&WebhookPayload {
            signature: Some("deadbeef"),
            body: b"{}",
            notification_url: "",
            received_at: Utc::now(),
        });
        assert!(matches!(result, Err(IntegrationError::InvalidSignature)));
    }

    #[tokio::test]
    async fn test_subscription_checkout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkouts"))
            .and(header("accept", JSON_API))
            .and(body_partial_json(serde_json::json!({
                "data": {
                    "attributes": {"checkout_data": {"custom": {"user_id": "5"}}},
                    "relationships": {"variant": {"data": {"id": "var_1"}}}
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": {"id": "chk_1", "attributes": {"url": "https://store.lemonsqueezy.com/checkout/chk_1"}}
            })))
            .mount(&server)
            .await;

        let sub = processor(&server.uri())
            .create_subscription(&SubscriptionRequest {
                user_id: Snowflake::new(5),
                email: "e@example.com".into(),
                customer_id: "555".into(),
                plan: Plan {
                    id: "premium".into(),
                    name: "Premium".into(),
                    amount_cents: 999,
                    currency: "usd".into(),
                    provider_price_id: "var_1".into(),
                    interval: "month".into(),
                },
                payment_method_id: None,
            })
            .await
            .unwrap();

        assert_eq!(sub.provider_subscription_id, "chk_1");
        assert_eq!(sub.status, SubscriptionStatus::Trialing);
        assert!(sub.checkout_url.is_some());
    }

    #[tokio::test]
    async fn test_one_time_payment_requires_variant() {
        let err = processor("http://unused")
            .create_payment(&PaymentRequest {
                user_id: Snowflake::new(5),
                customer_id: "555".into(),
                amount_cents: 100,
                currency: "usd".into(),
                description: "Tip".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IntegrationError::NotConfigured(_)));
    }
}
