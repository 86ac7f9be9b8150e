//! Square - JSON REST, payment links for one-off charges

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, NaiveDate, Utc};
use dreamx_common::SquareConfig;
use dreamx_core::{
    CustomerRequest, IntegrationError, IntegrationResult, PaymentIntent, PaymentProcessor,
    PaymentProvider, PaymentRequest, ProviderSubscription, SubscriptionRequest, SubscriptionStatus,
    WebhookEvent, WebhookEventKind, WebhookPayload,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::http::{self, i64_field, str_field};
use crate::signature::verify_hmac_sha256;

/// API version pinned on every request
pub const SQUARE_VERSION: &str = "2024-06-04";

pub struct SquareProcessor {
    client: reqwest::Client,
    api_base: String,
    access_token: String,
    location_id: String,
    webhook_signature_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CustomerEnvelope {
    customer: IdOnly,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PaymentLinkEnvelope {
    payment_link: PaymentLink,
}

#[derive(Debug, Deserialize)]
struct PaymentLink {
    id: String,
    url: String,
    order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionEnvelope {
    subscription: SquareSubscription,
}

#[derive(Debug, Deserialize)]
struct SquareSubscription {
    id: String,
    status: Option<String>,
    charged_through_date: Option<String>,
    canceled_date: Option<String>,
}

impl From<SquareSubscription> for ProviderSubscription {
    fn from(sub: SquareSubscription) -> Self {
        Self {
            provider_subscription_id: sub.id,
            status: sub
                .status
                .as_deref()
                .map_or(SubscriptionStatus::Trialing, map_status),
            current_period_end: sub.charged_through_date.as_deref().and_then(parse_date),
            cancel_at_period_end: sub.canceled_date.is_some(),
            checkout_url: None,
        }
    }
}

fn map_status(status: &str) -> SubscriptionStatus {
    match status {
        "ACTIVE" => SubscriptionStatus::Active,
        "PENDING" => SubscriptionStatus::Trialing,
        "CANCELED" | "DEACTIVATED" => SubscriptionStatus::Cancelled,
        _ => SubscriptionStatus::PastDue,
    }
}

/// Square dates are `YYYY-MM-DD`; treat them as midnight UTC
fn parse_date(date: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

impl SquareProcessor {
    pub fn new(config: &SquareConfig) -> IntegrationResult<Self> {
        let access_token = config
            .access_token
            .clone()
            .ok_or(IntegrationError::NotConfigured("SQUARE_ACCESS_TOKEN"))?;
        let location_id = config
            .location_id
            .clone()
            .ok_or(IntegrationError::NotConfigured("SQUARE_LOCATION_ID"))?;

        Ok(Self {
            client: http::client()?,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            access_token,
            location_id,
            webhook_signature_key: config.webhook_signature_key.clone(),
        })
    }

    fn post(&self, path: &str, body: &Value) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{path}", self.api_base))
            .bearer_auth(&self.access_token)
            .header("Square-Version", SQUARE_VERSION)
            .json(body)
    }

    fn parse_event(body: &[u8]) -> IntegrationResult<WebhookEvent> {
        let event: Value = serde_json::from_slice(body).map_err(|e| IntegrationError::Decode(e.to_string()))?;

        let id = str_field(&event, "/event_id").ok_or_else(|| IntegrationError::Decode("event_id missing".into()))?;
        let name = str_field(&event, "/type").unwrap_or_default();
        let object = event.pointer("/data/object").cloned().unwrap_or(Value::Null);

        let mut out = WebhookEvent::new(id, WebhookEventKind::Other, name.clone());

        match name.as_str() {
            "payment.updated" | "payment.created" => {
                let payment = object.get("payment").cloned().unwrap_or(Value::Null);
                out.kind = match str_field(&payment, "/status").as_deref() {
                    Some("COMPLETED") => WebhookEventKind::PaymentSucceeded,
                    Some("FAILED" | "CANCELED") => WebhookEventKind::PaymentFailed,
                    _ => WebhookEventKind::Other,
                };
                out.amount_cents = i64_field(&payment, "/amount_money/amount");
                out.currency = str_field(&payment, "/amount_money/currency").map(|c| c.to_lowercase());
                out.customer_id = str_field(&payment, "/customer_id");
                out.invoice_id = str_field(&payment, "/id");
            }
            "invoice.payment_made" | "invoice.scheduled_charge_failed" => {
                let invoice = object.get("invoice").cloned().unwrap_or(Value::Null);
                out.kind = if name == "invoice.payment_made" {
                    WebhookEventKind::PaymentSucceeded
                } else {
                    WebhookEventKind::PaymentFailed
                };
                let money = invoice
                    .pointer("/payment_requests/0/total_completed_amount_money")
                    .filter(|m| m.get("amount").and_then(Value::as_i64).unwrap_or(0) > 0)
                    .or_else(|| invoice.pointer("/payment_requests/0/computed_amount_money"))
                    .cloned()
                    .unwrap_or(Value::Null);
                out.amount_cents = i64_field(&money, "/amount");
                out.currency = str_field(&money, "/currency").map(|c| c.to_lowercase());
                out.invoice_id = str_field(&invoice, "/id");
                out.subscription_id = str_field(&invoice, "/subscription_id");
                out.customer_id = str_field(&invoice, "/primary_recipient/customer_id");
            }
            "subscription.created" | "subscription.updated" => {
                let sub = object.get("subscription").cloned().unwrap_or(Value::Null);
                let status = str_field(&sub, "/status").map(|s| map_status(&s));
                out.kind = if status == Some(SubscriptionStatus::Cancelled) {
                    WebhookEventKind::SubscriptionCancelled
                } else {
                    WebhookEventKind::SubscriptionUpdated
                };
                out.status = status;
                out.subscription_id = str_field(&sub, "/id");
                out.customer_id = str_field(&sub, "/customer_id");
                out.current_period_end = str_field(&sub, "/charged_through_date")
                    .as_deref()
                    .and_then(parse_date);
            }
            _ => {}
        }

        Ok(out)
    }
}

#[async_trait]
impl PaymentProcessor for SquareProcessor {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Square
    }

    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    async fn create_customer(&self, request: &CustomerRequest) -> IntegrationResult<String> {
        let body = json!({
            "idempotency_key": Uuid::new_v4().to_string(),
            "email_address": request.email,
            "given_name": request.name,
            "reference_id": request.user_id.to_string(),
        });

        let envelope: CustomerEnvelope = http::send_json(self.post("/v2/customers", &body)).await?;
        tracing::info!(customer_id = %envelope.customer.id, "Square customer created");
        Ok(envelope.customer.id)
    }

    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    async fn create_payment(&self, request: &PaymentRequest) -> IntegrationResult<PaymentIntent> {
        let body = json!({
            "idempotency_key": Uuid::new_v4().to_string(),
            "quick_pay": {
                "name": request.description,
                "price_money": {
                    "amount": request.amount_cents,
                    "currency": request.currency.to_uppercase(),
                },
                "location_id": self.location_id,
            },
            "payment_note": format!("user:{}", request.user_id),
        });

        let envelope: PaymentLinkEnvelope =
            http::send_json(self.post("/v2/online-checkout/payment-links", &body)).await?;
        let link = envelope.payment_link;

        Ok(PaymentIntent {
            provider_payment_id: link.order_id.unwrap_or(link.id),
            client_secret: None,
            checkout_url: Some(link.url),
            status: "pending".to_string(),
        })
    }

    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id, plan = %request.plan.id))]
    async fn create_subscription(&self, request: &SubscriptionRequest) -> IntegrationResult<ProviderSubscription> {
        let mut body = json!({
            "idempotency_key": Uuid::new_v4().to_string(),
            "location_id": self.location_id,
            "plan_variation_id": request.plan.provider_price_id,
            "customer_id": request.customer_id,
        });
        if let Some(card) = &request.payment_method_id {
            body["card_id"] = json!(card);
        }

        let envelope: SubscriptionEnvelope = http::send_json(self.post("/v2/subscriptions", &body)).await?;
        Ok(envelope.subscription.into())
    }

    /// Square only cancels at the end of the paid-through period; an
    /// immediate cancel is reported as cancelled locally
    #[tracing::instrument(skip(self))]
    async fn cancel_subscription(
        &self,
        provider_subscription_id: &str,
        at_period_end: bool,
    ) -> IntegrationResult<ProviderSubscription> {
        let path = format!("/v2/subscriptions/{provider_subscription_id}/cancel");
        let envelope: SubscriptionEnvelope = http::send_json(self.post(&path, &json!({}))).await?;

        let mut sub = ProviderSubscription::from(envelope.subscription);
        if at_period_end {
            sub.cancel_at_period_end = true;
            if sub.status == SubscriptionStatus::Cancelled {
                sub.status = SubscriptionStatus::Active;
            }
        } else {
            sub.status = SubscriptionStatus::Cancelled;
        }
        Ok(sub)
    }

    fn verify_webhook(&self, payload: &WebhookPayload<'_>) -> IntegrationResult<WebhookEvent> {
        let key = self
            .webhook_signature_key
            .as_deref()
            .ok_or(IntegrationError::NotConfigured("SQUARE_WEBHOOK_SIGNATURE_KEY"))?;
        let signature = payload
            .signature
            .and_then(|s| STANDARD.decode(s.trim()).ok())
            .ok_or(IntegrationError::InvalidSignature)?;

        let signed: [&[u8]; 2] = [payload.notification_url.as_bytes(), payload.body];
        if !verify_hmac_sha256(key.as_bytes(), &signed, &signature) {
            return Err(IntegrationError::InvalidSignature);
        }

        Self::parse_event(payload.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::hmac_sha256;
    use dreamx_core::Snowflake;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "sq_signature_key";
    const URL: &str = "https://dreamx.test/api/v1/billing/webhooks/square";

    fn processor(api_base: &str) -> SquareProcessor {
        SquareProcessor::new(&SquareConfig {
            access_token: Some("sq_token".into()),
            location_id: Some("LOC1".into()),
            webhook_signature_key: Some(KEY.into()),
            api_base: api_base.into(),
        })
        .unwrap()
    }

    fn verify(p: &SquareProcessor, body: &str, url: &str) -> IntegrationResult<WebhookEvent> {
        let sig = STANDARD.encode(hmac_sha256(KEY.as_bytes(), &[URL.as_bytes(), body.as_bytes()]));
        p.verify_webhook(&WebhookPayload {
            signature: Some(&sig),
            body: body.as_bytes(),
            notification_url: url,
            received_at: Utc::now(),
        })
    }

    #[test]
    fn test_requires_location() {
        let result = SquareProcessor::new(&SquareConfig {
            access_token: Some("t".into()),
            ..SquareConfig::default()
        });
        assert!(matches!(result, Err(IntegrationError::NotConfigured("SQUARE_LOCATION_ID"))));
    }

    #[test]
    fn test_webhook_payment_completed() {
        let body = r#"{"event_id":"e1","type":"payment.updated","data":{"object":{"payment":{"id":"pay_1","status":"COMPLETED","customer_id":"C1","amount_money":{"amount":500,"currency":"USD"}}}}}"#;
        let event = verify(&processor("http://unused"), body, URL).unwrap();
        assert_eq!(event.id, "e1");
        assert_eq!(event.kind, WebhookEventKind::PaymentSucceeded);
        assert_eq!(event.amount_cents, Some(500));
        assert_eq!(event.currency.as_deref(), Some("usd"));
        assert_eq!(event.customer_id.as_deref(), Some("C1"));
    }

    #[test]
    fn test_webhook_signature_covers_url() {
        let body = r#"{"event_id":"e2","type":"payment.updated","data":{}}"#;
        let p = processor("http://unused");
        assert!(matches!(
            verify(&p, body, "https://elsewhere.test/hook"),
            Err(IntegrationError::InvalidSignature)
        ));
    }

    #[test]
    fn test_webhook_subscription_cancelled() {
        let body = r#"{"event_id":"e3","type":"subscription.updated","data":{"object":{"subscription":{"id":"S1","status":"CANCELED","customer_id":"C1","charged_through_date":"2026-01-31"}}}}"#;
        let event = verify(&processor("http://unused"), body, URL).unwrap();
        assert_eq!(event.kind, WebhookEventKind::SubscriptionCancelled);
        assert_eq!(event.subscription_id.as_deref(), Some("S1"));
        assert_eq!(
            event.current_period_end.map(|d| d.date_naive().to_string()).as_deref(),
            Some("2026-01-31")
        );
    }

    #[tokio::test]
    async fn test_payment_link_checkout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/online-checkout/payment-links"))
            .and(header("square-version", SQUARE_VERSION))
            .and(body_partial_json(serde_json::json!({
                "quick_pay": {"price_money": {"amount": 1500, "currency": "USD"}, "location_id": "LOC1"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "payment_link": {"id": "PL1", "url": "https://square.link/u/abc", "order_id": "ORD1"}
            })))
            .mount(&server)
            .await;

        let intent = processor(&server.uri())
            .create_payment(&PaymentRequest {
                user_id: Snowflake::new(1),
                customer_id: "C1".into(),
                amount_cents: 1500,
                currency: "usd".into(),
                description: "Tip".into(),
            })
            .await
            .unwrap();

        assert_eq!(intent.provider_payment_id, "ORD1");
        assert_eq!(intent.checkout_url.as_deref(), Some("https://square.link/u/abc"));
        assert!(intent.client_secret.is_none());
    }

    #[tokio::test]
    async fn test_cancel_at_period_end() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/subscriptions/S1/cancel"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "subscription": {"id": "S1", "status": "ACTIVE", "charged_through_date": "2026-02-01", "canceled_date": "2026-02-01"}
            })))
            .mount(&server)
            .await;

        let sub = processor(&server.uri()).cancel_subscription("S1", true).await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(sub.cancel_at_period_end);
        assert!(sub.current_period_end.is_some());
    }
}
