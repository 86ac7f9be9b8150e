//! Shared fixtures for service tests: an in-memory database, the local bus
//! and recording fakes for the outbound ports.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dreamx_common::AppConfig;
use dreamx_core::{
    CursorQuery, CustomerRequest, DomainError, IntegrationError, IntegrationResult, Invoice,
    InvoiceRepository, Mailer, OutgoingEmail, PaymentIntent, PaymentProcessor, PaymentProvider,
    PaymentRequest, ProviderSubscription, RepoResult, Snowflake, SubscriptionRequest,
    SubscriptionStatus, User, UserRole, WebhookEvent, WebhookEventKind, WebhookPayload,
};
use dreamx_db::{create_memory_pool, run_migrations};
use dreamx_integrations::IdentityProviders;
use dreamx_realtime::{EventBus, LocalEventBus};
use serde::Deserialize;

use super::context::{Repositories, ServiceContext, ServiceContextBuilder};

pub const TEST_SECRET: &str = "service-test-secret-at-least-32-bytes!";

/// Mailer that keeps every message it is asked to send
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Wait for the delivery worker to hand over at least `count` emails
    pub async fn wait_for(&self, count: usize) -> Vec<OutgoingEmail> {
        for _ in 0..200 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {count} emails, got {:?}", self.sent());
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> IntegrationResult<()> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Event body the fake processor accepts on its webhook
#[derive(Debug, Deserialize)]
struct FakeEvent {
    id: String,
    kind: WebhookEventKind,
    subscription_id: Option<String>,
    customer_id: Option<String>,
    invoice_id: Option<String>,
    status: Option<String>,
    amount_cents: Option<i64>,
    user_id: Option<Snowflake>,
    current_period_end: Option<DateTime<Utc>>,
}

/// Payment processor that succeeds locally and records cancellations
#[derive(Debug, Default)]
pub struct FakePayments {
    pub customers: Mutex<Vec<String>>,
    pub cancelled: Mutex<Vec<(String, bool)>>,
    pub fail_next: Mutex<bool>,
}

impl FakePayments {
    pub const SIGNATURE: &'static str = "valid-signature";

    fn take_failure(&self) -> IntegrationResult<()> {
        let mut fail = self.fail_next.lock().unwrap();
        if *fail {
            *fail = false;
            return Err(IntegrationError::Provider { status: 402, message: "card declined".into() });
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentProcessor for FakePayments {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Stripe
    }

    async fn create_customer(&self, request: &CustomerRequest) -> IntegrationResult<String> {
        let id = format!("cus_{}", request.user_id);
        self.customers.lock().unwrap().push(id.clone());
        Ok(id)
    }

    async fn create_payment(&self, request: &PaymentRequest) -> IntegrationResult<PaymentIntent> {
        self.take_failure()?;
        Ok(PaymentIntent {
            provider_payment_id: format!("pi_{}", request.amount_cents),
            client_secret: Some("pi_secret".into()),
            checkout_url: None,
            status: "requires_confirmation".into(),
        })
    }

    async fn create_subscription(&self, request: &SubscriptionRequest) -> IntegrationResult<ProviderSubscription> {
        self.take_failure()?;
        Ok(ProviderSubscription {
            provider_subscription_id: format!("sub_{}", request.user_id),
            status: SubscriptionStatus::Active,
            current_period_end: Some(Utc::now() + chrono::Duration::days(30)),
            cancel_at_period_end: false,
            checkout_url: None,
        })
    }

    async fn cancel_subscription(
        &self,
        provider_subscription_id: &str,
        at_period_end: bool,
    ) -> IntegrationResult<ProviderSubscription> {
        self.cancelled
            .lock()
            .unwrap()
            .push((provider_subscription_id.to_string(), at_period_end));
        Ok(ProviderSubscription {
            provider_subscription_id: provider_subscription_id.to_string(),
            status: if at_period_end { SubscriptionStatus::Active } else { SubscriptionStatus::Cancelled },
            current_period_end: Some(Utc::now() + chrono::Duration::days(30)),
            cancel_at_period_end: at_period_end,
            checkout_url: None,
        })
    }

    fn verify_webhook(&self, payload: &WebhookPayload<'_>) -> IntegrationResult<WebhookEvent> {
        if payload.signature != Some(Self::SIGNATURE) {
            return Err(IntegrationError::InvalidSignature);
        }
        let raw: FakeEvent =
            serde_json::from_slice(payload.body).map_err(|e| IntegrationError::Decode(e.to_string()))?;

        let mut event = WebhookEvent::new(raw.id, raw.kind, "fake.event");
        event.subscription_id = raw.subscription_id;
        event.customer_id = raw.customer_id;
        event.invoice_id = raw.invoice_id;
        event.status = raw.status.as_deref().and_then(SubscriptionStatus::parse);
        event.amount_cents = raw.amount_cents;
        event.currency = raw.amount_cents.map(|_| "usd".to_string());
        event.user_id = raw.user_id;
        event.current_period_end = raw.current_period_end;
        Ok(event)
    }
}

/// Invoice store whose next append fails like a locked database
pub struct FlakyInvoices {
    inner: Arc<dyn InvoiceRepository>,
    pub fail_next: Mutex<bool>,
}

#[async_trait]
impl InvoiceRepository for FlakyInvoices {
    async fn append(&self, invoice: &Invoice) -> RepoResult<()> {
        let fail = std::mem::take(&mut *self.fail_next.lock().unwrap());
        if fail {
            return Err(DomainError::DatabaseError("database is locked".into()));
        }
        self.inner.append(invoice).await
    }

    async fn list_by_user(&self, user_id: Snowflake, query: CursorQuery) -> RepoResult<Vec<Invoice>> {
        self.inner.list_by_user(user_id, query).await
    }
}

/// Service context plus handles on its fakes
pub struct Harness {
    pub ctx: ServiceContext,
    pub mailer: Arc<RecordingMailer>,
    pub payments: Arc<FakePayments>,
    pub bus: Arc<LocalEventBus>,
}

pub fn test_config(extra: &[(&str, &str)]) -> AppConfig {
    let extra: Vec<(String, String)> = extra.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
    AppConfig::from_lookup(|key| {
        if key == "JWT_SECRET" {
            return Some(TEST_SECRET.to_string());
        }
        extra.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    })
    .unwrap()
}

pub async fn harness_with(config: AppConfig) -> Harness {
    harness_custom(config, IdentityProviders::default()).await
}

pub async fn harness_custom(config: AppConfig, providers: IdentityProviders) -> Harness {
    build_harness(config, providers, |_| {}).await
}

/// Harness whose invoice store can be told to fail once
pub async fn harness_with_flaky_invoices() -> (Harness, Arc<FlakyInvoices>) {
    let mut flaky = None;
    let h = build_harness(test_config(&[]), IdentityProviders::default(), |repos| {
        let wrapper = Arc::new(FlakyInvoices {
            inner: Arc::clone(&repos.invoices),
            fail_next: Mutex::new(false),
        });
        repos.invoices = Arc::clone(&wrapper) as Arc<dyn InvoiceRepository>;
        flaky = Some(wrapper);
    })
    .await;
    (h, flaky.unwrap())
}

async fn build_harness(
    config: AppConfig,
    providers: IdentityProviders,
    customize: impl FnOnce(&mut Repositories),
) -> Harness {
    let pool = create_memory_pool().await.unwrap();
    run_migrations(&pool).await.unwrap();

    let mut repos = Repositories::sqlite(&pool);
    customize(&mut repos);

    let mailer = Arc::new(RecordingMailer::default());
    let payments = Arc::new(FakePayments::default());
    let bus = Arc::new(LocalEventBus::default());

    let ctx = ServiceContextBuilder::new()
        .pool(pool)
        .repositories(repos)
        .config(Arc::new(config))
        .event_bus(Arc::clone(&bus) as Arc<dyn EventBus>)
        .payments(Arc::clone(&payments) as Arc<dyn PaymentProcessor>)
        .mailer(Arc::clone(&mailer) as Arc<dyn Mailer>)
        .identity_providers(providers)
        .build()
        .unwrap();

    Harness { ctx, mailer, payments, bus }
}

pub async fn harness() -> Harness {
    harness_with(test_config(&[])).await
}

pub async fn context() -> ServiceContext {
    harness().await.ctx
}

/// Insert a verified user without a password
pub async fn create_user(ctx: &ServiceContext, username: &str) -> User {
    let mut user = User::new(
        ctx.generate_id(),
        username.to_string(),
        format!("{username}@example.com"),
        username.to_string(),
    );
    user.email_verified = true;
    ctx.user_repo().create(&user, None).await.unwrap();
    user
}

pub async fn create_staff(ctx: &ServiceContext, username: &str, role: UserRole) -> User {
    let mut user = create_user(ctx, username).await;
    user.role = role;
    ctx.user_repo().update(&user).await.unwrap();
    user
}
