//! Billing service
//!
//! Subscriptions, stored payment methods, one-time payments and invoices on
//! top of whichever `PaymentProcessor` the context was built with. Provider
//! webhooks are verified, deduplicated by event id, then folded into the
//! local subscription and invoice records.

use chrono::Utc;
use dreamx_core::{
    CursorQuery, CustomerRequest, DomainError, Invoice, InvoiceStatus, Notification,
    NotificationKind, PaymentCustomer, PaymentMethod, PaymentRequest, Plan, Snowflake,
    Subscription, SubscriptionRequest, SubscriptionStatus, User, WebhookEvent, WebhookEventKind,
    WebhookPayload,
};
use tracing::{debug, info, instrument, warn};

use crate::dto::{
    AddPaymentMethodRequest, CancelSubscriptionRequest, CursorParams, InvoiceResponse,
    OneTimePaymentRequest, PaymentMethodResponse, PaymentResponse, SubscribeRequest,
    SubscriptionResponse, WebhookAckResponse,
};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::notification::NotificationService;

/// Path providers post webhooks to
pub const WEBHOOK_PATH: &str = "/api/v1/billing/webhook";

const DEFAULT_CURRENCY: &str = "usd";

/// Billing service
pub struct BillingService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> BillingService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub fn list_plans(&self) -> Vec<Plan> {
        self.ctx.config().payments.plans.clone()
    }

    /// Provider customer id for a user, created on first use
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn ensure_customer(&self, user: &User) -> ServiceResult<String> {
        let provider = self.ctx.payments().provider();
        if let Some(existing) = self.ctx.payment_customer_repo().find(user.id, provider).await? {
            return Ok(existing.customer_id);
        }

        let customer_id = self
            .ctx
            .payments()
            .create_customer(&CustomerRequest {
                user_id: user.id,
                email: user.email.clone(),
                name: user.display_name.clone(),
            })
            .await?;

        // a concurrent request may have won; the stored mapping is authoritative
        let stored = self
            .ctx
            .payment_customer_repo()
            .create(&PaymentCustomer {
                user_id: user.id,
                provider,
                customer_id,
                created_at: Utc::now(),
            })
            .await?;

        info!(provider = provider.as_str(), "Payment customer created");
        Ok(stored.customer_id)
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    #[instrument(skip(self, request), fields(plan = %request.plan))]
    pub async fn subscribe(&self, user_id: Snowflake, request: SubscribeRequest) -> ServiceResult<SubscriptionResponse> {
        let user = self.ctx.acting_user(user_id).await?;
        let plan = self
            .ctx
            .config()
            .payments
            .plan(&request.plan)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("Plan", request.plan.clone()))?;

        let existing = self.ctx.subscription_repo().find_by_user(user_id).await?;
        if existing.as_ref().is_some_and(|s| s.status.is_live()) {
            return Err(DomainError::SubscriptionAlreadyActive.into());
        }

        let customer_id = self.ensure_customer(&user).await?;
        let provider = self.ctx.payments().provider();
        let created = self
            .ctx
            .payments()
            .create_subscription(&SubscriptionRequest {
                user_id,
                email: user.email.clone(),
                customer_id,
                plan: plan.clone(),
                payment_method_id: request.payment_method_id,
            })
            .await?;

        let now = Utc::now();
        let subscription = Subscription {
            id: existing.as_ref().map_or_else(|| self.ctx.generate_id(), |s| s.id),
            user_id,
            plan: plan.id.clone(),
            status: created.status,
            provider,
            provider_subscription_id: created.provider_subscription_id,
            current_period_end: created.current_period_end,
            cancel_at_period_end: created.cancel_at_period_end,
            created_at: existing.as_ref().map_or(now, |s| s.created_at),
            updated_at: now,
        };
        self.ctx.subscription_repo().upsert(&subscription).await?;

        self.ctx
            .invoice_repo()
            .append(&Invoice {
                id: self.ctx.generate_id(),
                user_id,
                subscription_id: Some(subscription.id),
                provider,
                provider_invoice_id: None,
                amount_cents: plan.amount_cents,
                currency: plan.currency.clone(),
                status: InvoiceStatus::Open,
                description: Some(format!("{} ({})", plan.name, plan.interval)),
                created_at: now,
            })
            .await?;

        info!(
            subscription_id = %subscription.id,
            provider = provider.as_str(),
            status = subscription.status.as_str(),
            "Subscription started"
        );

        let mut response = SubscriptionResponse::from(&subscription);
        response.checkout_url = created.checkout_url;
        Ok(response)
    }

    /// Cancel now, or flag the subscription to end with the current period
    #[instrument(skip(self))]
    pub async fn cancel_subscription(
        &self,
        user_id: Snowflake,
        request: CancelSubscriptionRequest,
    ) -> ServiceResult<SubscriptionResponse> {
        let mut subscription = self
            .ctx
            .subscription_repo()
            .find_by_user(user_id)
            .await?
            .ok_or(DomainError::SubscriptionNotFound)?;
        if subscription.status == SubscriptionStatus::Cancelled {
            return Err(ServiceError::conflict("Subscription is already cancelled"));
        }

        let remote = self
            .ctx
            .payments()
            .cancel_subscription(&subscription.provider_subscription_id, request.at_period_end)
            .await?;

        if request.at_period_end {
            subscription.cancel_at_period_end = true;
        } else {
            subscription.status = SubscriptionStatus::Cancelled;
            subscription.cancel_at_period_end = false;
        }
        if remote.current_period_end.is_some() {
            subscription.current_period_end = remote.current_period_end;
        }
        subscription.updated_at = Utc::now();
        self.ctx.subscription_repo().upsert(&subscription).await?;

        info!(subscription_id = %subscription.id, at_period_end = request.at_period_end, "Subscription cancelled");
        Ok(SubscriptionResponse::from(subscription))
    }

    pub async fn current_subscription(&self, user_id: Snowflake) -> ServiceResult<Option<SubscriptionResponse>> {
        let subscription = self.ctx.subscription_repo().find_by_user(user_id).await?;
        Ok(subscription.map(SubscriptionResponse::from))
    }

    // =========================================================================
    // Payment methods
    // =========================================================================

    #[instrument(skip(self, request))]
    pub async fn add_payment_method(
        &self,
        user_id: Snowflake,
        request: AddPaymentMethodRequest,
    ) -> ServiceResult<PaymentMethodResponse> {
        self.ctx.acting_user(user_id).await?;

        let method = PaymentMethod {
            id: self.ctx.generate_id(),
            user_id,
            provider: self.ctx.payments().provider(),
            provider_method_id: request.provider_method_id.trim().to_string(),
            brand: request.brand.map(|b| b.trim().to_lowercase()),
            last4: request.last4,
            exp_month: request.exp_month,
            exp_year: request.exp_year,
            is_default: request.make_default,
            created_at: Utc::now(),
        };
        if let Some(last4) = &method.last4 {
            if !last4.chars().all(|c| c.is_ascii_digit()) {
                return Err(ServiceError::validation("last4 must be 4 digits"));
            }
        }

        // the first method becomes the default regardless
        let stored = self.ctx.payment_method_repo().create(&method).await?;

        info!(method_id = %stored.id, is_default = stored.is_default, "Payment method added");
        Ok(PaymentMethodResponse::from(stored))
    }

    pub async fn list_payment_methods(&self, user_id: Snowflake) -> ServiceResult<Vec<PaymentMethodResponse>> {
        let methods = self.ctx.payment_method_repo().list_by_user(user_id).await?;
        Ok(methods.into_iter().map(PaymentMethodResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn set_default_payment_method(&self, user_id: Snowflake, method_id: Snowflake) -> ServiceResult<()> {
        self.ctx.payment_method_repo().set_default(user_id, method_id).await?;
        info!(method_id = %method_id, "Default payment method changed");
        Ok(())
    }

    /// Removing the default promotes the newest remaining method
    #[instrument(skip(self))]
    pub async fn remove_payment_method(&self, user_id: Snowflake, method_id: Snowflake) -> ServiceResult<()> {
        self.ctx.payment_method_repo().remove(user_id, method_id).await?;
        info!(method_id = %method_id, "Payment method removed");
        Ok(())
    }

    // =========================================================================
    // Payments and invoices
    // =========================================================================

    #[instrument(skip(self, request), fields(amount = request.amount_cents))]
    pub async fn one_time_payment(&self, user_id: Snowflake, request: OneTimePaymentRequest) -> ServiceResult<PaymentResponse> {
        let user = self.ctx.acting_user(user_id).await?;
        if request.amount_cents <= 0 {
            return Err(ServiceError::validation("Amount must be positive"));
        }

        let customer_id = self.ensure_customer(&user).await?;
        let intent = self
            .ctx
            .payments()
            .create_payment(&PaymentRequest {
                user_id,
                customer_id,
                amount_cents: request.amount_cents,
                currency: request
                    .currency
                    .map(|c| c.to_lowercase())
                    .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
                description: request.description.trim().to_string(),
            })
            .await?;

        info!(payment_id = %intent.provider_payment_id, "Payment created");
        Ok(PaymentResponse::new(self.ctx.payments().provider(), intent))
    }

    pub async fn list_invoices(&self, user_id: Snowflake, params: CursorParams) -> ServiceResult<Vec<InvoiceResponse>> {
        let invoices = self
            .ctx
            .invoice_repo()
            .list_by_user(user_id, CursorQuery::from(params))
            .await?;
        Ok(invoices.into_iter().map(InvoiceResponse::from).collect())
    }

    // =========================================================================
    // Webhooks
    // =========================================================================

    /// Verify, dedupe and apply a provider webhook
    #[instrument(skip(self, signature, body), fields(size = body.len()))]
    pub async fn handle_webhook(&self, signature: Option<&str>, body: &[u8]) -> ServiceResult<WebhookAckResponse> {
        let notification_url = format!("{}{WEBHOOK_PATH}", self.ctx.config().app.public_url.trim_end_matches('/'));
        let received_at = Utc::now();
        let event = self.ctx.payments().verify_webhook(&WebhookPayload {
            signature,
            body,
            notification_url: &notification_url,
            received_at,
        })?;

        let provider = self.ctx.payments().provider();
        if !self.ctx.payment_event_repo().record(provider, &event.id, received_at).await? {
            debug!(event_id = %event.id, "Duplicate webhook ignored");
            return Ok(WebhookAckResponse { received: true, duplicate: true });
        }

        info!(event_id = %event.id, name = %event.name, kind = ?event.kind, "Webhook received");

        if let Err(e) = self.apply_webhook(&event).await {
            warn!(event_id = %event.id, error = %e, "Webhook processing failed; releasing event for redelivery");
            if let Err(forget_err) = self.ctx.payment_event_repo().forget(provider, &event.id).await {
                warn!(event_id = %event.id, error = %forget_err, "Failed to release webhook event");
            }
            return Err(e);
        }

        Ok(WebhookAckResponse { received: true, duplicate: false })
    }

    /// Fold one verified event into invoices and subscriptions
    async fn apply_webhook(&self, event: &WebhookEvent) -> ServiceResult<()> {
        match event.kind {
            WebhookEventKind::PaymentSucceeded => self.record_payment(event, InvoiceStatus::Paid).await?,
            WebhookEventKind::PaymentFailed => {
                self.record_payment(event, InvoiceStatus::Failed).await?;
                self.update_subscription(event, |s| s.status = SubscriptionStatus::PastDue).await?;
            }
            WebhookEventKind::SubscriptionUpdated => {
                self.update_subscription(event, |s| {
                    if let Some(status) = event.status {
                        s.status = status;
                    }
                    if event.current_period_end.is_some() {
                        s.current_period_end = event.current_period_end;
                    }
                })
                .await?;
            }
            WebhookEventKind::SubscriptionCancelled => {
                self.update_subscription(event, |s| {
                    s.status = SubscriptionStatus::Cancelled;
                    s.cancel_at_period_end = false;
                })
                .await?;
            }
            WebhookEventKind::Other => debug!(name = %event.name, "Unhandled webhook event"),
        }
        Ok(())
    }

    /// Local subscription an event refers to, by provider id or owner
    async fn event_subscription(&self, event: &WebhookEvent) -> ServiceResult<Option<Subscription>> {
        let provider = self.ctx.payments().provider();
        if let Some(id) = &event.subscription_id {
            if let Some(found) = self.ctx.subscription_repo().find_by_provider_id(provider, id).await? {
                return Ok(Some(found));
            }
        }
        match self.event_user(event).await? {
            Some(user_id) => Ok(self.ctx.subscription_repo().find_by_user(user_id).await?),
            None => Ok(None),
        }
    }

    /// User an event belongs to: echoed metadata first, then the customer mapping
    async fn event_user(&self, event: &WebhookEvent) -> ServiceResult<Option<Snowflake>> {
        if event.user_id.is_some() {
            return Ok(event.user_id);
        }
        let provider = self.ctx.payments().provider();
        if let Some(customer_id) = &event.customer_id {
            if let Some(customer) = self.ctx.payment_customer_repo().find_by_customer_id(provider, customer_id).await? {
                return Ok(Some(customer.user_id));
            }
        }
        if let Some(id) = &event.subscription_id {
            if let Some(sub) = self.ctx.subscription_repo().find_by_provider_id(provider, id).await? {
                return Ok(Some(sub.user_id));
            }
        }
        Ok(None)
    }

    async fn record_payment(&self, event: &WebhookEvent, status: InvoiceStatus) -> ServiceResult<()> {
        let Some(user_id) = self.event_user(event).await? else {
            warn!(event_id = %event.id, "Payment event for an unknown customer");
            return Ok(());
        };
        let subscription = self.event_subscription(event).await?;

        let invoice = Invoice {
            id: self.ctx.generate_id(),
            user_id,
            subscription_id: subscription.as_ref().map(|s| s.id),
            provider: self.ctx.payments().provider(),
            provider_invoice_id: event.invoice_id.clone(),
            amount_cents: event.amount_cents.unwrap_or_default(),
            currency: event.currency.clone().unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            status,
            description: Some(event.name.clone()),
            created_at: Utc::now(),
        };
        self.ctx.invoice_repo().append(&invoice).await?;

        if status == InvoiceStatus::Failed {
            NotificationService::new(self.ctx)
                .notify(Notification::new(
                    self.ctx.generate_id(),
                    user_id,
                    None,
                    NotificationKind::System,
                    "A payment failed. Please update your payment method.".to_string(),
                ))
                .await;
        }

        info!(invoice_id = %invoice.id, status = status.as_str(), "Invoice recorded from webhook");
        Ok(())
    }

    async fn update_subscription(&self, event: &WebhookEvent, apply: impl FnOnce(&mut Subscription)) -> ServiceResult<()> {
        let Some(mut subscription) = self.event_subscription(event).await? else {
            warn!(event_id = %event.id, "Subscription event for an unknown subscription");
            return Ok(());
        };

        apply(&mut subscription);
        subscription.updated_at = Utc::now();
        self.ctx.subscription_repo().upsert(&subscription).await?;

        info!(
            subscription_id = %subscription.id,
            status = subscription.status.as_str(),
            "Subscription updated from webhook"
        );
        Ok(())
    }
}
