//! Billing mappers

use dreamx_core::entities::{
    Invoice, InvoiceStatus, PaymentCustomer, PaymentMethod, PaymentProvider, Subscription,
    SubscriptionStatus,
};
use dreamx_core::value_objects::Snowflake;

use crate::models::{InvoiceModel, PaymentCustomerModel, PaymentMethodModel, SubscriptionModel};

fn provider(raw: &str) -> PaymentProvider {
    PaymentProvider::parse(raw).unwrap_or(PaymentProvider::Stripe)
}

impl From<SubscriptionModel> for Subscription {
    fn from(model: SubscriptionModel) -> Self {
        Subscription {
            id: Snowflake::new(model.id),
            user_id: Snowflake::new(model.user_id),
            plan: model.plan,
            status: SubscriptionStatus::parse(&model.status).unwrap_or(SubscriptionStatus::PastDue),
            provider: provider(&model.provider),
            provider_subscription_id: model.provider_subscription_id,
            current_period_end: model.current_period_end,
            cancel_at_period_end: model.cancel_at_period_end,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<PaymentMethodModel> for PaymentMethod {
    fn from(model: PaymentMethodModel) -> Self {
        PaymentMethod {
            id: Snowflake::new(model.id),
            user_id: Snowflake::new(model.user_id),
            provider: provider(&model.provider),
            provider_method_id: model.provider_method_id,
            brand: model.brand,
            last4: model.last4,
            exp_month: model.exp_month,
            exp_year: model.exp_year,
            is_default: model.is_default,
            created_at: model.created_at,
        }
    }
}

impl From<InvoiceModel> for Invoice {
    fn from(model: InvoiceModel) -> Self {
        Invoice {
            id: Snowflake::new(model.id),
            user_id: Snowflake::new(model.user_id),
            subscription_id: model.subscription_id.map(Snowflake::new),
            provider: provider(&model.provider),
            provider_invoice_id: model.provider_invoice_id,
            amount_cents: model.amount_cents,
            currency: model.currency,
            status: InvoiceStatus::parse(&model.status).unwrap_or(InvoiceStatus::Open),
            description: model.description,
            created_at: model.created_at,
        }
    }
}

impl From<PaymentCustomerModel> for PaymentCustomer {
    fn from(model: PaymentCustomerModel) -> Self {
        PaymentCustomer {
            user_id: Snowflake::new(model.user_id),
            provider: provider(&model.provider),
            customer_id: model.customer_id,
            created_at: model.created_at,
        }
    }
}
