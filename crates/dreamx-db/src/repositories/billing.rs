//! SQLite implementations of the billing repositories

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use dreamx_core::entities::{
    Invoice, PaymentCustomer, PaymentMethod, PaymentProvider, Subscription, SubscriptionStatus,
};
use dreamx_core::error::DomainError;
use dreamx_core::traits::{
    CursorQuery, InvoiceRepository, PaymentCustomerRepository, PaymentEventRepository,
    PaymentMethodRepository, RepoResult, SubscriptionRepository,
};
use dreamx_core::value_objects::Snowflake;

use crate::models::{InvoiceModel, PaymentCustomerModel, PaymentMethodModel, SubscriptionModel};

use super::error::map_db_error;

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, plan, status, provider, provider_subscription_id, \
     current_period_end, cancel_at_period_end, created_at, updated_at";

const METHOD_COLUMNS: &str =
    "id, user_id, provider, provider_method_id, brand, last4, exp_month, exp_year, is_default, created_at";

// ============================================================================
// Subscriptions
// ============================================================================

#[derive(Clone)]
pub struct SqliteSubscriptionRepository {
    pool: SqlitePool,
}

impl SqliteSubscriptionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SqliteSubscriptionRepository {
    #[instrument(skip(self))]
    async fn find_by_user(&self, user_id: Snowflake) -> RepoResult<Option<Subscription>> {
        let result = sqlx::query_as::<_, SubscriptionModel>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = ?1"
        ))
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Subscription::from))
    }

    #[instrument(skip(self))]
    async fn find_by_provider_id(
        &self,
        provider: PaymentProvider,
        provider_subscription_id: &str,
    ) -> RepoResult<Option<Subscription>> {
        let result = sqlx::query_as::<_, SubscriptionModel>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE provider = ?1 AND provider_subscription_id = ?2"
        ))
        .bind(provider.as_str())
        .bind(provider_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Subscription::from))
    }

    #[instrument(skip(self, subscription), fields(user_id = %subscription.user_id, status = subscription.status.as_str()))]
    async fn upsert(&self, subscription: &Subscription) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO subscriptions (id, user_id, plan, status, provider, provider_subscription_id,
                                       current_period_end, cancel_at_period_end, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(user_id) DO UPDATE SET
                plan = excluded.plan,
                status = excluded.status,
                provider = excluded.provider,
                provider_subscription_id = excluded.provider_subscription_id,
                current_period_end = excluded.current_period_end,
                cancel_at_period_end = excluded.cancel_at_period_end,
                updated_at = excluded.updated_at
            ",
        )
        .bind(subscription.id.into_inner())
        .bind(subscription.user_id.into_inner())
        .bind(&subscription.plan)
        .bind(subscription.status.as_str())
        .bind(subscription.provider.as_str())
        .bind(&subscription.provider_subscription_id)
        .bind(subscription.current_period_end)
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.created_at)
        .bind(subscription.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn count_live(&self) -> RepoResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE status IN (?1, ?2)")
            .bind(SubscriptionStatus::Active.as_str())
            .bind(SubscriptionStatus::Trialing.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }
}

// ============================================================================
// Payment methods
// ============================================================================

#[derive(Clone)]
pub struct SqlitePaymentMethodRepository {
    pool: SqlitePool,
}

impl SqlitePaymentMethodRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentMethodRepository for SqlitePaymentMethodRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<PaymentMethod>> {
        let result = sqlx::query_as::<_, PaymentMethodModel>(&format!(
            "SELECT {METHOD_COLUMNS} FROM payment_methods WHERE id = ?1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(PaymentMethod::from))
    }

    #[instrument(skip(self))]
    async fn list_by_user(&self, user_id: Snowflake) -> RepoResult<Vec<PaymentMethod>> {
        let results = sqlx::query_as::<_, PaymentMethodModel>(&format!(
            "SELECT {METHOD_COLUMNS} FROM payment_methods WHERE user_id = ?1 ORDER BY is_default DESC, id DESC"
        ))
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(PaymentMethod::from).collect())
    }

    #[instrument(skip(self, method), fields(user_id = %method.user_id))]
    async fn create(&self, method: &PaymentMethod) -> RepoResult<PaymentMethod> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let has_default: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM payment_methods WHERE user_id = ?1 AND is_default = 1)",
        )
        .bind(method.user_id.into_inner())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if method.is_default && has_default {
            sqlx::query("UPDATE payment_methods SET is_default = 0 WHERE user_id = ?1 AND is_default = 1")
                .bind(method.user_id.into_inner())
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
        }

        let stored = PaymentMethod {
            is_default: method.is_default || !has_default,
            ..method.clone()
        };

        sqlx::query(
            r"
            INSERT INTO payment_methods (id, user_id, provider, provider_method_id, brand, last4,
                                         exp_month, exp_year, is_default, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(stored.id.into_inner())
        .bind(stored.user_id.into_inner())
        .bind(stored.provider.as_str())
        .bind(&stored.provider_method_id)
        .bind(&stored.brand)
        .bind(&stored.last4)
        .bind(stored.exp_month)
        .bind(stored.exp_year)
        .bind(stored.is_default)
        .bind(stored.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(stored)
    }

    #[instrument(skip(self))]
    async fn set_default(&self, user_id: Snowflake, id: Snowflake) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let owned: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM payment_methods WHERE id = ?1 AND user_id = ?2)")
                .bind(id.into_inner())
                .bind(user_id.into_inner())
                .fetch_one(&mut *tx)
                .await
                .map_err(map_db_error)?;
        if !owned {
            return Err(DomainError::PaymentMethodNotFound(id));
        }

        sqlx::query("UPDATE payment_methods SET is_default = 0 WHERE user_id = ?1 AND is_default = 1")
            .bind(user_id.into_inner())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        sqlx::query("UPDATE payment_methods SET is_default = 1 WHERE id = ?1")
            .bind(id.into_inner())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, user_id: Snowflake, id: Snowflake) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let was_default: Option<bool> =
            sqlx::query_scalar("DELETE FROM payment_methods WHERE id = ?1 AND user_id = ?2 RETURNING is_default")
                .bind(id.into_inner())
                .bind(user_id.into_inner())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_db_error)?;

        match was_default {
            None => return Err(DomainError::PaymentMethodNotFound(id)),
            Some(true) => {
                let promoted = sqlx::query(
                    r"
                    UPDATE payment_methods SET is_default = 1
                    WHERE id = (SELECT id FROM payment_methods WHERE user_id = ?1 ORDER BY id DESC LIMIT 1)
                    ",
                )
                .bind(user_id.into_inner())
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?
                .rows_affected();
                debug!(promoted, "Default payment method removed");
            }
            Some(false) => {}
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }
}

// ============================================================================
// Invoices
// ============================================================================

#[derive(Clone)]
pub struct SqliteInvoiceRepository {
    pool: SqlitePool,
}

impl SqliteInvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceRepository for SqliteInvoiceRepository {
    #[instrument(skip(self, invoice), fields(user_id = %invoice.user_id, status = invoice.status.as_str()))]
    async fn append(&self, invoice: &Invoice) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO invoices (id, user_id, subscription_id, provider, provider_invoice_id,
                                  amount_cents, currency, status, description, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(invoice.id.into_inner())
        .bind(invoice.user_id.into_inner())
        .bind(invoice.subscription_id.map(Snowflake::into_inner))
        .bind(invoice.provider.as_str())
        .bind(&invoice.provider_invoice_id)
        .bind(invoice.amount_cents)
        .bind(&invoice.currency)
        .bind(invoice.status.as_str())
        .bind(&invoice.description)
        .bind(invoice.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_by_user(&self, user_id: Snowflake, query: CursorQuery) -> RepoResult<Vec<Invoice>> {
        let results = sqlx::query_as::<_, InvoiceModel>(
            r"
            SELECT id, user_id, subscription_id, provider, provider_invoice_id, amount_cents,
                   currency, status, description, created_at
            FROM invoices
            WHERE user_id = ?1
              AND (?2 IS NULL OR id < ?2)
              AND (?3 IS NULL OR id > ?3)
            ORDER BY id DESC
            LIMIT ?4
            ",
        )
        .bind(user_id.into_inner())
        .bind(query.before.map(Snowflake::into_inner))
        .bind(query.after.map(Snowflake::into_inner))
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Invoice::from).collect())
    }
}

// ============================================================================
// Payment customers and webhook events
// ============================================================================

#[derive(Clone)]
pub struct SqlitePaymentCustomerRepository {
    pool: SqlitePool,
}

impl SqlitePaymentCustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentCustomerRepository for SqlitePaymentCustomerRepository {
    #[instrument(skip(self))]
    async fn find(&self, user_id: Snowflake, provider: PaymentProvider) -> RepoResult<Option<PaymentCustomer>> {
        let result = sqlx::query_as::<_, PaymentCustomerModel>(
            "SELECT user_id, provider, customer_id, created_at FROM payment_customers WHERE user_id = ?1 AND provider = ?2",
        )
        .bind(user_id.into_inner())
        .bind(provider.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(PaymentCustomer::from))
    }

    #[instrument(skip(self))]
    async fn find_by_customer_id(&self, provider: PaymentProvider, customer_id: &str) -> RepoResult<Option<PaymentCustomer>> {
        let result = sqlx::query_as::<_, PaymentCustomerModel>(
            "SELECT user_id, provider, customer_id, created_at FROM payment_customers WHERE provider = ?1 AND customer_id = ?2",
        )
        .bind(provider.as_str())
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(PaymentCustomer::from))
    }

    #[instrument(skip(self, customer), fields(user_id = %customer.user_id, provider = customer.provider.as_str()))]
    async fn create(&self, customer: &PaymentCustomer) -> RepoResult<PaymentCustomer> {
        let stored = sqlx::query_as::<_, PaymentCustomerModel>(
            r"
            INSERT INTO payment_customers (user_id, provider, customer_id, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id, provider) DO UPDATE SET customer_id = payment_customers.customer_id
            RETURNING user_id, provider, customer_id, created_at
            ",
        )
        .bind(customer.user_id.into_inner())
        .bind(customer.provider.as_str())
        .bind(&customer.customer_id)
        .bind(customer.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(PaymentCustomer::from(stored))
    }
}

#[derive(Clone)]
pub struct SqlitePaymentEventRepository {
    pool: SqlitePool,
}

impl SqlitePaymentEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentEventRepository for SqlitePaymentEventRepository {
    #[instrument(skip(self))]
    async fn record(&self, provider: PaymentProvider, event_id: &str, at: DateTime<Utc>) -> RepoResult<bool> {
        let result = sqlx::query("INSERT OR IGNORE INTO payment_events (provider, event_id, received_at) VALUES (?1, ?2, ?3)")
            .bind(provider.as_str())
            .bind(event_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn forget(&self, provider: PaymentProvider, event_id: &str) -> RepoResult<()> {
        sqlx::query("DELETE FROM payment_events WHERE provider = ?1 AND event_id = ?2")
            .bind(provider.as_str())
            .bind(event_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }
}
