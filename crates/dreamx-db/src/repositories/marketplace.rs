//! SQLite implementations of the marketplace repositories

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::instrument;

use dreamx_core::entities::{
    OrderStatus, RatingSummary, ServiceListing, ServiceOrder, ServiceReview, ServiceStatus,
};
use dreamx_core::error::DomainError;
use dreamx_core::traits::{
    CursorQuery, OrderRepository, RepoResult, ReviewRepository, ServiceFilter, ServiceListingRepository,
};
use dreamx_core::value_objects::Snowflake;

use crate::models::{RatingModel, ServiceModel, ServiceOrderModel, ServiceReviewModel};

use super::error::{like_contains, map_db_error, map_unique_violation};

const SERVICE_COLUMNS: &str =
    "id, seller_id, title, description, category, price_cents, currency, delivery_days, status, created_at, updated_at";

const ORDER_COLUMNS: &str =
    "id, service_id, buyer_id, seller_id, price_cents, currency, requirements, status, created_at, updated_at, completed_at";

// ============================================================================
// Service listings
// ============================================================================

#[derive(Clone)]
pub struct SqliteServiceListingRepository {
    pool: SqlitePool,
}

impl SqliteServiceListingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServiceListingRepository for SqliteServiceListingRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<ServiceListing>> {
        let result = sqlx::query_as::<_, ServiceModel>(&format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1"))
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.map(ServiceListing::from))
    }

    #[instrument(skip(self, service), fields(service_id = %service.id))]
    async fn create(&self, service: &ServiceListing) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO services (id, seller_id, title, description, category, price_cents, currency,
                                  delivery_days, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(service.id.into_inner())
        .bind(service.seller_id.into_inner())
        .bind(&service.title)
        .bind(&service.description)
        .bind(&service.category)
        .bind(service.price_cents)
        .bind(&service.currency)
        .bind(service.delivery_days)
        .bind(service.status.as_str())
        .bind(service.created_at)
        .bind(service.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, service), fields(service_id = %service.id))]
    async fn update(&self, service: &ServiceListing) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE services
            SET title = ?2, description = ?3, category = ?4, price_cents = ?5, currency = ?6,
                delivery_days = ?7, status = ?8, updated_at = ?9
            WHERE id = ?1
            ",
        )
        .bind(service.id.into_inner())
        .bind(&service.title)
        .bind(&service.description)
        .bind(&service.category)
        .bind(service.price_cents)
        .bind(&service.currency)
        .bind(service.delivery_days)
        .bind(service.status.as_str())
        .bind(service.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ServiceNotFound(service.id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_status(&self, id: Snowflake, status: ServiceStatus, at: DateTime<Utc>) -> RepoResult<()> {
        let result = sqlx::query("UPDATE services SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id.into_inner())
            .bind(status.as_str())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ServiceNotFound(id));
        }

        Ok(())
    }

    #[instrument(skip(self, filter))]
    async fn list(&self, filter: &ServiceFilter, query: CursorQuery) -> RepoResult<Vec<ServiceListing>> {
        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {SERVICE_COLUMNS} FROM services WHERE "));

        match filter.owner_view {
            Some(owner) => {
                builder
                    .push("(status = ")
                    .push_bind(ServiceStatus::Active.as_str())
                    .push(" OR seller_id = ")
                    .push_bind(owner.into_inner())
                    .push(")");
            }
            None => {
                builder.push("status = ").push_bind(ServiceStatus::Active.as_str());
            }
        }
        if let Some(category) = &filter.category {
            builder.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(seller_id) = filter.seller_id {
            builder.push(" AND seller_id = ").push_bind(seller_id.into_inner());
        }
        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = like_contains(q);
            builder
                .push(" AND (title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR description LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        if let Some(before) = query.before {
            builder.push(" AND id < ").push_bind(before.into_inner());
        }
        if let Some(after) = query.after {
            builder.push(" AND id > ").push_bind(after.into_inner());
        }
        builder.push(" ORDER BY id DESC LIMIT ").push_bind(query.limit);

        let results = builder
            .build_query_as::<ServiceModel>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(results.into_iter().map(ServiceListing::from).collect())
    }

    #[instrument(skip(self))]
    async fn rating(&self, service_id: Snowflake) -> RepoResult<RatingSummary> {
        let row = sqlx::query_as::<_, RatingModel>(
            "SELECT AVG(rating) AS average, COUNT(*) AS count FROM service_reviews WHERE service_id = ?1",
        )
        .bind(service_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(RatingSummary::from(row))
    }
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Clone)]
pub struct SqliteOrderRepository {
    pool: SqlitePool,
}

impl SqliteOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn list_by(&self, column: &str, user_id: Snowflake, query: CursorQuery) -> RepoResult<Vec<ServiceOrder>> {
        let results = sqlx::query_as::<_, ServiceOrderModel>(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM service_orders
            WHERE {column} = ?1
              AND (?2 IS NULL OR id < ?2)
              AND (?3 IS NULL OR id > ?3)
            ORDER BY id DESC
            LIMIT ?4
            "
        ))
        .bind(user_id.into_inner())
        .bind(query.before.map(Snowflake::into_inner))
        .bind(query.after.map(Snowflake::into_inner))
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(ServiceOrder::from).collect())
    }
}

#[async_trait]
impl OrderRepository for SqliteOrderRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<ServiceOrder>> {
        let result =
            sqlx::query_as::<_, ServiceOrderModel>(&format!("SELECT {ORDER_COLUMNS} FROM service_orders WHERE id = ?1"))
                .bind(id.into_inner())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_error)?;

        Ok(result.map(ServiceOrder::from))
    }

    #[instrument(skip(self, order), fields(order_id = %order.id, service_id = %order.service_id))]
    async fn create(&self, order: &ServiceOrder) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO service_orders (id, service_id, buyer_id, seller_id, price_cents, currency,
                                        requirements, status, created_at, updated_at, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(order.id.into_inner())
        .bind(order.service_id.into_inner())
        .bind(order.buyer_id.into_inner())
        .bind(order.seller_id.into_inner())
        .bind(order.price_cents)
        .bind(&order.currency)
        .bind(&order.requirements)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.completed_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, order), fields(order_id = %order.id, status = order.status.as_str()))]
    async fn update_status(&self, order: &ServiceOrder, from: OrderStatus) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE service_orders SET status = ?2, updated_at = ?3, completed_at = ?4 WHERE id = ?1 AND status = ?5",
        )
        .bind(order.id.into_inner())
        .bind(order.status.as_str())
        .bind(order.updated_at)
        .bind(order.completed_at)
        .bind(from.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            // Missing, or moved on since it was read
            let current: Option<String> = sqlx::query_scalar("SELECT status FROM service_orders WHERE id = ?1")
                .bind(order.id.into_inner())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_error)?;

            return Err(match current {
                Some(status) => DomainError::InvalidOrderTransition {
                    from: status,
                    to: order.status.as_str().to_string(),
                },
                None => DomainError::OrderNotFound(order.id),
            });
        }

        Ok(())
    }

    async fn list_for_buyer(&self, buyer_id: Snowflake, query: CursorQuery) -> RepoResult<Vec<ServiceOrder>> {
        self.list_by("buyer_id", buyer_id, query).await
    }

    async fn list_for_seller(&self, seller_id: Snowflake, query: CursorQuery) -> RepoResult<Vec<ServiceOrder>> {
        self.list_by("seller_id", seller_id, query).await
    }

    #[instrument(skip(self))]
    async fn find_completed(&self, service_id: Snowflake, buyer_id: Snowflake) -> RepoResult<Option<ServiceOrder>> {
        let result = sqlx::query_as::<_, ServiceOrderModel>(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM service_orders
            WHERE service_id = ?1 AND buyer_id = ?2 AND status = ?3
            ORDER BY id DESC
            LIMIT 1
            "
        ))
        .bind(service_id.into_inner())
        .bind(buyer_id.into_inner())
        .bind(OrderStatus::Completed.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(ServiceOrder::from))
    }

    #[instrument(skip(self))]
    async fn count_by_status(&self) -> RepoResult<Vec<(OrderStatus, i64)>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM service_orders GROUP BY status ORDER BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(map_db_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|(status, count)| OrderStatus::parse(&status).map(|s| (s, count)))
            .collect())
    }
}

// ============================================================================
// Reviews
// ============================================================================

#[derive(Clone)]
pub struct SqliteReviewRepository {
    pool: SqlitePool,
}

impl SqliteReviewRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for SqliteReviewRepository {
    #[instrument(skip(self, review), fields(service_id = %review.service_id, reviewer_id = %review.reviewer_id))]
    async fn create(&self, review: &ServiceReview) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO service_reviews (id, service_id, order_id, reviewer_id, rating, comment, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(review.id.into_inner())
        .bind(review.service_id.into_inner())
        .bind(review.order_id.into_inner())
        .bind(review.reviewer_id.into_inner())
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || DomainError::AlreadyReviewed))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_reviewer(&self, service_id: Snowflake, reviewer_id: Snowflake) -> RepoResult<Option<ServiceReview>> {
        let result = sqlx::query_as::<_, ServiceReviewModel>(
            r"
            SELECT id, service_id, order_id, reviewer_id, rating, comment, created_at
            FROM service_reviews
            WHERE service_id = ?1 AND reviewer_id = ?2
            ",
        )
        .bind(service_id.into_inner())
        .bind(reviewer_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(ServiceReview::from))
    }

    #[instrument(skip(self))]
    async fn list_by_service(&self, service_id: Snowflake, query: CursorQuery) -> RepoResult<Vec<ServiceReview>> {
        let results = sqlx::query_as::<_, ServiceReviewModel>(
            r"
            SELECT id, service_id, order_id, reviewer_id, rating, comment, created_at
            FROM service_reviews
            WHERE service_id = ?1
              AND (?2 IS NULL OR id < ?2)
              AND (?3 IS NULL OR id > ?3)
            ORDER BY id DESC
            LIMIT ?4
            ",
        )
        .bind(service_id.into_inner())
        .bind(query.before.map(Snowflake::into_inner))
        .bind(query.after.map(Snowflake::into_inner))
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(ServiceReview::from).collect())
    }
}
