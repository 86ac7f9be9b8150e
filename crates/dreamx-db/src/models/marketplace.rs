//! Marketplace models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct ServiceModel {
    pub id: i64,
    pub seller_id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price_cents: i64,
    pub currency: String,
    pub delivery_days: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ServiceOrderModel {
    pub id: i64,
    pub service_id: i64,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub price_cents: i64,
    pub currency: String,
    pub requirements: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ServiceReviewModel {
    pub id: i64,
    pub service_id: i64,
    pub order_id: i64,
    pub reviewer_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct RatingModel {
    pub average: Option<f64>,
    pub count: i64,
}
