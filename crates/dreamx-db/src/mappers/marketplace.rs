//! Marketplace mappers

use dreamx_core::entities::{
    OrderStatus, RatingSummary, ServiceListing, ServiceOrder, ServiceReview, ServiceStatus,
};
use dreamx_core::value_objects::Snowflake;

use crate::models::{RatingModel, ServiceModel, ServiceOrderModel, ServiceReviewModel};

impl From<ServiceModel> for ServiceListing {
    fn from(model: ServiceModel) -> Self {
        ServiceListing {
            id: Snowflake::new(model.id),
            seller_id: Snowflake::new(model.seller_id),
            title: model.title,
            description: model.description,
            category: model.category,
            price_cents: model.price_cents,
            currency: model.currency,
            delivery_days: model.delivery_days,
            status: ServiceStatus::parse(&model.status).unwrap_or(ServiceStatus::Paused),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<ServiceOrderModel> for ServiceOrder {
    fn from(model: ServiceOrderModel) -> Self {
        ServiceOrder {
            id: Snowflake::new(model.id),
            service_id: Snowflake::new(model.service_id),
            buyer_id: Snowflake::new(model.buyer_id),
            seller_id: Snowflake::new(model.seller_id),
            price_cents: model.price_cents,
            currency: model.currency,
            requirements: model.requirements,
            status: OrderStatus::parse(&model.status).unwrap_or(OrderStatus::Pending),
            created_at: model.created_at,
            updated_at: model.updated_at,
            completed_at: model.completed_at,
        }
    }
}

impl From<ServiceReviewModel> for ServiceReview {
    fn from(model: ServiceReviewModel) -> Self {
        ServiceReview {
            id: Snowflake::new(model.id),
            service_id: Snowflake::new(model.service_id),
            order_id: Snowflake::new(model.order_id),
            reviewer_id: Snowflake::new(model.reviewer_id),
            rating: model.rating,
            comment: model.comment,
            created_at: model.created_at,
        }
    }
}

impl From<RatingModel> for RatingSummary {
    fn from(model: RatingModel) -> Self {
        RatingSummary {
            // two decimals are enough for display
            average: model.average.map_or(0.0, |avg| (avg * 100.0).round() / 100.0),
            count: model.count,
        }
    }
}
