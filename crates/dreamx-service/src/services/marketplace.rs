//! Marketplace service
//!
//! Service listings, orders and reviews. Reviews are gated on a completed
//! order, so only verified purchasers can rate a listing.

use chrono::Utc;
use dreamx_core::{
    validate_rating, CursorQuery, DomainError, Notification, NotificationKind, OrderParty,
    OrderStatus, ServiceFilter, ServiceListing, ServiceOrder, ServiceReview, ServiceStatus,
    Snowflake, User,
};
use serde_json::json;
use tracing::{info, instrument};

use crate::dto::{
    CreateReviewRequest, CreateServiceRequest, CursorParams, OrderListQuery, OrderResponse,
    OrderRole, PlaceOrderRequest, ReviewResponse, ServiceListQuery, ServiceResponse,
    SetServiceStatusRequest, UpdateServiceRequest,
};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::moderation::record_audit;
use super::notification::NotificationService;

const DEFAULT_CURRENCY: &str = "usd";

fn order_link(order_id: Snowflake) -> String {
    format!("/orders/{order_id}")
}

fn required(field: &str, value: &str) -> ServiceResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::validation(format!("{field} cannot be blank")));
    }
    Ok(value.to_string())
}

/// Marketplace service
pub struct MarketplaceService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MarketplaceService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    async fn find_service(&self, service_id: Snowflake) -> ServiceResult<ServiceListing> {
        Ok(self
            .ctx
            .service_repo()
            .find_by_id(service_id)
            .await?
            .ok_or(DomainError::ServiceNotFound(service_id))?)
    }

    async fn find_order(&self, order_id: Snowflake) -> ServiceResult<ServiceOrder> {
        Ok(self
            .ctx
            .order_repo()
            .find_by_id(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))?)
    }

    async fn service_response(&self, service: ServiceListing) -> ServiceResult<ServiceResponse> {
        let rating = self.ctx.service_repo().rating(service.id).await?;
        Ok(ServiceResponse {
            id: service.id,
            seller_id: service.seller_id,
            title: service.title,
            description: service.description,
            category: service.category,
            price_cents: service.price_cents,
            currency: service.currency,
            delivery_days: service.delivery_days,
            status: service.status,
            rating,
            created_at: service.created_at,
            updated_at: service.updated_at,
        })
    }

    async fn notify(&self, user_id: Snowflake, actor: &User, kind: NotificationKind, body: String, link: String, data: serde_json::Value) {
        NotificationService::new(self.ctx)
            .notify(
                Notification::new(self.ctx.generate_id(), user_id, Some(actor.id), kind, body)
                    .with_link(link)
                    .with_data(data),
            )
            .await;
    }

    // =========================================================================
    // Listings
    // =========================================================================

    #[instrument(skip(self, request))]
    pub async fn create_service(&self, user_id: Snowflake, request: CreateServiceRequest) -> ServiceResult<ServiceResponse> {
        self.ctx.acting_user(user_id).await?;

        let now = Utc::now();
        let service = ServiceListing {
            id: self.ctx.generate_id(),
            seller_id: user_id,
            title: required("Title", &request.title)?,
            description: required("Description", &request.description)?,
            category: required("Category", &request.category)?.to_lowercase(),
            price_cents: request.price_cents,
            currency: request
                .currency
                .map(|c| c.trim().to_lowercase())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            delivery_days: request.delivery_days,
            status: ServiceStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.ctx.service_repo().create(&service).await?;

        info!(service_id = %service.id, seller_id = %user_id, "Service listed");
        self.service_response(service).await
    }

    #[instrument(skip(self, request))]
    pub async fn update_service(
        &self,
        user_id: Snowflake,
        service_id: Snowflake,
        request: UpdateServiceRequest,
    ) -> ServiceResult<ServiceResponse> {
        self.ctx.acting_user(user_id).await?;
        let mut service = self.find_service(service_id).await?;
        if !service.is_owned_by(user_id) {
            return Err(DomainError::Forbidden("only the seller can edit a service".into()).into());
        }

        if let Some(title) = request.title {
            service.title = required("Title", &title)?;
        }
        if let Some(description) = request.description {
            service.description = required("Description", &description)?;
        }
        if let Some(category) = request.category {
            service.category = required("Category", &category)?.to_lowercase();
        }
        if let Some(price_cents) = request.price_cents {
            service.price_cents = price_cents;
        }
        if let Some(delivery_days) = request.delivery_days {
            service.delivery_days = delivery_days;
        }
        service.updated_at = Utc::now();
        self.ctx.service_repo().update(&service).await?;

        info!(service_id = %service_id, "Service updated");
        self.service_response(service).await
    }

    /// Pause, archive or reactivate a listing; the seller or staff
    #[instrument(skip(self))]
    pub async fn set_service_status(
        &self,
        user_id: Snowflake,
        service_id: Snowflake,
        request: SetServiceStatusRequest,
    ) -> ServiceResult<ServiceResponse> {
        let actor = self.ctx.acting_user(user_id).await?;
        let mut service = self.find_service(service_id).await?;

        let is_seller = service.is_owned_by(user_id);
        if !is_seller && !actor.is_staff() {
            return Err(DomainError::Forbidden("only the seller can change a service".into()).into());
        }

        let now = Utc::now();
        self.ctx.service_repo().set_status(service_id, request.status, now).await?;
        let previous = service.status;
        service.status = request.status;
        service.updated_at = now;

        if !is_seller {
            record_audit(
                self.ctx,
                user_id,
                "service.set_status",
                "service",
                Some(service_id),
                json!({ "from": previous.as_str(), "to": request.status.as_str() }),
            )
            .await?;
        }

        info!(service_id = %service_id, status = request.status.as_str(), "Service status changed");
        self.service_response(service).await
    }

    /// A listing with its rating; inactive ones only for the seller and staff
    pub async fn get_service(&self, viewer_id: Snowflake, service_id: Snowflake) -> ServiceResult<ServiceResponse> {
        let service = self.find_service(service_id).await?;
        if !service.is_active() && !service.is_owned_by(viewer_id) {
            let viewer = self.ctx.load_user(viewer_id).await?;
            if !viewer.is_staff() {
                return Err(DomainError::ServiceNotFound(service_id).into());
            }
        }
        self.service_response(service).await
    }

    #[instrument(skip(self))]
    pub async fn list_services(&self, viewer_id: Snowflake, query: ServiceListQuery) -> ServiceResult<Vec<ServiceResponse>> {
        let filter = ServiceFilter {
            category: query.category.map(|c| c.trim().to_lowercase()).filter(|c| !c.is_empty()),
            q: query.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
            seller_id: query.seller,
            owner_view: Some(viewer_id),
        };
        let services = self
            .ctx
            .service_repo()
            .list(&filter, CursorQuery::new(query.before, None, query.limit))
            .await?;

        let mut responses = Vec::with_capacity(services.len());
        for service in services {
            responses.push(self.service_response(service).await?);
        }
        Ok(responses)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    #[instrument(skip(self, request))]
    pub async fn place_order(
        &self,
        user_id: Snowflake,
        service_id: Snowflake,
        request: PlaceOrderRequest,
    ) -> ServiceResult<OrderResponse> {
        let buyer = self.ctx.acting_user(user_id).await?;
        let service = self.find_service(service_id).await?;

        if !service.is_active() {
            return Err(DomainError::ServiceUnavailable.into());
        }
        if service.is_owned_by(user_id) {
            return Err(DomainError::CannotTargetSelf.into());
        }
        if self.ctx.block_repo().is_blocked_either(user_id, service.seller_id).await? {
            return Err(DomainError::Blocked.into());
        }

        let requirements = request.requirements.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let order = ServiceOrder::place(self.ctx.generate_id(), &service, user_id, requirements);
        self.ctx.order_repo().create(&order).await?;

        info!(order_id = %order.id, service_id = %service_id, buyer_id = %user_id, "Order placed");

        self.notify(
            service.seller_id,
            &buyer,
            NotificationKind::Order,
            format!("{} ordered \"{}\"", buyer.display_name, service.title),
            order_link(order.id),
            json!({ "order_id": order.id, "service_id": service_id }),
        )
        .await;

        Ok(OrderResponse::from(order))
    }

    /// Move an order along and tell the other side
    async fn transition(&self, user_id: Snowflake, order_id: Snowflake, to: OrderStatus) -> ServiceResult<OrderResponse> {
        let actor = self.ctx.acting_user(user_id).await?;
        let mut order = self.find_order(order_id).await?;
        let party = order
            .party(user_id)
            .ok_or(DomainError::OrderNotFound(order_id))?;

        let from = order.status;
        order.transition(to, party)?;
        self.ctx.order_repo().update_status(&order, from).await?;

        info!(order_id = %order_id, status = to.as_str(), "Order status changed");

        let who = match party {
            OrderParty::Buyer => "the buyer",
            OrderParty::Seller => "the seller",
        };
        self.notify(
            order.counterparty(party),
            &actor,
            NotificationKind::Order,
            format!("Order {} was {} by {who}", order.id, to.as_str()),
            order_link(order.id),
            json!({ "order_id": order.id, "status": to.as_str() }),
        )
        .await;

        Ok(OrderResponse::from(order))
    }

    pub async fn accept_order(&self, user_id: Snowflake, order_id: Snowflake) -> ServiceResult<OrderResponse> {
        self.transition(user_id, order_id, OrderStatus::Accepted).await
    }

    pub async fn complete_order(&self, user_id: Snowflake, order_id: Snowflake) -> ServiceResult<OrderResponse> {
        self.transition(user_id, order_id, OrderStatus::Completed).await
    }

    pub async fn cancel_order(&self, user_id: Snowflake, order_id: Snowflake) -> ServiceResult<OrderResponse> {
        self.transition(user_id, order_id, OrderStatus::Cancelled).await
    }

    /// An order as seen by one of its parties or staff
    pub async fn get_order(&self, user_id: Snowflake, order_id: Snowflake) -> ServiceResult<OrderResponse> {
        let order = self.find_order(order_id).await?;
        if order.party(user_id).is_none() && !self.ctx.load_user(user_id).await?.is_staff() {
            return Err(DomainError::OrderNotFound(order_id).into());
        }
        Ok(OrderResponse::from(order))
    }

    #[instrument(skip(self))]
    pub async fn list_orders(&self, user_id: Snowflake, query: OrderListQuery) -> ServiceResult<Vec<OrderResponse>> {
        let cursor = CursorQuery::new(query.before, None, query.limit);
        let orders = match query.role {
            OrderRole::Buyer => self.ctx.order_repo().list_for_buyer(user_id, cursor).await?,
            OrderRole::Seller => self.ctx.order_repo().list_for_seller(user_id, cursor).await?,
        };
        Ok(orders.into_iter().map(OrderResponse::from).collect())
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Review a service; needs a completed order for it
    #[instrument(skip(self, request))]
    pub async fn create_review(
        &self,
        user_id: Snowflake,
        service_id: Snowflake,
        request: CreateReviewRequest,
    ) -> ServiceResult<ReviewResponse> {
        let reviewer = self.ctx.acting_user(user_id).await?;
        let service = self.find_service(service_id).await?;
        validate_rating(request.rating)?;

        if service.is_owned_by(user_id) {
            return Err(DomainError::CannotTargetSelf.into());
        }
        let order = self
            .ctx
            .order_repo()
            .find_completed(service_id, user_id)
            .await?
            .ok_or(DomainError::NotVerifiedPurchaser)?;
        if self.ctx.review_repo().find_by_reviewer(service_id, user_id).await?.is_some() {
            return Err(DomainError::AlreadyReviewed.into());
        }

        let review = ServiceReview {
            id: self.ctx.generate_id(),
            service_id,
            order_id: order.id,
            reviewer_id: user_id,
            rating: request.rating,
            comment: request.comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            created_at: Utc::now(),
        };
        self.ctx.review_repo().create(&review).await?;

        info!(review_id = %review.id, service_id = %service_id, rating = review.rating, "Review posted");

        self.notify(
            service.seller_id,
            &reviewer,
            NotificationKind::Review,
            format!("{} rated \"{}\" {}/5", reviewer.display_name, service.title, review.rating),
            format!("/services/{service_id}"),
            json!({ "service_id": service_id, "review_id": review.id, "rating": review.rating }),
        )
        .await;

        Ok(ReviewResponse::from(review))
    }

    pub async fn list_reviews(&self, service_id: Snowflake, params: CursorParams) -> ServiceResult<Vec<ReviewResponse>> {
        self.find_service(service_id).await?;
        let reviews = self
            .ctx
            .review_repo()
            .list_by_service(service_id, CursorQuery::new(params.before, None, params.limit))
            .await?;
        Ok(reviews.into_iter().map(ReviewResponse::from).collect())
    }
}
