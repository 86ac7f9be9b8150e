//! Marketplace handlers: service listings, orders and reviews

use axum::{extract::State, Json};
use dreamx_core::Snowflake;
use dreamx_service::dto::{
    CreateReviewRequest, CreateServiceRequest, CursorParams, OrderListQuery, OrderResponse,
    PlaceOrderRequest, ReviewResponse, ServiceListQuery, ServiceResponse, SetServiceStatusRequest,
    UpdateServiceRequest,
};
use dreamx_service::services::MarketplaceService;

use crate::extractors::{AuthUser, JsonBody, OptionalValidatedJson, QueryParams, SnowflakePath, ValidatedJson};
use crate::response::{ApiResult, Created};
use crate::state::AppState;

/// GET /services?category=&q=&seller=&before=&limit=
pub async fn list_services(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(query): QueryParams<ServiceListQuery>,
) -> ApiResult<Json<Vec<ServiceResponse>>> {
    let services = MarketplaceService::new(state.service_context())
        .list_services(auth.user_id, query)
        .await?;
    Ok(Json(services))
}

/// POST /services
pub async fn create_service(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateServiceRequest>,
) -> ApiResult<Created<Json<ServiceResponse>>> {
    let service = MarketplaceService::new(state.service_context())
        .create_service(auth.user_id, request)
        .await?;
    Ok(Created(Json(service)))
}

/// GET /services/{service_id}
pub async fn get_service(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(service_id): SnowflakePath<Snowflake>,
) -> ApiResult<Json<ServiceResponse>> {
    let service = MarketplaceService::new(state.service_context())
        .get_service(auth.user_id, service_id)
        .await?;
    Ok(Json(service))
}

/// PATCH /services/{service_id}
pub async fn update_service(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(service_id): SnowflakePath<Snowflake>,
    ValidatedJson(request): ValidatedJson<UpdateServiceRequest>,
) -> ApiResult<Json<ServiceResponse>> {
    let service = MarketplaceService::new(state.service_context())
        .update_service(auth.user_id, service_id, request)
        .await?;
    Ok(Json(service))
}

/// PUT /services/{service_id}/status
pub async fn set_service_status(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(service_id): SnowflakePath<Snowflake>,
    JsonBody(request): JsonBody<SetServiceStatusRequest>,
) -> ApiResult<Json<ServiceResponse>> {
    let service = MarketplaceService::new(state.service_context())
        .set_service_status(auth.user_id, service_id, request)
        .await?;
    Ok(Json(service))
}

/// POST /services/{service_id}/orders
pub async fn place_order(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(service_id): SnowflakePath<Snowflake>,
    OptionalValidatedJson(request): OptionalValidatedJson<PlaceOrderRequest>,
) -> ApiResult<Created<Json<OrderResponse>>> {
    let order = MarketplaceService::new(state.service_context())
        .place_order(auth.user_id, service_id, request.unwrap_or_default())
        .await?;
    Ok(Created(Json(order)))
}

/// GET /services/{service_id}/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    SnowflakePath(service_id): SnowflakePath<Snowflake>,
    QueryParams(params): QueryParams<CursorParams>,
) -> ApiResult<Json<Vec<ReviewResponse>>> {
    let reviews = MarketplaceService::new(state.service_context())
        .list_reviews(service_id, params)
        .await?;
    Ok(Json(reviews))
}

/// Only buyers with a completed order may review
///
/// POST /services/{service_id}/reviews
pub async fn create_review(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(service_id): SnowflakePath<Snowflake>,
    ValidatedJson(request): ValidatedJson<CreateReviewRequest>,
) -> ApiResult<Created<Json<ReviewResponse>>> {
    let review = MarketplaceService::new(state.service_context())
        .create_review(auth.user_id, service_id, request)
        .await?;
    Ok(Created(Json(review)))
}

/// GET /orders?role=buyer|seller
pub async fn list_orders(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(query): QueryParams<OrderListQuery>,
) -> ApiResult<Json<Vec<OrderResponse>>> {
    let orders = MarketplaceService::new(state.service_context())
        .list_orders(auth.user_id, query)
        .await?;
    Ok(Json(orders))
}

/// GET /orders/{order_id}
pub async fn get_order(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(order_id): SnowflakePath<Snowflake>,
) -> ApiResult<Json<OrderResponse>> {
    let order = MarketplaceService::new(state.service_context())
        .get_order(auth.user_id, order_id)
        .await?;
    Ok(Json(order))
}

/// POST /orders/{order_id}/accept
pub async fn accept_order(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(order_id): SnowflakePath<Snowflake>,
) -> ApiResult<Json<OrderResponse>> {
    let order = MarketplaceService::new(state.service_context())
        .accept_order(auth.user_id, order_id)
        .await?;
    Ok(Json(order))
}

/// POST /orders/{order_id}/complete
pub async fn complete_order(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(order_id): SnowflakePath<Snowflake>,
) -> ApiResult<Json<OrderResponse>> {
    let order = MarketplaceService::new(state.service_context())
        .complete_order(auth.user_id, order_id)
        .await?;
    Ok(Json(order))
}

/// POST /orders/{order_id}/cancel
pub async fn cancel_order(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(order_id): SnowflakePath<Snowflake>,
) -> ApiResult<Json<OrderResponse>> {
    let order = MarketplaceService::new(state.service_context())
        .cancel_order(auth.user_id, order_id)
        .await?;
    Ok(Json(order))
}
