//! Billing handlers: plans, subscriptions, payment methods, invoices and
//! the payment provider webhook.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use dreamx_core::{PaymentProvider, Plan, Snowflake};
use dreamx_service::dto::{
    AddPaymentMethodRequest, CancelSubscriptionRequest, CursorParams, InvoiceResponse,
    OneTimePaymentRequest, PaymentMethodResponse, PaymentResponse, SubscribeRequest,
    SubscriptionResponse, WebhookAckResponse,
};
use dreamx_service::services::BillingService;

use crate::extractors::{AuthUser, OptionalJson, QueryParams, SnowflakePath, ValidatedJson};
use crate::response::{ApiResult, Created, NoContent};
use crate::state::AppState;

/// Header each provider signs its webhook deliveries with
pub fn signature_header(provider: PaymentProvider) -> &'static str {
    match provider {
        PaymentProvider::Stripe => "stripe-signature",
        PaymentProvider::Square => "x-square-hmacsha256-signature",
        PaymentProvider::LemonSqueezy => "x-signature",
    }
}

/// GET /billing/plans
pub async fn list_plans(State(state): State<AppState>) -> Json<Vec<Plan>> {
    Json(BillingService::new(state.service_context()).list_plans())
}

/// `null` when the user never subscribed
///
/// GET /billing/subscription
pub async fn current_subscription(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Option<SubscriptionResponse>>> {
    let subscription = BillingService::new(state.service_context())
        .current_subscription(auth.user_id)
        .await?;
    Ok(Json(subscription))
}

/// POST /billing/subscription
pub async fn subscribe(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<SubscribeRequest>,
) -> ApiResult<Created<Json<SubscriptionResponse>>> {
    let subscription = BillingService::new(state.service_context())
        .subscribe(auth.user_id, request)
        .await?;
    Ok(Created(Json(subscription)))
}

/// Defaults to cancelling at period end
///
/// POST /billing/subscription/cancel
pub async fn cancel_subscription(
    State(state): State<AppState>,
    auth: AuthUser,
    OptionalJson(request): OptionalJson<CancelSubscriptionRequest>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let subscription = BillingService::new(state.service_context())
        .cancel_subscription(auth.user_id, request)
        .await?;
    Ok(Json(subscription))
}

/// GET /billing/payment-methods
pub async fn list_payment_methods(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<PaymentMethodResponse>>> {
    let methods = BillingService::new(state.service_context())
        .list_payment_methods(auth.user_id)
        .await?;
    Ok(Json(methods))
}

/// POST /billing/payment-methods
pub async fn add_payment_method(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<AddPaymentMethodRequest>,
) -> ApiResult<Created<Json<PaymentMethodResponse>>> {
    let method = BillingService::new(state.service_context())
        .add_payment_method(auth.user_id, request)
        .await?;
    Ok(Created(Json(method)))
}

/// PUT /billing/payment-methods/{method_id}/default
pub async fn set_default_payment_method(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(method_id): SnowflakePath<Snowflake>,
) -> ApiResult<NoContent> {
    BillingService::new(state.service_context())
        .set_default_payment_method(auth.user_id, method_id)
        .await?;
    Ok(NoContent)
}

/// DELETE /billing/payment-methods/{method_id}
pub async fn remove_payment_method(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(method_id): SnowflakePath<Snowflake>,
) -> ApiResult<NoContent> {
    BillingService::new(state.service_context())
        .remove_payment_method(auth.user_id, method_id)
        .await?;
    Ok(NoContent)
}

/// Start a one-off charge; the client finishes it with the returned secret
/// or checkout URL
///
/// POST /billing/payments
pub async fn one_time_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<OneTimePaymentRequest>,
) -> ApiResult<Created<Json<PaymentResponse>>> {
    let payment = BillingService::new(state.service_context())
        .one_time_payment(auth.user_id, request)
        .await?;
    Ok(Created(Json(payment)))
}

/// GET /billing/invoices?before=&limit=
pub async fn list_invoices(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(params): QueryParams<CursorParams>,
) -> ApiResult<Json<Vec<InvoiceResponse>>> {
    let invoices = BillingService::new(state.service_context())
        .list_invoices(auth.user_id, params)
        .await?;
    Ok(Json(invoices))
}

/// Provider webhook
///
/// The raw body is needed for signature verification, so it is taken as
/// bytes rather than JSON.
///
/// POST /billing/webhook
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAckResponse>> {
    let header = signature_header(state.config().payments.provider);
    let signature = headers.get(header).and_then(|v| v.to_str().ok());

    let ack = BillingService::new(state.service_context())
        .handle_webhook(signature, &body)
        .await?;
    Ok(Json(ack))
}
