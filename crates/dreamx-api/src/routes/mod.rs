//! Route definitions
//!
//! All API routes organized by domain and mounted under /api/v1.

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::handlers::{
    admin, auth, billing, conversations, health, marketplace, messages, moderation, notifications,
    oauth, posts, reactions, users, webauthn,
};
use crate::state::AppState;

/// Prefix every API route is nested under
pub const API_PREFIX: &str = "/api/v1";

/// Create the main API router (health is mounted separately)
pub fn create_router() -> Router<AppState> {
    Router::new().nest(API_PREFIX, api_v1_routes())
}

/// Health check routes (exported separately to bypass rate limiting)
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(feed_routes())
        .merge(conversation_routes())
        .merge(notification_routes())
        .merge(marketplace_routes())
        .merge(billing_routes())
        .merge(moderation_routes())
        .merge(admin_routes())
}

/// Password, OAuth and WebAuthn authentication
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh_token))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/logout-all", post(auth::logout_all))
        .route("/auth/verify-email", post(auth::verify_email))
        .route("/auth/verify-email/resend", post(auth::resend_verification))
        .route("/auth/password-reset", post(auth::request_password_reset))
        .route("/auth/password-reset/confirm", post(auth::reset_password))
        .route("/auth/change-password", post(auth::change_password))
        // OAuth
        .route("/auth/oauth/:provider", get(oauth::begin))
        .route("/auth/oauth/:provider/callback", get(oauth::callback))
        // WebAuthn
        .route("/auth/webauthn/register/begin", post(webauthn::register_begin))
        .route("/auth/webauthn/register/finish", post(webauthn::register_finish))
        .route("/auth/webauthn/login/begin", post(webauthn::login_begin))
        .route("/auth/webauthn/login/finish", post(webauthn::login_finish))
        .route("/auth/webauthn/credentials", get(webauthn::list_credentials))
        .route(
            "/auth/webauthn/credentials/:credential_id",
            delete(webauthn::delete_credential),
        )
}

/// Profiles, blocks and uploads
fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users/@me",
            get(users::get_current_user).patch(users::update_current_user),
        )
        .route("/users/@me/preferences", patch(users::update_preferences))
        .route("/users/@me/avatar", put(users::upload_avatar))
        .route("/users/@me/blocks", get(moderation::list_blocks))
        .route("/users/search", get(users::search_users))
        .route("/users/:user_id", get(users::get_user))
        .route(
            "/users/:user_id/block",
            put(moderation::block_user).delete(moderation::unblock_user),
        )
        .route("/uploads", post(messages::upload_attachment))
}

/// Posts, comments and their reactions
fn feed_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(posts::list_feed).post(posts::create_post))
        .route(
            "/posts/:post_id",
            get(posts::get_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route(
            "/posts/:post_id/comments",
            get(posts::list_comments).post(posts::add_comment),
        )
        .route(
            "/posts/:post_id/reactions",
            get(reactions::get_post_reactions).post(reactions::toggle_post_reaction),
        )
        .route("/comments/:comment_id", delete(posts::delete_comment))
        .route(
            "/comments/:comment_id/likes",
            get(reactions::get_comment_likes).post(reactions::toggle_comment_like),
        )
}

/// Direct and group messaging
fn conversation_routes() -> Router<AppState> {
    Router::new()
        .route("/conversations", get(conversations::list_conversations))
        .route("/conversations/direct", post(conversations::open_direct))
        .route("/conversations/group", post(conversations::create_group))
        .route(
            "/conversations/:conversation_id",
            get(conversations::get_conversation).patch(conversations::rename_group),
        )
        .route(
            "/conversations/:conversation_id/members",
            post(conversations::add_members),
        )
        .route(
            "/conversations/:conversation_id/members/:user_id",
            delete(conversations::remove_member),
        )
        .route("/conversations/:conversation_id/read", post(conversations::mark_read))
        .route(
            "/conversations/:conversation_id/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .route(
            "/messages/:message_id",
            patch(messages::edit_message).delete(messages::delete_message),
        )
        .route(
            "/messages/:message_id/reactions",
            get(reactions::get_message_reactions).post(reactions::toggle_message_reaction),
        )
}

fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/:notification_id/read", post(notifications::mark_read))
        .route("/notifications/push/vapid-key", get(notifications::vapid_public_key))
        .route("/notifications/push/subscribe", post(notifications::subscribe_push))
        .route("/notifications/push/unsubscribe", post(notifications::unsubscribe_push))
}

/// Service listings, orders and reviews
fn marketplace_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/services",
            get(marketplace::list_services).post(marketplace::create_service),
        )
        .route(
            "/services/:service_id",
            get(marketplace::get_service).patch(marketplace::update_service),
        )
        .route("/services/:service_id/status", put(marketplace::set_service_status))
        .route("/services/:service_id/orders", post(marketplace::place_order))
        .route(
            "/services/:service_id/reviews",
            get(marketplace::list_reviews).post(marketplace::create_review),
        )
        .route("/orders", get(marketplace::list_orders))
        .route("/orders/:order_id", get(marketplace::get_order))
        .route("/orders/:order_id/accept", post(marketplace::accept_order))
        .route("/orders/:order_id/complete", post(marketplace::complete_order))
        .route("/orders/:order_id/cancel", post(marketplace::cancel_order))
}

fn billing_routes() -> Router<AppState> {
    Router::new()
        .route("/billing/plans", get(billing::list_plans))
        .route(
            "/billing/subscription",
            get(billing::current_subscription).post(billing::subscribe),
        )
        .route("/billing/subscription/cancel", post(billing::cancel_subscription))
        .route(
            "/billing/payment-methods",
            get(billing::list_payment_methods).post(billing::add_payment_method),
        )
        .route(
            "/billing/payment-methods/:method_id",
            delete(billing::remove_payment_method),
        )
        .route(
            "/billing/payment-methods/:method_id/default",
            put(billing::set_default_payment_method),
        )
        .route("/billing/payments", post(billing::one_time_payment))
        .route("/billing/invoices", get(billing::list_invoices))
        .route("/billing/webhook", post(billing::webhook))
}

/// Reports and appeals for everyone, review queues for staff
fn moderation_routes() -> Router<AppState> {
    Router::new()
        .route("/reports", post(moderation::create_report))
        .route("/appeals", post(moderation::create_appeal))
        .route("/appeals/@me", get(moderation::my_appeals))
        .route("/moderation/reports", get(moderation::list_reports))
        .route(
            "/moderation/reports/:report_id/resolve",
            post(moderation::resolve_report),
        )
        .route("/moderation/users/:user_id/suspend", post(moderation::suspend_user))
        .route("/moderation/users/:user_id/unsuspend", post(moderation::unsuspend_user))
        .route("/moderation/users/:user_id/ban", post(moderation::ban_user))
        .route("/moderation/users/:user_id/role", put(moderation::set_role))
        .route("/moderation/appeals", get(moderation::list_appeals))
        .route(
            "/moderation/appeals/:appeal_id/decide",
            post(moderation::decide_appeal),
        )
        .route("/moderation/audit", get(moderation::list_audit))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(admin::list_users))
        .route("/admin/stats", get(admin::stats))
}

#[cfg(test)]
mod tests {
    use dreamx_service::WEBHOOK_PATH;

    use super::API_PREFIX;

    #[test]
    fn test_webhook_route_matches_signed_url() {
        assert_eq!(format!("{API_PREFIX}/billing/webhook"), WEBHOOK_PATH);
    }
}
