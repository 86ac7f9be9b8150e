//! API Integration Tests
//!
//! Every test boots its own server on a scratch SQLite file, so no external
//! services are needed.
//!
//! Run with: cargo test -p integration-tests --test api_tests

use integration_tests::{assert_error, assert_json, assert_status, fixtures::*, TestServer};
use reqwest::StatusCode;

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health").await.unwrap();
    let body: serde_json::Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_health_ready() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health/ready").await.unwrap();
    let body: serde_json::Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["realtime_backend"], "memory");
}

// ============================================================================
// Auth Tests
// ============================================================================

#[tokio::test]
async fn test_register_user() {
    let server = TestServer::start().await.expect("Failed to start server");
    let request = RegisterRequest::unique();

    let response = server.post("/auth/register", &request).await.unwrap();
    let auth: AuthResponse = assert_json(response, StatusCode::CREATED).await.unwrap();

    assert_eq!(auth.user.username, request.username);
    assert_eq!(auth.user.role, "user");
    assert_eq!(auth.user.status, "active");
    assert!(!auth.user.email_verified);
    assert_eq!(auth.token_type, "Bearer");
    assert!(!auth.access_token.is_empty());
    assert!(!auth.refresh_token.is_empty());
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let server = TestServer::start().await.expect("Failed to start server");
    let request = RegisterRequest::unique();

    let response = server.post("/auth/register", &request).await.unwrap();
    assert_status(response, StatusCode::CREATED).await.unwrap();

    let response = server.post("/auth/register", &request).await.unwrap();
    assert_status(response, StatusCode::CONFLICT).await.unwrap();
}

#[tokio::test]
async fn test_register_validation_error() {
    let server = TestServer::start().await.expect("Failed to start server");
    let request = RegisterRequest {
        email: "not-an-email".to_string(),
        ..RegisterRequest::unique()
    };

    let response = server.post("/auth/register", &request).await.unwrap();
    let body: serde_json::Value = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();

    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["details"]["email"].is_array());
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server
        .client
        .post(format!("{}/api/v1/auth/login", server.base_url()))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    let code = assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(code, "INVALID_REQUEST_BODY");
}

#[tokio::test]
async fn test_login() {
    let server = TestServer::start().await.expect("Failed to start server");

    let register_req = RegisterRequest::unique();
    let response = server.post("/auth/register", &register_req).await.unwrap();
    assert_status(response, StatusCode::CREATED).await.unwrap();

    let login_req = LoginRequest::from_register(&register_req);
    let response = server.post("/auth/login", &login_req).await.unwrap();
    let auth: AuthResponse = assert_json(response, StatusCode::OK).await.unwrap();

    assert_eq!(auth.user.username, register_req.username);
    assert!(!auth.access_token.is_empty());
}

#[tokio::test]
async fn test_login_with_username() {
    let server = TestServer::start().await.expect("Failed to start server");

    let register_req = RegisterRequest::unique();
    server.post("/auth/register", &register_req).await.unwrap();

    let login_req = LoginRequest {
        login: register_req.username.clone(),
        password: register_req.password.clone(),
    };
    let response = server.post("/auth/login", &login_req).await.unwrap();
    let auth: AuthResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(auth.user.email, register_req.email);
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let server = TestServer::start().await.expect("Failed to start server");
    let login_req = LoginRequest {
        login: "nobody@example.com".to_string(),
        password: "wrongpass".to_string(),
    };

    let response = server.post("/auth/login", &login_req).await.unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_refresh_token_rotates() {
    let server = TestServer::start().await.expect("Failed to start server");
    let auth = server.register().await.unwrap();

    let refresh_req = RefreshTokenRequest {
        refresh_token: auth.refresh_token.clone(),
    };
    let response = server.post("/auth/refresh", &refresh_req).await.unwrap();
    let rotated: AuthResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_ne!(rotated.refresh_token, auth.refresh_token);

    // The old refresh token was consumed
    let response = server.post("/auth/refresh", &refresh_req).await.unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();
}

#[tokio::test]
async fn test_get_current_user() {
    let server = TestServer::start().await.expect("Failed to start server");
    let auth = server.register().await.unwrap();

    let response = server.get_auth("/users/@me", &auth.access_token).await.unwrap();
    let user: CurrentUserResponse = assert_json(response, StatusCode::OK).await.unwrap();

    assert_eq!(user.id, auth.user.id);
    assert_eq!(user.display_name, auth.user.display_name);
}

#[tokio::test]
async fn test_get_current_user_unauthorized() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server.get("/users/@me").await.unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "MISSING_AUTHORIZATION");

    let response = server.get_auth("/users/@me", "garbage").await.unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();
}

#[tokio::test]
async fn test_invalid_path_parameter() {
    let server = TestServer::start().await.expect("Failed to start server");
    let auth = server.register().await.unwrap();

    let response = server.get_auth("/posts/not-a-number", &auth.access_token).await.unwrap();
    let code = assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(code, "INVALID_PATH_PARAMETER");
}

// ============================================================================
// Feed Tests
// ============================================================================

#[tokio::test]
async fn test_create_post_and_read_feed() {
    let server = TestServer::start().await.expect("Failed to start server");
    let auth = server.register().await.unwrap();

    let request = CreatePostRequest::unique();
    let response = server.post_auth("/posts", &auth.access_token, &request).await.unwrap();
    let post: PostResponse = assert_json(response, StatusCode::CREATED).await.unwrap();

    assert_eq!(post.content, request.content);
    assert_eq!(post.author.id, auth.user.id);
    assert_eq!(post.comment_count, 0);
    assert!(post.reactions.is_empty());

    let response = server.get_auth("/posts", &auth.access_token).await.unwrap();
    let feed: Vec<PostResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(feed.iter().any(|p| p.id == post.id));
}

#[tokio::test]
async fn test_reaction_toggle_sets_then_clears() {
    let server = TestServer::start().await.expect("Failed to start server");
    let author = server.register().await.unwrap();
    let fan = server.register().await.unwrap();

    let response = server
        .post_auth("/posts", &author.access_token, &CreatePostRequest::unique())
        .await
        .unwrap();
    let post: PostResponse = assert_json(response, StatusCode::CREATED).await.unwrap();
    let path = format!("/posts/{}/reactions", post.id);

    let response = server.post_auth_empty(&path, &fan.access_token).await.unwrap();
    let toggle: ReactionToggleResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(toggle.outcome, "set");
    assert_eq!(toggle.kind.as_deref(), Some("like"));
    assert_eq!(toggle.counts.get("like"), Some(&1));

    let response = server.get_auth(&format!("/posts/{}", post.id), &fan.access_token).await.unwrap();
    let seen: PostResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(seen.my_reaction.as_deref(), Some("like"));

    let response = server.post_auth_empty(&path, &fan.access_token).await.unwrap();
    let toggle: ReactionToggleResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(toggle.outcome, "cleared");
    assert!(toggle.kind.is_none());
    assert!(toggle.counts.is_empty());

    // The author heard about the first toggle only
    let response = server.get_auth("/notifications", &author.access_token).await.unwrap();
    let inbox: Vec<NotificationResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, "reaction");
    assert_eq!(inbox[0].actor_id.as_deref(), Some(fan.user.id.as_str()));
}

#[tokio::test]
async fn test_comment_on_post() {
    let server = TestServer::start().await.expect("Failed to start server");
    let author = server.register().await.unwrap();
    let reader = server.register().await.unwrap();

    let response = server
        .post_auth("/posts", &author.access_token, &CreatePostRequest::unique())
        .await
        .unwrap();
    let post: PostResponse = assert_json(response, StatusCode::CREATED).await.unwrap();

    let comment_req = CreateCommentRequest {
        content: "I had the same dream".to_string(),
    };
    let response = server
        .post_auth(&format!("/posts/{}/comments", post.id), &reader.access_token, &comment_req)
        .await
        .unwrap();
    let comment: CommentResponse = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(comment.post_id, post.id);
    assert_eq!(comment.author_id, reader.user.id);

    let response = server
        .get_auth(&format!("/posts/{}/comments", post.id), &author.access_token)
        .await
        .unwrap();
    let comments: Vec<CommentResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].content, comment_req.content);

    let response = server.get_auth(&format!("/posts/{}", post.id), &author.access_token).await.unwrap();
    let post: PostResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(post.comment_count, 1);
}

#[tokio::test]
async fn test_delete_post_by_other_user_is_forbidden() {
    let server = TestServer::start().await.expect("Failed to start server");
    let author = server.register().await.unwrap();
    let stranger = server.register().await.unwrap();

    let response = server
        .post_auth("/posts", &author.access_token, &CreatePostRequest::unique())
        .await
        .unwrap();
    let post: PostResponse = assert_json(response, StatusCode::CREATED).await.unwrap();

    let response = server
        .delete_auth(&format!("/posts/{}", post.id), &stranger.access_token)
        .await
        .unwrap();
    assert_status(response, StatusCode::FORBIDDEN).await.unwrap();

    let response = server
        .delete_auth(&format!("/posts/{}", post.id), &author.access_token)
        .await
        .unwrap();
    assert_status(response, StatusCode::NO_CONTENT).await.unwrap();

    let response = server.get_auth(&format!("/posts/{}", post.id), &author.access_token).await.unwrap();
    assert_status(response, StatusCode::NOT_FOUND).await.unwrap();
}

// ============================================================================
// Messaging Tests
// ============================================================================

#[tokio::test]
async fn test_direct_message_flow() {
    let server = TestServer::start().await.expect("Failed to start server");
    let alice = server.register().await.unwrap();
    let bob = server.register().await.unwrap();

    let open = OpenDirectRequest {
        user_id: bob.user.id.clone(),
    };
    let response = server
        .post_auth("/conversations/direct", &alice.access_token, &open)
        .await
        .unwrap();
    let conversation: ConversationResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(conversation.kind, "direct");
    assert_eq!(conversation.members.len(), 2);

    // Opening again returns the same conversation
    let response = server
        .post_auth("/conversations/direct", &bob.access_token, &OpenDirectRequest { user_id: alice.user.id.clone() })
        .await
        .unwrap();
    let again: ConversationResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(again.id, conversation.id);

    let messages_path = format!("/conversations/{}/messages", conversation.id);
    let send = SendMessageRequest {
        content: "Did you dream of the lighthouse too?".to_string(),
    };
    let response = server.post_auth(&messages_path, &alice.access_token, &send).await.unwrap();
    let message: MessageResponse = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(message.conversation_id, conversation.id);
    assert_eq!(message.sender_id, alice.user.id);

    let response = server.get_auth(&messages_path, &bob.access_token).await.unwrap();
    let history: Vec<MessageResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].content, send.content);

    let response = server.get_auth("/conversations", &bob.access_token).await.unwrap();
    let list: Vec<ConversationResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].unread_count, 1);

    let response = server
        .post_auth_empty(&format!("/conversations/{}/read", conversation.id), &bob.access_token)
        .await
        .unwrap();
    assert_status(response, StatusCode::NO_CONTENT).await.unwrap();

    let response = server
        .get_auth(&format!("/conversations/{}", conversation.id), &bob.access_token)
        .await
        .unwrap();
    let read: ConversationResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(read.unread_count, 0);
}

#[tokio::test]
async fn test_non_member_cannot_read_conversation() {
    let server = TestServer::start().await.expect("Failed to start server");
    let alice = server.register().await.unwrap();
    let bob = server.register().await.unwrap();
    let eve = server.register().await.unwrap();

    let response = server
        .post_auth("/conversations/direct", &alice.access_token, &OpenDirectRequest { user_id: bob.user.id.clone() })
        .await
        .unwrap();
    let conversation: ConversationResponse = assert_json(response, StatusCode::OK).await.unwrap();

    let response = server
        .get_auth(&format!("/conversations/{}/messages", conversation.id), &eve.access_token)
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

// ============================================================================
// Notification Tests
// ============================================================================

#[tokio::test]
async fn test_message_notifications_and_read_state() {
    let server = TestServer::start().await.expect("Failed to start server");
    let alice = server.register().await.unwrap();
    let bob = server.register().await.unwrap();

    let response = server
        .post_auth("/conversations/direct", &alice.access_token, &OpenDirectRequest { user_id: bob.user.id.clone() })
        .await
        .unwrap();
    let conversation: ConversationResponse = assert_json(response, StatusCode::OK).await.unwrap();

    let send = SendMessageRequest {
        content: "wake up".to_string(),
    };
    let response = server
        .post_auth(&format!("/conversations/{}/messages", conversation.id), &alice.access_token, &send)
        .await
        .unwrap();
    assert_status(response, StatusCode::CREATED).await.unwrap();

    let response = server.get_auth("/notifications/unread-count", &bob.access_token).await.unwrap();
    let unread: CountResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(unread.count, 1);

    let response = server.get_auth("/notifications", &bob.access_token).await.unwrap();
    let inbox: Vec<NotificationResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, "message");
    assert!(!inbox[0].read);

    let response = server
        .post_auth_empty(&format!("/notifications/{}/read", inbox[0].id), &bob.access_token)
        .await
        .unwrap();
    assert_status(response, StatusCode::NO_CONTENT).await.unwrap();

    let response = server.get_auth("/notifications/unread-count", &bob.access_token).await.unwrap();
    let unread: CountResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(unread.count, 0);

    // The sender is never notified about their own message
    let response = server.get_auth("/notifications", &alice.access_token).await.unwrap();
    let inbox: Vec<NotificationResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(inbox.is_empty());
}

// ============================================================================
// Marketplace Tests
// ============================================================================

#[tokio::test]
async fn test_order_lifecycle_gates_reviews() {
    let server = TestServer::start().await.expect("Failed to start server");
    let seller = server.register().await.unwrap();
    let buyer = server.register().await.unwrap();

    let response = server
        .post_auth("/services", &seller.access_token, &CreateServiceRequest::unique())
        .await
        .unwrap();
    let service: ServiceResponse = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(service.seller_id, seller.user.id);
    assert_eq!(service.category, "readings");
    assert!(service.currency.eq_ignore_ascii_case("usd"));
    assert_eq!(service.status, "active");

    let reviews_path = format!("/services/{}/reviews", service.id);
    let review = CreateReviewRequest {
        rating: 5,
        comment: Some("Spot on".to_string()),
    };

    // No completed order yet
    let response = server.post_auth(&reviews_path, &buyer.access_token, &review).await.unwrap();
    let code = assert_error(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(code, "NOT_VERIFIED_PURCHASER");

    let response = server
        .post_auth_empty(&format!("/services/{}/orders", service.id), &buyer.access_token)
        .await
        .unwrap();
    let order: OrderResponse = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(order.status, "pending");
    assert_eq!(order.buyer_id, buyer.user.id);
    assert_eq!(order.seller_id, seller.user.id);

    // Only the seller moves an order forward
    let response = server
        .post_auth_empty(&format!("/orders/{}/accept", order.id), &buyer.access_token)
        .await
        .unwrap();
    assert_status(response, StatusCode::UNPROCESSABLE_ENTITY).await.unwrap();

    let response = server
        .post_auth_empty(&format!("/orders/{}/accept", order.id), &seller.access_token)
        .await
        .unwrap();
    let accepted: OrderResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(accepted.status, "accepted");

    // Accepted is not enough to review
    let response = server.post_auth(&reviews_path, &buyer.access_token, &review).await.unwrap();
    assert_status(response, StatusCode::FORBIDDEN).await.unwrap();

    let response = server
        .post_auth_empty(&format!("/orders/{}/complete", order.id), &seller.access_token)
        .await
        .unwrap();
    let completed: OrderResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(completed.status, "completed");
    assert!(completed.completed_at.is_some());

    let response = server.post_auth(&reviews_path, &buyer.access_token, &review).await.unwrap();
    let created: ReviewResponse = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(created.order_id, order.id);
    assert_eq!(created.reviewer_id, buyer.user.id);
    assert_eq!(created.rating, 5);

    let response = server.post_auth(&reviews_path, &buyer.access_token, &review).await.unwrap();
    let code = assert_error(response, StatusCode::CONFLICT).await.unwrap();
    assert_eq!(code, "ALREADY_REVIEWED");

    // Reviews are public
    let response = server.get(&reviews_path).await.unwrap();
    let reviews: Vec<ReviewResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(reviews.len(), 1);

    let response = server
        .get_auth(&format!("/services/{}", service.id), &buyer.access_token)
        .await
        .unwrap();
    let service: ServiceResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(service.rating["count"], 1);

    let response = server.get_auth("/notifications", &seller.access_token).await.unwrap();
    let inbox: Vec<NotificationResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(inbox.iter().any(|n| n.kind == "order"));
    assert!(inbox.iter().any(|n| n.kind == "review"));
}

#[tokio::test]
async fn test_seller_cannot_order_own_service() {
    let server = TestServer::start().await.expect("Failed to start server");
    let seller = server.register().await.unwrap();

    let response = server
        .post_auth("/services", &seller.access_token, &CreateServiceRequest::unique())
        .await
        .unwrap();
    let service: ServiceResponse = assert_json(response, StatusCode::CREATED).await.unwrap();

    let response = server
        .post_auth_empty(&format!("/services/{}/orders", service.id), &seller.access_token)
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

// ============================================================================
// Moderation Tests
// ============================================================================

#[tokio::test]
async fn test_block_prevents_direct_messages() {
    let server = TestServer::start().await.expect("Failed to start server");
    let alice = server.register().await.unwrap();
    let bob = server.register().await.unwrap();

    let response = server
        .put_auth_empty(&format!("/users/{}/block", bob.user.id), &alice.access_token)
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = server
        .post_auth("/conversations/direct", &bob.access_token, &OpenDirectRequest { user_id: alice.user.id.clone() })
        .await
        .unwrap();
    assert_status(response, StatusCode::FORBIDDEN).await.unwrap();
}

#[tokio::test]
async fn test_admin_routes_require_staff() {
    let server = TestServer::start().await.expect("Failed to start server");
    let auth = server.register().await.unwrap();

    let response = server.get_auth("/admin/users", &auth.access_token).await.unwrap();
    let code = assert_error(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(code, "MISSING_PERMISSIONS");
}
