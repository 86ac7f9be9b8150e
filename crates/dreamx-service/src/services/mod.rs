//! Business logic services
//!
//! This module contains all service layer implementations that handle
//! business logic, validation, and orchestration of domain operations.

pub mod admin;
pub mod auth;
pub mod billing;
pub mod context;
pub mod conversation;
pub mod delivery;
pub mod error;
pub mod marketplace;
pub mod message;
pub mod moderation;
pub mod notification;
pub mod oauth;
pub mod post;
pub mod reaction;
pub mod upload;
pub mod user;
pub mod webauthn;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export all services for convenience
pub use admin::AdminService;
pub use auth::AuthService;
pub use billing::{BillingService, WEBHOOK_PATH};
pub use context::{Repositories, ServiceContext, ServiceContextBuilder};
pub use conversation::ConversationService;
pub use delivery::{DeliveryJob, NotificationQueue};
pub use error::{ServiceError, ServiceResult};
pub use marketplace::MarketplaceService;
pub use message::MessageService;
pub use moderation::ModerationService;
pub use notification::NotificationService;
pub use oauth::OAuthService;
pub use post::PostService;
pub use reaction::ReactionService;
pub use upload::{IncomingFile, UploadKind, UploadService, UPLOADS_PATH};
pub use user::UserService;
pub use webauthn::WebAuthnService;
