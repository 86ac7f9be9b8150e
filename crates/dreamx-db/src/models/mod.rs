//! Database models - SQLx-compatible structs for SQLite tables

mod billing;
mod credential;
mod marketplace;
mod messaging;
mod moderation;
mod notification;
mod post;
mod user;

pub use billing::{InvoiceModel, PaymentCustomerModel, PaymentMethodModel, SubscriptionModel};
pub use credential::{AuthChallengeModel, OAuthAccountModel, RefreshTokenModel, WebAuthnCredentialModel};
pub use marketplace::{RatingModel, ServiceModel, ServiceOrderModel, ServiceReviewModel};
pub use messaging::{ConversationMemberModel, ConversationModel, MessageModel};
pub use moderation::{AppealModel, AuditEntryModel, BlockModel, ReportModel};
pub use notification::{NotificationModel, PushSubscriptionModel};
pub use post::{CommentModel, PostModel, ReactionCountModel};
pub use user::UserModel;
