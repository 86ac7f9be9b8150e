//! Domain entities - core business objects

mod billing;
mod conversation;
mod credential;
mod marketplace;
mod moderation;
mod notification;
mod post;
mod user;

pub use billing::{
    Invoice, InvoiceStatus, PaymentCustomer, PaymentMethod, PaymentProvider, Plan, Subscription,
    SubscriptionStatus,
};
pub use conversation::{
    direct_key, Conversation, ConversationKind, ConversationMember, MemberRole, Message,
    GROUP_MAX_MEMBERS, GROUP_NAME_MAX_LEN, MESSAGE_MAX_LEN,
};
pub use credential::{
    AuthChallenge, ChallengePurpose, OAuthAccount, OAuthProvider, RefreshToken, WebAuthnCredential,
};
pub use marketplace::{
    validate_rating, OrderParty, OrderStatus, RatingSummary, ServiceListing, ServiceOrder,
    ServiceReview, ServiceStatus,
};
pub use moderation::{
    Appeal, AppealKind, AppealStatus, AuditEntry, Block, Report, ReportStatus, ReportSubject,
};
pub use notification::{Notification, NotificationKind, PushSubscription};
pub use post::{excerpt, Comment, Post, COMMENT_MAX_LEN, POST_MAX_LEN};
pub use user::{
    username_base, validate_username, MessagePolicy, ProfileVisibility, User, UserRole, UserStatus,
};
