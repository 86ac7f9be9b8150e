//! # dreamx-core
//!
//! Domain layer containing entities, value objects, repository and integration
//! traits, and domain events. This crate has no dependency on infrastructure
//! (database, web framework, vendor SDKs).

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Appeal, AppealKind, AppealStatus, AuditEntry, AuthChallenge, Block, ChallengePurpose, Comment,
    Conversation, ConversationKind, ConversationMember, Invoice, InvoiceStatus, MemberRole,
    Message, MessagePolicy, Notification, NotificationKind, OAuthAccount, OAuthProvider,
    OrderParty, OrderStatus, PaymentCustomer, PaymentMethod, PaymentProvider, Plan, Post,
    ProfileVisibility, PushSubscription, RatingSummary, RefreshToken, Report, ReportStatus,
    ReportSubject, ServiceListing, ServiceOrder, ServiceReview, ServiceStatus, Subscription,
    SubscriptionStatus, User, UserRole, UserStatus, WebAuthnCredential,
};
pub use entities::{
    direct_key, excerpt, username_base, validate_rating, validate_username, COMMENT_MAX_LEN,
    GROUP_MAX_MEMBERS, GROUP_NAME_MAX_LEN, MESSAGE_MAX_LEN, POST_MAX_LEN,
};
pub use error::DomainError;
pub use events::DomainEvent;
pub use traits::*;
pub use value_objects::{
    ReactionKind, ReactionSummary, ReactionTarget, ReactionToggle, Snowflake, SnowflakeGenerator,
    SnowflakeParseError, ToggleOutcome,
};
