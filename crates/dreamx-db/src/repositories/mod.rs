//! Repository implementations
//!
//! SQLite implementations of the repository traits defined in dreamx-core.
//! Multi-statement operations run inside a single transaction and never touch
//! the pool again until it commits.

mod billing;
mod credential;
mod error;
mod marketplace;
mod messaging;
mod moderation;
mod notification;
mod post;
mod reaction;
mod user;

pub use billing::{
    SqliteInvoiceRepository, SqlitePaymentCustomerRepository, SqlitePaymentEventRepository,
    SqlitePaymentMethodRepository, SqliteSubscriptionRepository,
};
pub use credential::{
    SqliteAuthChallengeRepository, SqliteOAuthAccountRepository, SqliteRefreshTokenRepository,
    SqliteWebAuthnCredentialRepository,
};
pub use marketplace::{SqliteOrderRepository, SqliteReviewRepository, SqliteServiceListingRepository};
pub use messaging::{SqliteConversationRepository, SqliteMessageRepository};
pub use moderation::{SqliteAppealRepository, SqliteAuditRepository, SqliteBlockRepository, SqliteReportRepository};
pub use notification::{SqliteNotificationRepository, SqlitePushSubscriptionRepository};
pub use post::{SqliteCommentRepository, SqlitePostRepository};
pub use reaction::SqliteReactionRepository;
pub use user::SqliteUserRepository;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repos_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteUserRepository>();
        assert_send_sync::<SqlitePostRepository>();
        assert_send_sync::<SqliteReactionRepository>();
        assert_send_sync::<SqliteConversationRepository>();
        assert_send_sync::<SqlitePaymentMethodRepository>();
        assert_send_sync::<SqliteAppealRepository>();
    }
}
