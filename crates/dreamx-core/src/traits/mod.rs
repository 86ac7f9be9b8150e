//! Ports implemented by the infrastructure crates

mod integrations;
mod repositories;

pub use integrations::{
    CustomerRequest, IdentityProvider, IntegrationError, IntegrationResult, Mailer, OAuthProfile,
    OutgoingEmail, PaymentIntent, PaymentProcessor, PaymentRequest, ProviderSubscription,
    PushOutcome, PushSender, SubscriptionRequest, WebhookEvent, WebhookEventKind, WebhookPayload,
};
pub use repositories::{
    AppealRepository, AuditRepository, AuthChallengeRepository, BlockRepository,
    CommentRepository, ConversationRepository, CursorQuery, InvoiceRepository, MessageRepository,
    NotificationRepository, OAuthAccountRepository, OrderRepository, PageQuery,
    PaymentCustomerRepository, PaymentEventRepository, PaymentMethodRepository, PostRepository,
    PushSubscriptionRepository, ReactionRepository, RefreshTokenRepository, RepoResult,
    ReportRepository, ReviewRepository, ServiceFilter, ServiceListingRepository,
    SubscriptionRepository, UserFilter, UserRepository, WebAuthnCredentialRepository,
    DEFAULT_LIMIT, MAX_LIMIT,
};
