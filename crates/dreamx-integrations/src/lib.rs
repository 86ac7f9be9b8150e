//! # dreamx-integrations
//!
//! Adapters for the third-party services behind the ports in `dreamx-core`:
//!
//! - **Payments**: Stripe, Square and Lemon Squeezy [`PaymentProcessor`]s,
//!   including webhook signature checks
//! - **OAuth**: Google, GitHub and Discord authorization-code login
//! - **Mail**: SMTP via `lettre`, or a log-only mailer for development
//! - **Push**: payload-less Web Push signed with VAPID
//!
//! [`PaymentProcessor`]: dreamx_core::PaymentProcessor

pub mod http;
pub mod mail;
pub mod oauth;
pub mod payments;
pub mod push;
pub mod signature;

pub use mail::{create_mailer, LogMailer, SmtpMailer};
pub use oauth::{IdentityProviders, OAuthClient, OAuthEndpoints};
pub use payments::{
    create_payment_processor, LemonSqueezyProcessor, SquareProcessor, StripeProcessor,
};
pub use push::{create_push_sender, VapidPushSender};
