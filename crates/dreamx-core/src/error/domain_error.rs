//! Domain errors - error types for the domain layer

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("User not found: {0}")]
    UserNotFound(Snowflake),

    #[error("Post not found: {0}")]
    PostNotFound(Snowflake),

    #[error("Comment not found: {0}")]
    CommentNotFound(Snowflake),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(Snowflake),

    #[error("Message not found: {0}")]
    MessageNotFound(Snowflake),

    #[error("Notification not found: {0}")]
    NotificationNotFound(Snowflake),

    #[error("Service not found: {0}")]
    ServiceNotFound(Snowflake),

    #[error("Order not found: {0}")]
    OrderNotFound(Snowflake),

    #[error("Payment method not found: {0}")]
    PaymentMethodNotFound(Snowflake),

    #[error("No subscription for user")]
    SubscriptionNotFound,

    #[error("Report not found: {0}")]
    ReportNotFound(Snowflake),

    #[error("Appeal not found: {0}")]
    AppealNotFound(Snowflake),

    #[error("Credential not found")]
    CredentialNotFound,

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Password too weak: {0}")]
    WeakPassword(String),

    #[error("Content too long: max {max} characters")]
    ContentTooLong { max: usize },

    #[error("Invalid reaction: {0}")]
    InvalidReaction(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not a member of this conversation")]
    NotConversationMember,

    #[error("Account is suspended")]
    AccountSuspended {
        until: Option<DateTime<Utc>>,
        reason: Option<String>,
    },

    #[error("Account is banned")]
    AccountBanned,

    #[error("Only buyers with a completed order may review this service")]
    NotVerifiedPurchaser,

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("Email already in use")]
    EmailAlreadyExists,

    #[error("Username already taken")]
    UsernameAlreadyExists,

    #[error("Service already reviewed by this user")]
    AlreadyReviewed,

    #[error("An open report already exists for this subject")]
    DuplicateReport,

    #[error("A pending appeal already exists")]
    DuplicateAppeal,

    #[error("User already has an active subscription")]
    SubscriptionAlreadyActive,

    #[error("Credential already registered")]
    CredentialAlreadyRegistered,

    // =========================================================================
    // Business Rule Violations
    // =========================================================================
    #[error("Cannot perform this action on yourself")]
    CannotTargetSelf,

    #[error("Interaction blocked between these users")]
    Blocked,

    #[error("User does not accept messages")]
    MessagesDisabled,

    #[error("Service is not available for ordering")]
    ServiceUnavailable,

    #[error("Invalid order transition: {from} -> {to}")]
    InvalidOrderTransition { from: String, to: String },

    #[error("Token is invalid or expired")]
    InvalidToken,

    #[error("Authenticator rejected: {0}")]
    AuthenticatorRejected(String),

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Integration error: {0}")]
    IntegrationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::UserNotFound(_) => "UNKNOWN_USER",
            Self::PostNotFound(_) => "UNKNOWN_POST",
            Self::CommentNotFound(_) => "UNKNOWN_COMMENT",
            Self::ConversationNotFound(_) => "UNKNOWN_CONVERSATION",
            Self::MessageNotFound(_) => "UNKNOWN_MESSAGE",
            Self::NotificationNotFound(_) => "UNKNOWN_NOTIFICATION",
            Self::ServiceNotFound(_) => "UNKNOWN_SERVICE",
            Self::OrderNotFound(_) => "UNKNOWN_ORDER",
            Self::PaymentMethodNotFound(_) => "UNKNOWN_PAYMENT_METHOD",
            Self::SubscriptionNotFound => "UNKNOWN_SUBSCRIPTION",
            Self::ReportNotFound(_) => "UNKNOWN_REPORT",
            Self::AppealNotFound(_) => "UNKNOWN_APPEAL",
            Self::CredentialNotFound => "UNKNOWN_CREDENTIAL",

            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::InvalidUsername(_) => "INVALID_USERNAME",
            Self::WeakPassword(_) => "WEAK_PASSWORD",
            Self::ContentTooLong { .. } => "CONTENT_TOO_LONG",
            Self::InvalidReaction(_) => "INVALID_REACTION",
            Self::InvalidUpload(_) => "INVALID_UPLOAD",

            // Authorization
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotConversationMember => "NOT_CONVERSATION_MEMBER",
            Self::AccountSuspended { .. } => "ACCOUNT_SUSPENDED",
            Self::AccountBanned => "ACCOUNT_BANNED",
            Self::NotVerifiedPurchaser => "NOT_VERIFIED_PURCHASER",

            // Conflict
            Self::EmailAlreadyExists => "EMAIL_ALREADY_EXISTS",
            Self::UsernameAlreadyExists => "USERNAME_ALREADY_EXISTS",
            Self::AlreadyReviewed => "ALREADY_REVIEWED",
            Self::DuplicateReport => "DUPLICATE_REPORT",
            Self::DuplicateAppeal => "DUPLICATE_APPEAL",
            Self::SubscriptionAlreadyActive => "SUBSCRIPTION_ALREADY_ACTIVE",
            Self::CredentialAlreadyRegistered => "CREDENTIAL_ALREADY_REGISTERED",

            // Business Rules
            Self::CannotTargetSelf => "CANNOT_TARGET_SELF",
            Self::Blocked => "BLOCKED",
            Self::MessagesDisabled => "MESSAGES_DISABLED",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::InvalidOrderTransition { .. } => "INVALID_ORDER_TRANSITION",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::AuthenticatorRejected(_) => "AUTHENTICATOR_REJECTED",

            // Infrastructure
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::IntegrationError(_) => "INTEGRATION_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_)
                | Self::PostNotFound(_)
                | Self::CommentNotFound(_)
                | Self::ConversationNotFound(_)
                | Self::MessageNotFound(_)
                | Self::NotificationNotFound(_)
                | Self::ServiceNotFound(_)
                | Self::OrderNotFound(_)
                | Self::PaymentMethodNotFound(_)
                | Self::SubscriptionNotFound
                | Self::ReportNotFound(_)
                | Self::AppealNotFound(_)
                | Self::CredentialNotFound
        )
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_)
                | Self::InvalidEmail
                | Self::InvalidUsername(_)
                | Self::WeakPassword(_)
                | Self::ContentTooLong { .. }
                | Self::InvalidReaction(_)
                | Self::InvalidUpload(_)
        )
    }

    /// Check if this is an authorization error
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            Self::Forbidden(_)
                | Self::NotConversationMember
                | Self::AccountSuspended { .. }
                | Self::AccountBanned
                | Self::NotVerifiedPurchaser
        )
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::EmailAlreadyExists
                | Self::UsernameAlreadyExists
                | Self::AlreadyReviewed
                | Self::DuplicateReport
                | Self::DuplicateAppeal
                | Self::SubscriptionAlreadyActive
                | Self::CredentialAlreadyRegistered
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(DomainError::UserNotFound(Snowflake::new(1)).code(), "UNKNOWN_USER");
        assert_eq!(DomainError::NotVerifiedPurchaser.code(), "NOT_VERIFIED_PURCHASER");
        assert_eq!(
            DomainError::InvalidOrderTransition {
                from: "pending".into(),
                to: "completed".into()
            }
            .code(),
            "INVALID_ORDER_TRANSITION"
        );
    }

    #[test]
    fn test_classification() {
        assert!(DomainError::PostNotFound(Snowflake::new(1)).is_not_found());
        assert!(DomainError::InvalidReaction("x".into()).is_validation());
        assert!(DomainError::AccountBanned.is_authorization());
        assert!(DomainError::AlreadyReviewed.is_conflict());
    }

    #[test]
    fn test_error_display() {
        let err = DomainError::ContentTooLong { max: 5000 };
        assert_eq!(err.to_string(), "Content too long: max 5000 characters");

        let err = DomainError::InvalidOrderTransition {
            from: "pending".into(),
            to: "completed".into(),
        };
        assert_eq!(err.to_string(), "Invalid order transition: pending -> completed");
    }
}
