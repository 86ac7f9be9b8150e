//! Application error types
//!
//! Failures that cross crate boundaries: authentication, infrastructure
//! and domain rule violations, each with a status and a stable code.

use dreamx_core::DomainError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Realtime error: {0}")]
    Realtime(String),

    /// A payment, OAuth, mail or push provider failed
    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::InvalidInput(_) => 400,
            Self::InvalidCredentials | Self::InvalidToken | Self::TokenExpired => 401,
            Self::InsufficientPermissions => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::ExternalService(_) => 502,
            Self::Database(_) | Self::Realtime(_) | Self::Internal(_) | Self::Config(_) => 500,
            Self::Domain(e) => domain_status(e),
        }
    }

    /// Stable machine-readable code for API responses
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Realtime(_) => "REALTIME_ERROR",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Domain(e) => e.code(),
        }
    }
}

/// HTTP status for a domain error
#[must_use]
pub fn domain_status(e: &DomainError) -> u16 {
    if e.is_not_found() {
        return 404;
    }
    if e.is_validation() {
        return 400;
    }
    if e.is_authorization() {
        return 403;
    }
    if e.is_conflict() {
        return 409;
    }
    match e {
        DomainError::CannotTargetSelf | DomainError::InvalidToken => 400,
        DomainError::AuthenticatorRejected(_) => 401,
        DomainError::Blocked | DomainError::MessagesDisabled => 403,
        DomainError::ServiceUnavailable | DomainError::InvalidOrderTransition { .. } => 422,
        DomainError::IntegrationError(_) => 502,
        _ => 500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreamx_core::Snowflake;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::InvalidCredentials.status_code(), 401);
        assert_eq!(AppError::TokenExpired.status_code(), 401);
        assert_eq!(AppError::InsufficientPermissions.status_code(), 403);
        assert_eq!(AppError::NotFound("user".to_string()).status_code(), 404);
        assert_eq!(AppError::Validation("test".to_string()).status_code(), 400);
        assert_eq!(AppError::Database("test".to_string()).status_code(), 500);
        assert_eq!(AppError::ExternalService("stripe".to_string()).status_code(), 502);
    }

    #[test]
    fn test_domain_status_codes() {
        assert_eq!(AppError::from(DomainError::PostNotFound(Snowflake::new(1))).status_code(), 404);
        assert_eq!(AppError::from(DomainError::NotVerifiedPurchaser).status_code(), 403);
        assert_eq!(AppError::from(DomainError::AccountBanned).status_code(), 403);
        assert_eq!(AppError::from(DomainError::AlreadyReviewed).status_code(), 409);
        assert_eq!(AppError::from(DomainError::Blocked).status_code(), 403);
        assert_eq!(
            AppError::from(DomainError::InvalidOrderTransition {
                from: "pending".into(),
                to: "completed".into()
            })
            .status_code(),
            422
        );
        assert_eq!(AppError::from(DomainError::CannotTargetSelf).status_code(), 400);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::InvalidCredentials.error_code(), "INVALID_CREDENTIALS");
        assert_eq!(AppError::NotFound("user".to_string()).error_code(), "NOT_FOUND");
        assert_eq!(AppError::from(DomainError::AccountBanned).error_code(), "ACCOUNT_BANNED");
    }

    #[test]
    fn test_internal_hides_cause() {
        let err = AppError::Internal(anyhow::anyhow!("pool exhausted"));
        assert_eq!(err.to_string(), "Internal server error");
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }
}
