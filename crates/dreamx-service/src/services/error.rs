//! Service layer error types
//!
//! Provides a unified error type for all service operations.

use dreamx_common::AppError;
use dreamx_core::{DomainError, IntegrationError};
use std::fmt;

/// Service layer error type
#[derive(Debug)]
pub enum ServiceError {
    /// Domain rule violation
    Domain(DomainError),

    /// Application error (auth, validation, etc.)
    App(AppError),

    /// Third-party call failed or a webhook was rejected
    Integration(IntegrationError),

    /// Resource not found
    NotFound { resource: &'static str, id: String },

    /// Permission denied
    PermissionDenied { permission: String },

    /// Missing or unusable credentials
    Unauthorized(String),

    /// Validation error
    Validation(String),

    /// Conflict (e.g., duplicate resource)
    Conflict(String),

    /// Internal error
    Internal(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(e) => write!(f, "{e}"),
            Self::App(e) => write!(f, "{e}"),
            Self::Integration(e) => write!(f, "{e}"),
            Self::NotFound { resource, id } => write!(f, "{resource} not found: {id}"),
            Self::PermissionDenied { permission } => {
                write!(f, "Missing required permission: {permission}")
            }
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            Self::Validation(msg) => write!(f, "Validation error: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Domain(e) => Some(e),
            Self::App(e) => Some(e),
            Self::Integration(e) => Some(e),
            _ => None,
        }
    }
}

impl ServiceError {
    /// Create a not found error
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Create a permission denied error
    pub fn permission_denied(permission: impl Into<String>) -> Self {
        Self::PermissionDenied {
            permission: permission.into(),
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Domain(e) => dreamx_common::domain_status(e),
            Self::App(e) => e.status_code(),
            Self::Integration(e) => match e {
                IntegrationError::InvalidSignature => 400,
                IntegrationError::NotConfigured(_) => 503,
                _ => 502,
            },
            Self::NotFound { .. } => 404,
            Self::PermissionDenied { .. } => 403,
            Self::Unauthorized(_) => 401,
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code for API responses
    pub fn error_code(&self) -> &str {
        match self {
            Self::Domain(e) => e.code(),
            Self::App(e) => e.error_code(),
            Self::Integration(e) => match e {
                IntegrationError::InvalidSignature => "INVALID_SIGNATURE",
                IntegrationError::NotConfigured(_) => "NOT_CONFIGURED",
                _ => "INTEGRATION_ERROR",
            },
            Self::NotFound { .. } => "NOT_FOUND",
            Self::PermissionDenied { .. } => "MISSING_PERMISSIONS",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl From<AppError> for ServiceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Domain(e) => Self::Domain(e),
            other => Self::App(other),
        }
    }
}

impl From<IntegrationError> for ServiceError {
    fn from(err: IntegrationError) -> Self {
        Self::Integration(err)
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e) => AppError::Domain(e),
            ServiceError::App(e) => e,
            ServiceError::Integration(IntegrationError::InvalidSignature) => {
                AppError::InvalidInput("invalid webhook signature".to_string())
            }
            ServiceError::Integration(e) => AppError::ExternalService(e.to_string()),
            ServiceError::NotFound { resource, id } => {
                AppError::NotFound(format!("{resource} {id}"))
            }
            ServiceError::PermissionDenied { permission: _ } => {
                AppError::InsufficientPermissions
            }
            ServiceError::Unauthorized(_) => AppError::InvalidToken,
            ServiceError::Validation(msg) => AppError::Validation(msg),
            ServiceError::Conflict(msg) => AppError::Conflict(msg),
            ServiceError::Internal(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use dreamx_core::Snowflake;

    #[test]
    fn test_not_found_error() {
        let err = ServiceError::not_found("Post", "123");
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(err.to_string().contains("Post not found: 123"));
    }

    #[test]
    fn test_permission_denied_error() {
        let err = ServiceError::permission_denied("staff");
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.error_code(), "MISSING_PERMISSIONS");
    }

    #[test]
    fn test_unauthorized_error() {
        let err = ServiceError::unauthorized("refresh token revoked");
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.error_code(), "UNAUTHORIZED");
    }

    #[test]
    fn test_domain_errors_keep_their_status() {
        assert_eq!(ServiceError::from(DomainError::NotVerifiedPurchaser).status_code(), 403);
        assert_eq!(ServiceError::from(DomainError::AccountBanned).error_code(), "ACCOUNT_BANNED");
        assert_eq!(
            ServiceError::from(DomainError::InvalidOrderTransition {
                from: "pending".into(),
                to: "completed".into()
            })
            .status_code(),
            422
        );
        assert_eq!(ServiceError::from(DomainError::AlreadyReviewed).status_code(), 409);
    }

    #[test]
    fn test_app_domain_error_is_unwrapped() {
        let err = ServiceError::from(AppError::Domain(DomainError::UserNotFound(Snowflake::new(1))));
        assert!(matches!(err, ServiceError::Domain(DomainError::UserNotFound(_))));
    }

    #[test]
    fn test_invalid_signature_is_bad_request() {
        let err = ServiceError::from(IntegrationError::InvalidSignature);
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "INVALID_SIGNATURE");

        let err = ServiceError::from(IntegrationError::Provider { status: 500, message: "x".into() });
        assert_eq!(err.status_code(), 502);
    }

    #[test]
    fn test_convert_to_app_error() {
        let service_err = ServiceError::not_found("Service", "456");
        let app_err: AppError = service_err.into();
        assert_eq!(app_err.status_code(), 404);
    }
}
