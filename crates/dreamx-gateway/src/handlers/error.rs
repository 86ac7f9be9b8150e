//! Handler error types

use dreamx_core::DomainError;
use thiserror::Error;

use crate::protocol::CloseCode;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Already authenticated")]
    AlreadyAuthenticated,

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Connection closed")]
    ConnectionClosed,
}

impl HandlerError {
    #[must_use]
    pub fn to_close_code(&self) -> CloseCode {
        match self {
            Self::InvalidPayload(_) => CloseCode::DecodeError,
            Self::AuthenticationFailed(_) => CloseCode::AuthenticationFailed,
            Self::AlreadyAuthenticated => CloseCode::AlreadyAuthenticated,
            Self::Domain(_) | Self::ConnectionClosed => CloseCode::UnknownError,
        }
    }
}

pub type HandlerResult<T> = Result<T, HandlerError>;
