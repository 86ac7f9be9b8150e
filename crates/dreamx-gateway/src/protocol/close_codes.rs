//! WebSocket close codes

use serde::{Deserialize, Serialize};

/// Gateway close codes sent in the WebSocket close frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    UnknownError = 4000,
    /// Client sent an op code it may not send
    UnknownOpcode = 4001,
    /// Frame was not valid JSON or had a bad payload
    DecodeError = 4002,
    /// Payload sent before Identify
    NotAuthenticated = 4003,
    /// Token rejected or account unusable
    AuthenticationFailed = 4004,
    /// Identify sent twice
    AlreadyAuthenticated = 4005,
    /// No heartbeat inside the timeout
    SessionTimeout = 4009,
}

impl CloseCode {
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::UnknownError),
            4001 => Some(Self::UnknownOpcode),
            4002 => Some(Self::DecodeError),
            4003 => Some(Self::NotAuthenticated),
            4004 => Some(Self::AuthenticationFailed),
            4005 => Some(Self::AlreadyAuthenticated),
            4009 => Some(Self::SessionTimeout),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown error occurred",
            Self::UnknownOpcode => "Invalid opcode sent",
            Self::DecodeError => "Invalid payload encoding",
            Self::NotAuthenticated => "Not authenticated",
            Self::AuthenticationFailed => "Authentication failed",
            Self::AlreadyAuthenticated => "Already authenticated",
            Self::SessionTimeout => "Session timeout",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_u16())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code_round_trip_values() {
        for code in [
            CloseCode::UnknownError,
            CloseCode::UnknownOpcode,
            CloseCode::DecodeError,
            CloseCode::NotAuthenticated,
            CloseCode::AuthenticationFailed,
            CloseCode::AlreadyAuthenticated,
            CloseCode::SessionTimeout,
        ] {
            assert_eq!(CloseCode::from_u16(code.as_u16()), Some(code));
        }
        assert_eq!(CloseCode::from_u16(1000), None);
        assert_eq!(CloseCode::from_u16(4006), None);
    }

    #[test]
    fn test_close_code_display() {
        let display = CloseCode::AuthenticationFailed.to_string();
        assert!(display.contains("4004"));
        assert!(display.contains("Authentication"));
    }
}
