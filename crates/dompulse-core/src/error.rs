//! Shared error type across DomPulse crates.

use thiserror::Error;

/// Stable error codes, used in logs and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed message.
    BadRequest,
    /// Frame exceeds the configured size limit.
    PayloadTooLarge,
    /// Unsupported config or protocol version.
    UnsupportedVersion,
    /// Internal error.
    Internal,
}

impl ClientCode {
    /// String representation used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, DomPulseError>;

/// Unified error type used by core and relay.
#[derive(Debug, Error)]
pub enum DomPulseError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("unsupported version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl DomPulseError {
    /// Map an error to its stable code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            DomPulseError::BadRequest(_) => ClientCode::BadRequest,
            DomPulseError::PayloadTooLarge => ClientCode::PayloadTooLarge,
            DomPulseError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            DomPulseError::Internal(_) => ClientCode::Internal,
        }
    }
}
