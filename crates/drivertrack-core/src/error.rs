//! Shared error type across drivertrack crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Missing or invalid credential.
    Unauthenticated,
    /// Valid credential, wrong role or identity.
    Forbidden,
    /// I/O failure on the connection.
    Transport,
    /// Payload could not be decoded as a location update.
    MalformedPayload,
    /// Invalid input outside the data channel (query, config values).
    BadRequest,
    /// Startup configuration is missing or unusable.
    Config,
    /// Requested record does not exist.
    NotFound,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::Unauthenticated => "UNAUTHENTICATED",
            ClientCode::Forbidden => "FORBIDDEN",
            ClientCode::Transport => "TRANSPORT",
            ClientCode::MalformedPayload => "MALFORMED_PAYLOAD",
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::Config => "CONFIG",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, DriverTrackError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum DriverTrackError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("config: {0}")]
    Config(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl DriverTrackError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            DriverTrackError::Unauthenticated(_) => ClientCode::Unauthenticated,
            DriverTrackError::Forbidden(_) => ClientCode::Forbidden,
            DriverTrackError::Transport(_) => ClientCode::Transport,
            DriverTrackError::MalformedPayload(_) => ClientCode::MalformedPayload,
            DriverTrackError::BadRequest(_) => ClientCode::BadRequest,
            DriverTrackError::Config(_) => ClientCode::Config,
            DriverTrackError::NotFound(_) => ClientCode::NotFound,
            DriverTrackError::Internal(_) => ClientCode::Internal,
        }
    }

    /// Auth failures end the session before any registry mutation.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            DriverTrackError::Unauthenticated(_) | DriverTrackError::Forbidden(_)
        )
    }
}
