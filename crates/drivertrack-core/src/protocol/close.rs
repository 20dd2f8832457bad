//! Close codes and reasons sent when a session is rejected.

/// RFC 6455 policy violation.
pub const POLICY_VIOLATION: u16 = 1008;

/// Why an inbound session was refused before it reached the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No `token` query parameter.
    MissingToken,
    /// Signature, expiry, or algorithm check failed.
    InvalidToken,
    /// Role claim absent or not the delivery-driver role.
    InvalidRole,
    /// `sub` claim does not name the addressed driver.
    IdentityMismatch,
}

impl RejectReason {
    /// Human-readable close reason carried in the close frame.
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::MissingToken => "Missing token",
            RejectReason::InvalidToken => "Invalid token",
            RejectReason::InvalidRole => "Invalid role",
            RejectReason::IdentityMismatch => "Identity mismatch",
        }
    }

    /// Short label used for metrics.
    pub fn label(self) -> &'static str {
        match self {
            RejectReason::MissingToken => "missing_token",
            RejectReason::InvalidToken => "invalid_token",
            RejectReason::InvalidRole => "invalid_role",
            RejectReason::IdentityMismatch => "identity_mismatch",
        }
    }

    pub fn close_code(self) -> u16 {
        POLICY_VIOLATION
    }
}
