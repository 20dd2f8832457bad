//! Wire contract checks for what drivers' clients observe.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use drivertrack_core::error::ClientCode;
use drivertrack_core::protocol::close::{RejectReason, POLICY_VIOLATION};
use drivertrack_core::protocol::location::{ack_text, LocationUpdate};
use drivertrack_core::DriverTrackError;

#[test]
fn rejection_reasons_are_policy_violations() {
    assert_eq!(RejectReason::MissingToken.as_str(), "Missing token");
    assert_eq!(RejectReason::InvalidRole.as_str(), "Invalid role");
    for r in [
        RejectReason::MissingToken,
        RejectReason::InvalidToken,
        RejectReason::InvalidRole,
        RejectReason::IdentityMismatch,
    ] {
        assert_eq!(r.close_code(), POLICY_VIOLATION);
    }
}

#[test]
fn auth_errors_are_classified() {
    assert!(DriverTrackError::Unauthenticated("x".into()).is_auth());
    assert!(DriverTrackError::Forbidden("x".into()).is_auth());
    assert!(!DriverTrackError::Transport("x".into()).is_auth());
    assert_eq!(
        DriverTrackError::Forbidden("x".into()).client_code(),
        ClientCode::Forbidden
    );
}

#[test]
fn sample_driver_session_payload() {
    let text = r#"{ "latitude": 12.9, "longitude": 77.6 }"#;
    let u = LocationUpdate::decode(text).expect("valid payload");
    assert_eq!(u.latitude, Some(12.9));
    assert_eq!(u.longitude, Some(77.6));
    assert!(u.is_within_bounds());
    assert_eq!(ack_text("driver-42"), "Location updated for driver driver-42");
}
