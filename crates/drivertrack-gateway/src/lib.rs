//! drivertrack gateway library entry.
//!
//! Wires the authenticator, the location registry, and the driver WebSocket
//! session handler into a server, plus ops and read endpoints. Consumed by the
//! binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod obs;
pub mod ops;
pub mod registry;
pub mod router;
pub mod transport;
