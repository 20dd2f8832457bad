//! drivertrack core: transport-agnostic protocol primitives and error types.
//!
//! This crate defines the wire-level contracts (the driver location payload,
//! the acknowledgment text, policy close reasons) and the error surface shared
//! by the gateway and its tests. It carries no transport or runtime
//! dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed driver input surfaces as `DriverTrackError::MalformedPayload`
//! instead of crashing the process.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{Result, DriverTrackError};
