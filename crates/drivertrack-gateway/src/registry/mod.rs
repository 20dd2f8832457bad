//! Process-wide driver location registry.
//!
//! Constructed once at startup and shared by handle (`Arc`) with every
//! session handler and every read endpoint.

mod location_registry;

pub use location_registry::{DriverLease, LocationRecord, LocationRegistry};
