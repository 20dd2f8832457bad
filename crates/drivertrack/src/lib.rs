//! Top-level facade crate for drivertrack.
//!
//! Re-exports core types and the gateway library so users can depend on a single crate.

pub mod core {
    pub use drivertrack_core::*;
}

pub mod gateway {
    pub use drivertrack_gateway::*;
}
