//! Transport layer (WebSocket).
//!
//! Exposes the driver WS upgrade handler and the codec that turns frames into
//! location updates before they reach the registry.

pub mod codec;
pub mod ws;
