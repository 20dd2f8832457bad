//! Driver location wire protocol.
//!
//! - Inbound: one JSON object per text frame, `{ "latitude": .., "longitude": .. }`.
//! - Outbound: a plain text acknowledgment per applied update.
//! - Rejections: policy-violation close frames with a fixed reason string.
//!
//! Parsers are panic-free: malformed input is reported as
//! `DriverTrackError::MalformedPayload`.

pub mod close;
pub mod location;
