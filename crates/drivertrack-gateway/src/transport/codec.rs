//! Decode-once codec for driver frames.
//!
//! - Text frames => `LocationUpdate`
//! - Binary frames and oversize text => `MalformedPayload`
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use drivertrack_core::{
    error::{DriverTrackError, Result},
    protocol::location::LocationUpdate,
};

#[derive(Debug)]
pub enum Inbound {
    Location(LocationUpdate),
    Ping(Vec<u8>),
    Pong,
    Close,
}

/// Cheap frame length helper (checked before JSON parsing).
pub fn frame_len(msg: &Message) -> usize {
    match msg {
        Message::Text(s) => s.len(),
        Message::Binary(b) => b.len(),
        Message::Ping(v) => v.len(),
        Message::Pong(v) => v.len(),
        Message::Close(_) => 0,
    }
}

pub fn decode(msg: Message, max_frame_bytes: usize) -> Result<Inbound> {
    let len = frame_len(&msg);
    if len > max_frame_bytes {
        return Err(DriverTrackError::MalformedPayload(format!(
            "frame of {len} bytes exceeds limit of {max_frame_bytes}"
        )));
    }
    match msg {
        Message::Text(s) => LocationUpdate::decode(&s).map(Inbound::Location),
        Message::Binary(_) => Err(DriverTrackError::MalformedPayload(
            "binary frames are not supported".into(),
        )),
        Message::Ping(v) => Ok(Inbound::Ping(v)),
        Message::Pong(_) => Ok(Inbound::Pong),
        Message::Close(_) => Ok(Inbound::Close),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_frame_becomes_location() {
        let m = Message::Text(r#"{"latitude": 12.9, "longitude": 77.6}"#.to_string());
        match decode(m, 4096).unwrap() {
            Inbound::Location(u) => assert_eq!(u, LocationUpdate::new(12.9, 77.6)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn oversize_and_binary_are_malformed() {
        let big = Message::Text(format!(r#"{{"latitude": 1, "longitude": 2, "pad": "{}"}}"#, "x".repeat(200)));
        let err = decode(big, 64).unwrap_err();
        assert_eq!(err.client_code().as_str(), "MALFORMED_PAYLOAD");

        let err = decode(Message::Binary(vec![1, 2, 3]), 64).unwrap_err();
        assert_eq!(err.client_code().as_str(), "MALFORMED_PAYLOAD");
    }

    #[test]
    fn control_frames_pass_through() {
        assert!(matches!(decode(Message::Ping(vec![9]), 64).unwrap(), Inbound::Ping(p) if p == vec![9]));
        assert!(matches!(decode(Message::Pong(vec![]), 64).unwrap(), Inbound::Pong));
        assert!(matches!(decode(Message::Close(None), 64).unwrap(), Inbound::Close));
    }
}
