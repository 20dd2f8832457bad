//! Location update payload (client -> server) and acknowledgment (server -> client).

use serde::Deserialize;

use crate::error::{DriverTrackError, Result};

/// One location update as sent by a driver.
///
/// Both coordinates are optional: a missing or `null` field decodes to `None`
/// and is passed through unvalidated. Extra fields are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LocationUpdate {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl LocationUpdate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }

    /// Decode a text frame. Non-JSON text, a non-object, or a non-numeric
    /// coordinate is a `MalformedPayload`.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| DriverTrackError::MalformedPayload(format!("invalid location json: {e}")))
    }

    /// Both coordinates present and inside WGS84 bounds.
    pub fn is_within_bounds(&self) -> bool {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => {
                (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
            }
            _ => false,
        }
    }
}

/// Acknowledgment text sent after each applied update.
pub fn ack_text(driver_id: &str) -> String {
    format!("Location updated for driver {driver_id}")
}
