use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use drivertrack_core::error::{DriverTrackError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub payload: PayloadSection,

    #[serde(default)]
    pub auth: AuthSection,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            gateway: GatewaySection::default(),
            payload: PayloadSection::default(),
            auth: AuthSection::default(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(DriverTrackError::BadRequest(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.gateway.validate()?;
        self.auth.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// 0 disables server pings.
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    /// 0 disables idle eviction (drivers keep their entry while connected).
    #[serde(default)]
    pub idle_timeout_ms: u64,

    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: 0,
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if self.listen.parse::<SocketAddr>().is_err() {
            return Err(DriverTrackError::BadRequest(format!(
                "gateway.listen must be a valid socket address: {}",
                self.listen
            )));
        }
        if self.ping_interval_ms != 0 && !(1000..=120_000).contains(&self.ping_interval_ms) {
            return Err(DriverTrackError::BadRequest(
                "gateway.ping_interval_ms must be 0 or between 1000 and 120000".into(),
            ));
        }
        if self.idle_timeout_ms != 0 {
            if self.idle_timeout_ms > 3_600_000 || self.idle_timeout_ms < 1000 {
                return Err(DriverTrackError::BadRequest(
                    "gateway.idle_timeout_ms must be 0 or between 1000 and 3600000".into(),
                ));
            }
            if self.ping_interval_ms != 0 && self.idle_timeout_ms <= self.ping_interval_ms {
                return Err(DriverTrackError::BadRequest(
                    "gateway.idle_timeout_ms must be greater than ping_interval_ms".into(),
                ));
            }
        }
        if !(64..=1_048_576).contains(&self.max_frame_bytes) {
            return Err(DriverTrackError::BadRequest(
                "gateway.max_frame_bytes must be between 64 and 1048576".into(),
            ));
        }
        Ok(())
    }

    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval_ms > 0).then(|| Duration::from_millis(self.ping_interval_ms))
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_ms > 0).then(|| Duration::from_millis(self.idle_timeout_ms))
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_max_frame_bytes() -> usize {
    4096
}

/// What to do with a frame that does not decode as a location update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedMode {
    /// End the session (cleanup still runs).
    #[default]
    Close,
    /// Log and keep reading.
    Skip,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PayloadSection {
    #[serde(default)]
    pub on_malformed: MalformedMode,

    /// Skip updates with missing or out-of-range coordinates instead of storing them.
    #[serde(default)]
    pub validate_bounds: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSection {
    #[serde(default = "default_role")]
    pub role: String,

    /// Require the `sub` claim (when present) to equal the path driver id.
    #[serde(default)]
    pub bind_subject: bool,

    #[serde(default)]
    pub leeway_secs: u64,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            role: default_role(),
            bind_subject: false,
            leeway_secs: 0,
        }
    }
}

impl AuthSection {
    pub fn validate(&self) -> Result<()> {
        if self.role.trim().is_empty() {
            return Err(DriverTrackError::BadRequest("auth.role must not be empty".into()));
        }
        if self.leeway_secs > 300 {
            return Err(DriverTrackError::BadRequest(
                "auth.leeway_secs must be at most 300".into(),
            ));
        }
        Ok(())
    }
}

fn default_role() -> String {
    "delivery_driver".into()
}
