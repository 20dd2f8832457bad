//! Gateway config loader.
//!
//! Two layers: a strict YAML file for tunables, and mandatory environment
//! variables for the token signing settings. Both are validated once at
//! startup; nothing here is consulted per request.

pub mod env;
pub mod schema;

use std::fs;
use std::path::Path;

use drivertrack_core::error::{DriverTrackError, Result};

pub use env::{signing_from_env, signing_from_lookup, SigningSettings};
pub use schema::{AuthSection, GatewayConfig, GatewaySection, MalformedMode, PayloadSection};

/// Default YAML location, overridable with `DRIVERTRACK_CONFIG`.
pub const DEFAULT_CONFIG_PATH: &str = "drivertrack.yaml";

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| DriverTrackError::Config(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| DriverTrackError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load `path` if it exists, otherwise fall back to built-in defaults.
pub fn load_or_default(path: &str) -> Result<GatewayConfig> {
    if Path::new(path).exists() {
        let cfg = load_from_file(path)?;
        tracing::info!(%path, "config loaded");
        Ok(cfg)
    } else {
        tracing::info!(%path, "config file not found, using defaults");
        let cfg = GatewayConfig::default();
        cfg.validate()?;
        Ok(cfg)
    }
}
