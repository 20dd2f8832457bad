//! Mandatory token signing settings from the process environment.
//!
//! `SECRET_KEY` and `ALGORITHM` must both be set; the gateway refuses to
//! start otherwise.

use std::fmt;
use std::str::FromStr;

use jsonwebtoken::Algorithm;

use drivertrack_core::error::{DriverTrackError, Result};

pub const SECRET_KEY_VAR: &str = "SECRET_KEY";
pub const ALGORITHM_VAR: &str = "ALGORITHM";

/// Verified-at-startup signing key and algorithm.
#[derive(Clone)]
pub struct SigningSettings {
    secret_key: String,
    algorithm: Algorithm,
}

impl SigningSettings {
    pub fn new(secret_key: impl Into<String>, algorithm: Algorithm) -> Result<Self> {
        let secret_key = secret_key.into();
        if secret_key.is_empty() {
            return Err(DriverTrackError::Config(format!("{SECRET_KEY_VAR} must not be empty")));
        }
        Ok(Self {
            secret_key,
            algorithm,
        })
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

impl fmt::Debug for SigningSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSettings")
            .field("secret_key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

pub fn signing_from_env() -> Result<SigningSettings> {
    signing_from_lookup(|name| std::env::var(name).ok())
}

/// Resolve signing settings through `lookup` (the environment in production).
pub fn signing_from_lookup<F>(lookup: F) -> Result<SigningSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let secret = lookup(SECRET_KEY_VAR).filter(|v| !v.is_empty());
    let algorithm = lookup(ALGORITHM_VAR).filter(|v| !v.trim().is_empty());

    let (Some(secret), Some(algorithm)) = (secret, algorithm) else {
        return Err(DriverTrackError::Config(format!(
            "{SECRET_KEY_VAR} and {ALGORITHM_VAR} must be set in environment variables"
        )));
    };

    let algorithm = Algorithm::from_str(algorithm.trim()).map_err(|e| {
        DriverTrackError::Config(format!("{ALGORITHM_VAR} not supported ({algorithm}): {e}"))
    })?;

    SigningSettings::new(secret, algorithm)
}
