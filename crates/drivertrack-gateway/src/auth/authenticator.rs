use jsonwebtoken::{
    decode, errors::ErrorKind, get_current_timestamp, Algorithm, DecodingKey, Validation,
};
use serde::Deserialize;
use serde_json::Value;

use drivertrack_core::error::{DriverTrackError, Result};
use drivertrack_core::protocol::close::RejectReason;

use crate::config::{AuthSection, SigningSettings};

/// Claims the gateway reads from a driver token. Everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    #[serde(default)]
    role: Option<Value>,
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default)]
    exp: Option<Value>,
}

impl Claims {
    pub fn role(&self) -> Option<&str> {
        self.role.as_ref().and_then(Value::as_str)
    }

    pub fn subject(&self) -> Option<&str> {
        self.sub.as_ref().and_then(Value::as_str)
    }

    /// Expiry in seconds since the epoch. Integer and fractional values
    /// are both accepted.
    pub fn expires_at(&self) -> Option<f64> {
        self.exp.as_ref().and_then(Value::as_f64)
    }
}

/// A refused session: the close reason plus a log-only detail.
#[derive(Debug, Clone)]
pub struct AuthRejection {
    pub reason: RejectReason,
    pub detail: String,
}

impl AuthRejection {
    fn new(reason: RejectReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

impl From<AuthRejection> for DriverTrackError {
    fn from(r: AuthRejection) -> Self {
        match r.reason {
            RejectReason::MissingToken | RejectReason::InvalidToken => {
                DriverTrackError::Unauthenticated(r.detail)
            }
            RejectReason::InvalidRole | RejectReason::IdentityMismatch => {
                DriverTrackError::Forbidden(r.detail)
            }
        }
    }
}

/// Token verifier built once at startup from the signing settings.
pub struct Authenticator {
    key: DecodingKey,
    validation: Validation,
    leeway_secs: u64,
    role: String,
    bind_subject: bool,
}

impl Authenticator {
    /// Fails with `Config` if the key does not fit the algorithm family.
    pub fn new(signing: &SigningSettings, auth: &AuthSection) -> Result<Self> {
        let algorithm = signing.algorithm();
        let key = decoding_key(algorithm, signing.secret_key())?;

        let mut validation = Validation::new(algorithm);
        // `exp` is optional and may be fractional, so `verify` checks it.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_aud = false;

        Ok(Self {
            key,
            validation,
            leeway_secs: auth.leeway_secs,
            role: auth.role.clone(),
            bind_subject: auth.bind_subject,
        })
    }

    pub fn required_role(&self) -> &str {
        &self.role
    }

    /// Verify signature and expiry, then the role claim.
    ///
    /// An empty token counts as missing.
    pub fn verify(&self, token: Option<&str>) -> std::result::Result<Claims, AuthRejection> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Err(AuthRejection::new(RejectReason::MissingToken, "no token supplied"));
        };

        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            let detail = match e.kind() {
                ErrorKind::ExpiredSignature => "token expired".to_string(),
                ErrorKind::InvalidSignature => "signature mismatch".to_string(),
                ErrorKind::InvalidAlgorithm => "algorithm mismatch".to_string(),
                _ => format!("token rejected: {e}"),
            };
            AuthRejection::new(RejectReason::InvalidToken, detail)
        })?;

        let claims = data.claims;
        self.check_expiry(&claims)?;
        if claims.role() != Some(self.role.as_str()) {
            return Err(AuthRejection::new(
                RejectReason::InvalidRole,
                format!("role claim {:?} is not {}", claims.role, self.role),
            ));
        }
        Ok(claims)
    }

    fn check_expiry(&self, claims: &Claims) -> std::result::Result<(), AuthRejection> {
        let Some(raw) = claims.exp.as_ref() else {
            return Ok(());
        };
        let Some(exp) = raw.as_f64() else {
            return Err(AuthRejection::new(
                RejectReason::InvalidToken,
                format!("exp claim {raw} is not numeric"),
            ));
        };
        let cutoff = get_current_timestamp().saturating_sub(self.leeway_secs) as f64;
        if exp < cutoff {
            return Err(AuthRejection::new(RejectReason::InvalidToken, "token expired"));
        }
        Ok(())
    }

    /// `verify` plus, when `bind_subject` is on, a `sub` check against the
    /// path-supplied driver id. Tokens without `sub` are keyed by the path.
    pub fn authorize(
        &self,
        token: Option<&str>,
        driver_id: &str,
    ) -> std::result::Result<Claims, AuthRejection> {
        let claims = self.verify(token)?;
        if self.bind_subject {
            if let Some(sub) = claims.subject() {
                if sub != driver_id {
                    return Err(AuthRejection::new(
                        RejectReason::IdentityMismatch,
                        format!("sub {sub} does not match path driver id"),
                    ));
                }
            }
        }
        Ok(claims)
    }
}

fn decoding_key(algorithm: Algorithm, secret: &str) -> Result<DecodingKey> {
    let bytes = secret.as_bytes();
    let key = match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(DecodingKey::from_secret(bytes)),
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => DecodingKey::from_rsa_pem(bytes),
        Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(bytes),
        Algorithm::EdDSA => DecodingKey::from_ed_pem(bytes),
    };
    key.map_err(|e| DriverTrackError::Config(format!("SECRET_KEY unusable for {algorithm:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{encode, get_current_timestamp, EncodingKey, Header};
    use serde_json::json;

    use super::*;

    const SECRET: &str = "unit-test-secret";

    fn authenticator(auth: AuthSection) -> Authenticator {
        let signing = SigningSettings::new(SECRET, Algorithm::HS256).unwrap();
        Authenticator::new(&signing, &auth).unwrap()
    }

    fn token(claims: Value, secret: &str) -> String {
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
            .unwrap()
    }

    fn in_ten_minutes() -> u64 {
        get_current_timestamp() + 600
    }

    #[test]
    fn missing_or_empty_token_is_unauthenticated() {
        let auth = authenticator(AuthSection::default());
        for t in [None, Some("")] {
            let r = auth.verify(t).unwrap_err();
            assert_eq!(r.reason, RejectReason::MissingToken);
            assert!(matches!(DriverTrackError::from(r), DriverTrackError::Unauthenticated(_)));
        }
    }

    #[test]
    fn bad_signature_and_expiry_are_unauthenticated() {
        let auth = authenticator(AuthSection::default());

        let forged = token(json!({ "role": "delivery_driver", "exp": in_ten_minutes() }), "other");
        assert_eq!(auth.verify(Some(&forged)).unwrap_err().reason, RejectReason::InvalidToken);

        let expired = token(
            json!({ "role": "delivery_driver", "exp": get_current_timestamp() - 120 }),
            SECRET,
        );
        let r = auth.verify(Some(&expired)).unwrap_err();
        assert_eq!(r.reason, RejectReason::InvalidToken);
        assert_eq!(r.detail, "token expired");

        assert_eq!(auth.verify(Some("garbage")).unwrap_err().reason, RejectReason::InvalidToken);
    }

    #[test]
    fn wrong_or_missing_role_is_forbidden() {
        let auth = authenticator(AuthSection::default());
        for claims in [
            json!({ "role": "customer", "exp": in_ten_minutes() }),
            json!({ "exp": in_ten_minutes() }),
            json!({ "role": 7 }),
        ] {
            let r = auth.verify(Some(&token(claims, SECRET))).unwrap_err();
            assert_eq!(r.reason, RejectReason::InvalidRole);
            assert!(matches!(DriverTrackError::from(r), DriverTrackError::Forbidden(_)));
        }
    }

    #[test]
    fn driver_token_without_exp_is_accepted() {
        let auth = authenticator(AuthSection::default());
        let claims = auth
            .verify(Some(&token(json!({ "role": "delivery_driver", "sub": "d1" }), SECRET)))
            .unwrap();
        assert_eq!(claims.role(), Some("delivery_driver"));
        assert_eq!(claims.subject(), Some("d1"));
        assert_eq!(claims.expires_at(), None);
    }

    #[test]
    fn fractional_exp_is_checked_like_an_integer() {
        let auth = authenticator(AuthSection::default());
        let now = get_current_timestamp() as f64;

        let live = token(json!({ "role": "delivery_driver", "exp": now + 600.25 }), SECRET);
        let claims = auth.verify(Some(&live)).unwrap();
        assert_eq!(claims.expires_at(), Some(now + 600.25));

        let stale = token(json!({ "role": "delivery_driver", "exp": now - 120.5 }), SECRET);
        let r = auth.verify(Some(&stale)).unwrap_err();
        assert_eq!(r.reason, RejectReason::InvalidToken);
        assert_eq!(r.detail, "token expired");
    }

    #[test]
    fn non_numeric_exp_is_invalid_token() {
        let auth = authenticator(AuthSection::default());
        let t = token(json!({ "role": "delivery_driver", "exp": "tomorrow" }), SECRET);
        assert_eq!(auth.verify(Some(&t)).unwrap_err().reason, RejectReason::InvalidToken);
    }

    #[test]
    fn leeway_tolerates_recent_expiry() {
        let auth = authenticator(AuthSection {
            leeway_secs: 300,
            ..AuthSection::default()
        });
        let t = token(
            json!({ "role": "delivery_driver", "exp": get_current_timestamp() - 60 }),
            SECRET,
        );
        assert!(auth.verify(Some(&t)).is_ok());
    }

    #[test]
    fn subject_binding_is_opt_in() {
        let t = token(json!({ "role": "delivery_driver", "sub": "d1" }), SECRET);

        let loose = authenticator(AuthSection::default());
        assert!(loose.authorize(Some(&t), "d2").is_ok());

        let strict = authenticator(AuthSection {
            bind_subject: true,
            ..AuthSection::default()
        });
        assert!(strict.authorize(Some(&t), "d1").is_ok());
        let r = strict.authorize(Some(&t), "d2").unwrap_err();
        assert_eq!(r.reason, RejectReason::IdentityMismatch);
    }

    #[test]
    fn rsa_algorithm_needs_a_pem_key() {
        let signing = SigningSettings::new("not a pem", Algorithm::RS256).unwrap();
        let err = Authenticator::new(&signing, &AuthSection::default())
            .err()
            .map(|e| e.client_code().as_str());
        assert_eq!(err, Some("CONFIG"));
    }
}
