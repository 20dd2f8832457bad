//! Session authentication.
//!
//! Verifies the bearer token presented on the WebSocket query string and
//! checks the role claim. Pure: no registry or transport side effects.

mod authenticator;

pub use authenticator::{AuthRejection, Authenticator, Claims};
