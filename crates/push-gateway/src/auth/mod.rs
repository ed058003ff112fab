//! Connect-time authentication.
//!
//! [`TokenValidator`] verifies bearer-token signatures and expiry against
//! the configured shared secret; [`TokenSource`] extracts the token from
//! the handshake's heterogeneous shapes.

pub mod token_source;
pub mod token_validator;

pub use token_source::TokenSource;
pub use token_validator::{AuthFailure, TokenValidator};
