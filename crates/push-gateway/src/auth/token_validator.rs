//! Bearer-token validation against the configured shared secret.
//!
//! Tokens are HS512-signed compact JWS strings carrying at least an `exp`
//! claim. Validation never raises: any failure yields `false`, with the
//! reason classified for logging only. The secret and signature internals
//! are never exposed in logs or errors.

use common::jwt::{extract_expiry_ms, TokenError, MAX_TOKEN_SIZE_BYTES};
use common::secret::{ExposeSecret, SecretString};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::warn;

/// Classified connect-time authentication failure, for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No token was presented.
    Missing,
    /// Token exceeds the size limit.
    TooLarge,
    /// Token was well-formed and correctly signed but past its expiry.
    Expired,
    /// Malformed structure or signature mismatch.
    Invalid,
}

impl AuthFailure {
    /// Short label for structured log fields.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AuthFailure::Missing => "missing",
            AuthFailure::TooLarge => "too_large",
            AuthFailure::Expired => "expired",
            AuthFailure::Invalid => "invalid",
        }
    }
}

/// Claims deserialized during verification. Only `exp` is required; the
/// subject is accepted when present but nothing here depends on it.
#[derive(Debug, Deserialize)]
struct Claims {
    #[allow(dead_code)]
    exp: i64,
}

/// Verifies bearer tokens with the shared HS512 secret.
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    /// Create a validator for the given shared secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.expose_secret().as_bytes());

        let mut validation = Validation::new(Algorithm::HS512);
        validation.validate_exp = true;
        // Expiry is enforced exactly; the sweep provides the slack, not the
        // verifier.
        validation.leeway = 0;

        Self {
            decoding_key,
            validation,
        }
    }

    /// Verify signature and expiry. Returns `true` only for a correctly
    /// signed, well-formed, unexpired token; never raises.
    #[must_use]
    pub fn validate(&self, token: &str) -> bool {
        self.check(token).is_ok()
    }

    /// Like [`TokenValidator::validate`], but exposes the classified
    /// failure so callers can log it.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthFailure`] classification; no signature internals
    /// are carried in the error.
    pub fn check(&self, token: &str) -> Result<(), AuthFailure> {
        if token.is_empty() {
            return Err(AuthFailure::Missing);
        }
        if token.len() > MAX_TOKEN_SIZE_BYTES {
            warn!(
                target: "gateway.auth",
                token_size = token.len(),
                "Token rejected before verification: size exceeds maximum"
            );
            return Err(AuthFailure::TooLarge);
        }

        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(_) => Ok(()),
            Err(e)
                if matches!(
                    e.kind(),
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature
                ) =>
            {
                warn!(target: "gateway.auth", "Token is expired");
                Err(AuthFailure::Expired)
            }
            Err(e) => {
                // Generic log line; the kind distinguishes malformed input
                // from a signature mismatch without leaking either.
                warn!(target: "gateway.auth", kind = ?e.kind(), "Token is invalid");
                Err(AuthFailure::Invalid)
            }
        }
    }

    /// Best-effort extraction of the expiry claim (epoch milliseconds) for
    /// registry bookkeeping. Does not verify the signature and must never
    /// gate authorization.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] when the payload cannot be decoded or carries
    /// no numeric `exp` claim.
    pub fn decode_expiry_ms(&self, token: &str) -> Result<i64, TokenError> {
        extract_expiry_ms(token)
    }
}
