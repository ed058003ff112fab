//! Bearer-token claim extraction shared across push-gateway crates.
//!
//! This module provides the pieces of token handling that do NOT involve
//! signature verification:
//! - Size limits for DoS prevention
//! - Best-effort extraction of the `exp` claim from a compact JWS
//!
//! Signature verification lives with the gateway's `TokenValidator`; the
//! extraction here is used purely for session-expiry bookkeeping and must
//! never be treated as proof that a token is authentic.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Error messages are generic; details are logged at debug level only

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use thiserror::Error;

/// Maximum allowed token size in bytes (8KB).
///
/// Typical tokens are 200-500 bytes. Anything larger than this is rejected
/// before base64 decoding or JSON parsing to bound the work an unauthenticated
/// peer can make the gateway do.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Errors that can occur while extracting claims from a token.
///
/// Note: Display messages are intentionally generic to prevent information
/// leakage. Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Token size exceeds maximum allowed.
    #[error("The bearer token is invalid")]
    TokenTooLarge,

    /// Token format is invalid (not a valid compact JWS structure).
    #[error("The bearer token is invalid")]
    MalformedToken,

    /// Token payload carries no usable `exp` claim.
    #[error("The bearer token is invalid")]
    MissingExpiry,
}

/// Extract the `exp` claim from a token's payload, in epoch milliseconds.
///
/// The compact JWS format is `header.payload.signature`; this decodes the
/// payload segment only and reads the numeric `exp` claim (epoch seconds on
/// the wire, scaled to milliseconds for registry bookkeeping).
///
/// # Security
///
/// - Token size is checked BEFORE any parsing
/// - The signature is NOT verified; callers must not gate authorization on
///   this function succeeding
///
/// # Errors
///
/// Returns `TokenError` variants:
/// - `TokenTooLarge` - token exceeds [`MAX_TOKEN_SIZE_BYTES`]
/// - `MalformedToken` - wrong structure, bad base64, or invalid JSON
/// - `MissingExpiry` - payload has no numeric `exp` claim
pub fn extract_expiry_ms(token: &str) -> Result<i64, TokenError> {
    if token.len() > MAX_TOKEN_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_TOKEN_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(TokenError::TokenTooLarge);
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid compact JWS format"
        );
        return Err(TokenError::MalformedToken);
    }

    let payload_part = parts.get(1).ok_or(TokenError::MalformedToken)?;
    let payload_bytes = URL_SAFE_NO_PAD.decode(payload_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode token payload base64");
        TokenError::MalformedToken
    })?;

    let payload: serde_json::Value = serde_json::from_slice(&payload_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse token payload JSON");
        TokenError::MalformedToken
    })?;

    // `exp` is epoch seconds per RFC 7519; sessions are tracked in epoch ms.
    let exp_secs = payload
        .get("exp")
        .and_then(serde_json::Value::as_i64)
        .ok_or(TokenError::MissingExpiry)?;

    Ok(exp_secs * 1000)
}
