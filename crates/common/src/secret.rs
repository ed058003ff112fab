//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate with push-gateway
//! specific guidance. Use these types for all sensitive values like the token
//! signing secret, API keys, and upstream credentials.
//!
//! # Compile-Time Safety
//!
//! `SecretBox<T>` and `SecretString` implement `Debug` with redaction, so any
//! code that derives `Debug` on a struct containing secrets automatically gets
//! safe logging behavior. Accessing the actual value requires an explicit
//! `expose_secret()` call.
//!
//! # Memory Safety
//!
//! Secrets are automatically zeroized when dropped, preventing sensitive
//! data from lingering in memory after use.
//!
//! # Example
//!
//! ```rust
//! use common::secret::SecretString;
//! use secrecy::ExposeSecret;
//!
//! #[derive(Debug)]
//! struct GatewayCredentials {
//!     bind_address: String,
//!     token_secret: SecretString,  // Safe: Debug shows "[REDACTED]"
//! }
//!
//! let creds = GatewayCredentials {
//!     bind_address: "0.0.0.0:9092".to_string(),
//!     token_secret: SecretString::from("hunter2"),
//! };
//!
//! // This is safe - the secret is redacted
//! println!("{:?}", creds);
//!
//! // To access the actual value, you must explicitly call expose_secret()
//! let secret: &str = creds.token_secret.expose_secret();
//! ```
//!
//! # Usage Guidelines
//!
//! Use `SecretString` for:
//! - The bearer-token signing secret
//! - Upstream service credentials
//! - Anything that must never appear in logs or `Debug` output

// Re-export the main types from secrecy
pub use secrecy::{ExposeSecret, SecretBox, SecretString};
