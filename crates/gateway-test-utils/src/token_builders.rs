//! Builder patterns for test token construction
//!
//! Provides a fluent API for creating signed bearer tokens with chosen
//! claims, secrets, and algorithms.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;

/// Signing secret the test suites share.
pub const TEST_SECRET: &str = "gateway-test-signing-secret";

/// Builder for creating signed test tokens
///
/// # Example
/// ```rust
/// use gateway_test_utils::TestTokenBuilder;
///
/// let token = TestTokenBuilder::new()
///     .for_subject("device-7")
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestTokenBuilder {
    sub: String,
    exp: i64,
    iat: i64,
    secret: String,
    algorithm: Algorithm,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults: [`TEST_SECRET`], HS512,
    /// expiring one hour from now.
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: "test-device".to_string(),
            exp: now + 3600,
            iat: now,
            secret: TEST_SECRET.to_string(),
            algorithm: Algorithm::HS512,
        }
    }

    /// Set the subject claim
    #[must_use]
    pub fn for_subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set expiration in seconds from now (negative for an already-expired
    /// token)
    #[must_use]
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Utc::now().timestamp() + seconds;
        self
    }

    /// Set the absolute expiration timestamp (epoch seconds)
    #[must_use]
    pub fn expires_at(mut self, epoch_seconds: i64) -> Self {
        self.exp = epoch_seconds;
        self
    }

    /// Sign with a different secret (produces a signature-mismatch token
    /// for the gateway's validator)
    #[must_use]
    pub fn with_secret(mut self, secret: &str) -> Self {
        self.secret = secret.to_string();
        self
    }

    /// Sign with a different algorithm
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Build the signed compact token
    #[must_use]
    pub fn build(self) -> String {
        encode(
            &Header::new(self.algorithm),
            &json!({ "sub": self.sub, "exp": self.exp, "iat": self.iat }),
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .expect("token encoding should succeed")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A valid token for [`TEST_SECRET`], one hour of life left.
#[must_use]
pub fn valid_token() -> String {
    TestTokenBuilder::new().build()
}

/// A correctly signed token that expired ten minutes ago.
#[must_use]
pub fn expired_token() -> String {
    TestTokenBuilder::new().expires_in(-600).build()
}

/// A token signed with the wrong secret.
#[must_use]
pub fn wrong_secret_token() -> String {
    TestTokenBuilder::new().with_secret("not-the-gateway-secret").build()
}

/// Not a token at all.
#[must_use]
pub fn malformed_token() -> String {
    "definitely-not-a-jwt".to_string()
}
