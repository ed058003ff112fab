//! Handshake builders and acknowledgment recorders.

use push_gateway::transport::{AckRequest, Handshake};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Builder for handshake data in its various token-carrying shapes.
///
/// # Example
/// ```rust
/// use gateway_test_utils::HandshakeBuilder;
///
/// let handshake = HandshakeBuilder::new()
///     .with_auth_map("some-token")
///     .with_remote_addr("203.0.113.9:52123")
///     .build();
/// ```
#[derive(Default)]
pub struct HandshakeBuilder {
    headers: HashMap<String, String>,
    auth: Option<Value>,
    remote_addr: Option<String>,
}

impl HandshakeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an HTTP header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Put the token in the `Authorization` header.
    #[must_use]
    pub fn with_auth_header(self, token: &str) -> Self {
        self.with_header("Authorization", token)
    }

    /// Put the token in an object-shaped auth payload.
    #[must_use]
    pub fn with_auth_map(mut self, token: &str) -> Self {
        self.auth = Some(json!({ "Authorization": token }));
        self
    }

    /// Use a raw string auth payload.
    #[must_use]
    pub fn with_raw_auth(mut self, token: &str) -> Self {
        self.auth = Some(json!(token));
        self
    }

    /// Use an arbitrary auth payload value.
    #[must_use]
    pub fn with_auth_value(mut self, value: Value) -> Self {
        self.auth = Some(value);
        self
    }

    /// Attach a remote peer address.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: &str) -> Self {
        self.remote_addr = Some(addr.to_string());
        self
    }

    #[must_use]
    pub fn build(self) -> Handshake {
        Handshake::new(self.headers, self.auth, self.remote_addr)
    }
}

/// An [`AckRequest`] wired to a receiver the test can drain.
///
/// Note the gateway's ack helper only replies when the request did NOT set
/// the ack-requested flag; pass `requested = false` to observe replies.
#[must_use]
pub fn recording_ack(requested: bool) -> (AckRequest, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (AckRequest::new(requested, tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_builder_shapes() {
        let header = HandshakeBuilder::new().with_auth_header("t").build();
        assert_eq!(header.header("Authorization"), Some("t"));

        let map = HandshakeBuilder::new().with_auth_map("t").build();
        assert_eq!(map.auth(), Some(&json!({ "Authorization": "t" })));

        let raw = HandshakeBuilder::new().with_raw_auth("t").build();
        assert_eq!(raw.auth(), Some(&json!("t")));
    }

    #[test]
    fn test_recording_ack_round_trip() {
        let (ack, mut rx) = recording_ack(false);
        ack.send("ok".to_string()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "ok");
    }
}
