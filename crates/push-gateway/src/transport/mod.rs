//! Socket transport collaborator contract.
//!
//! The gateway core does not accept sockets or frame bytes itself; it is
//! written against the seam defined here. A transport must provide:
//!
//! - connection handles with stable identity and a disconnect primitive
//! - handshake data exposing HTTP headers and/or an auth-token structure
//! - per-namespace registration of connect/disconnect/named-event listeners
//! - a broadcast-to-namespace primitive that excludes the triggering
//!   connection
//! - an acknowledgment primitive for request/response-style events
//!
//! [`local::LocalTransport`] is the in-process implementation used by the
//! binary and the end-to-end tests.

pub mod local;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Stable identity of one client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Allocate a fresh connection identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Handshake data captured when a connection is opened.
///
/// Carries the HTTP headers of the upgrade request and, optionally, an
/// auth payload supplied by the client library. Either may hold the bearer
/// token; extraction order is the router's concern.
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    headers: HashMap<String, String>,
    auth: Option<Value>,
    remote_addr: Option<String>,
}

impl Handshake {
    /// Create handshake data from its parts.
    #[must_use]
    pub fn new(
        headers: HashMap<String, String>,
        auth: Option<Value>,
        remote_addr: Option<String>,
    ) -> Self {
        Self {
            headers,
            auth,
            remote_addr,
        }
    }

    /// Look up a header value, case-insensitively per HTTP semantics.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The auth payload supplied by the client library, if any.
    #[must_use]
    pub fn auth(&self) -> Option<&Value> {
        self.auth.as_ref()
    }

    /// Remote peer address, for logging only.
    #[must_use]
    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }
}

/// Acknowledgment primitive for request/response-style events.
///
/// Wraps the reply channel for one inbound event together with the client's
/// ack-requested flag. Dropping the request without replying is allowed.
#[derive(Debug)]
pub struct AckRequest {
    requested: bool,
    reply: Option<mpsc::UnboundedSender<String>>,
}

impl AckRequest {
    /// An ack request with no reply channel (fire-and-forget event).
    #[must_use]
    pub fn detached() -> Self {
        Self {
            requested: false,
            reply: None,
        }
    }

    /// Create an ack request with a reply channel.
    #[must_use]
    pub fn new(requested: bool, reply: mpsc::UnboundedSender<String>) -> Self {
        Self {
            requested,
            reply: Some(reply),
        }
    }

    /// Whether the client asked for an acknowledgment.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.requested
    }

    /// Whether a reply channel is attached at all.
    #[must_use]
    pub fn can_reply(&self) -> bool {
        self.reply.is_some()
    }

    /// Send an acknowledgment value back to the event's sender.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::AckChannelClosed` if there is no reply channel
    /// or the sender is gone.
    pub fn send(&self, message: String) -> Result<(), TransportError> {
        let reply = self.reply.as_ref().ok_or(TransportError::AckChannelClosed)?;
        reply
            .send(message)
            .map_err(|_| TransportError::AckChannelClosed)
    }
}

/// Transport-layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No handlers are bound under this namespace.
    #[error("Unknown namespace: {0}")]
    UnknownNamespace(String),

    /// The event name is not registered for this namespace.
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// The connection was refused during the connect phase.
    #[error("Connection refused")]
    ConnectionRefused,

    /// The connection is no longer open.
    #[error("Connection closed: {0}")]
    ConnectionClosed(ConnectionId),

    /// The transport is no longer accepting connections.
    #[error("Transport is shutting down")]
    Draining,

    /// The acknowledgment reply channel is gone.
    #[error("Acknowledgment channel closed")]
    AckChannelClosed,

    /// Broadcast delivery failed.
    #[error("Broadcast failed: {0}")]
    BroadcastFailed(String),
}

/// Per-namespace event listeners.
///
/// Handlers take the namespace identifier as an explicit parameter so one
/// handler instance serves every provisioned namespace; nothing is captured
/// per namespace.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// A client opened a connection under `namespace`.
    async fn on_connect(&self, namespace: &str, connection: ConnectionId, handshake: &Handshake);

    /// An established connection under `namespace` closed.
    async fn on_disconnect(&self, namespace: &str, connection: ConnectionId);

    /// A named event arrived from `connection` under `namespace`.
    async fn on_message(
        &self,
        namespace: &str,
        event: &str,
        connection: ConnectionId,
        payload: Option<Value>,
        ack: AckRequest,
    );
}

/// The transport collaborator the gateway core is written against.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Register connect/disconnect listeners and the named events to route
    /// for one namespace. Called once per namespace at boot.
    fn bind_namespace(&self, namespace: &str, events: &[&str], handler: Arc<dyn EventHandler>);

    /// Broadcast an event to every established connection in `namespace`,
    /// excluding `exclude` (the triggering connection) when given.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the namespace is unknown or delivery fails.
    async fn broadcast(
        &self,
        namespace: &str,
        event: &str,
        payload: &Value,
        exclude: Option<ConnectionId>,
    ) -> Result<(), TransportError>;

    /// Force-close a connection. Disconnecting an already-closed connection
    /// is a no-op; a connection still in its connect phase is closed without
    /// emitting a disconnect event.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the underlying close fails.
    async fn disconnect(&self, connection: ConnectionId) -> Result<(), TransportError>;
}
