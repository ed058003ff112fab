//! Per-namespace connect/disconnect/message routing.
//!
//! At boot the router binds listeners for every namespace the provider
//! yields, under a fixed path prefix. Connect-time authentication delegates
//! to [`TokenValidator`]; session bookkeeping delegates to
//! [`SessionRegistry`]; everything client-facing goes through the
//! [`Transport`] seam.
//!
//! One router serves every namespace: the listeners take the namespace
//! identifier as an explicit parameter, so nothing is captured per
//! namespace. The type is a cheap-clone handle over shared state so the
//! transport can hold it as its event handler.
//!
//! # Failure isolation
//!
//! Every failure in a listener is confined to the triggering connection or
//! request: auth failures force-disconnect exactly that connection,
//! broadcast failures turn into a negative acknowledgment for exactly that
//! request, and nothing propagates to other connections or the sweep task.

use crate::auth::{AuthFailure, TokenSource, TokenValidator};
use crate::observability::metrics::{record_auth_failure, record_broadcast_failure};
use crate::provider::{NamespaceList, NamespaceProvider};
use crate::session::SessionRegistry;
use crate::transport::{AckRequest, ConnectionId, EventHandler, Handshake, Transport};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Path prefix every provisioned namespace is mounted under.
pub const NAMESPACE_PREFIX: &str = "/socket-io/";

/// Generic passthrough message event.
pub const SELFCHECK_SEND_EVENT: &str = "selfcheckSend";

/// Self-check message event; also carries connection-status broadcasts.
pub const SELFCHECK_CONNECTION_EVENT: &str = "selfcheckConnection";

/// The named events routed for every namespace.
const ROUTED_EVENTS: [&str; 2] = [SELFCHECK_SEND_EVENT, SELFCHECK_CONNECTION_EVENT];

/// Join the fixed prefix with a namespace identifier.
#[must_use]
pub fn namespace_path(identifier: &str) -> String {
    format!("{NAMESPACE_PREFIX}{identifier}")
}

struct RouterCore {
    validator: TokenValidator,
    registry: Arc<SessionRegistry>,
    transport: Arc<dyn Transport>,
}

/// Routes per-namespace traffic between the transport, the validator, and
/// the session registry.
#[derive(Clone)]
pub struct NamespaceRouter {
    core: Arc<RouterCore>,
}

impl NamespaceRouter {
    /// Create a router over the given collaborators.
    #[must_use]
    pub fn new(
        validator: TokenValidator,
        registry: Arc<SessionRegistry>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            core: Arc::new(RouterCore {
                validator,
                registry,
                transport,
            }),
        }
    }

    /// Fetch the namespace list and bind listeners for each identifier.
    ///
    /// Returns the number of namespaces bound.
    pub async fn provision(&self, provider: &NamespaceProvider) -> usize {
        let list = provider.fetch().await;
        self.provision_namespaces(&list)
    }

    /// Bind listeners for each identifier in an already-retrieved list.
    ///
    /// An empty list binds nothing and logs a warning: the gateway is idle,
    /// not failed. The namespace set is fixed for the process lifetime once
    /// this returns.
    pub fn provision_namespaces(&self, list: &NamespaceList) -> usize {
        let identifiers = list.identifiers();
        if identifiers.is_empty() {
            warn!(
                target: "gateway.router",
                "No namespaces found. Listeners won't be initialized."
            );
            return 0;
        }

        for identifier in identifiers {
            let namespace = namespace_path(identifier);
            self.core.transport.bind_namespace(
                &namespace,
                &ROUTED_EVENTS,
                Arc::new(self.clone()) as Arc<dyn EventHandler>,
            );
            info!(
                target: "gateway.router",
                namespace = %namespace,
                fallback = list.is_fallback(),
                "Initialized listeners for namespace"
            );
        }

        identifiers.len()
    }

    /// Broadcast the connection-status event for `connection` to the rest
    /// of its namespace. Errors are logged and never propagated.
    async fn send_connection_status(
        &self,
        namespace: &str,
        connection: ConnectionId,
        connected: bool,
    ) {
        if let Err(e) = self
            .core
            .transport
            .broadcast(
                namespace,
                SELFCHECK_CONNECTION_EVENT,
                &json!(connected),
                Some(connection),
            )
            .await
        {
            record_broadcast_failure(namespace);
            error!(
                target: "gateway.router",
                namespace,
                connection = %connection,
                error = %e,
                "Error sending connection status"
            );
        }
    }

    /// Send an acknowledgment for a message event.
    ///
    /// TODO: confirm with the product owner whether acks should fire only
    /// when the client requests one. The guard below looks inverted but
    /// matches the deployed gateway; it must not be flipped silently.
    fn send_ack(&self, ack: &AckRequest, message: String) {
        if ack.can_reply() && !ack.is_requested() {
            if let Err(e) = ack.send(message) {
                error!(
                    target: "gateway.router",
                    error = %e,
                    "Failed to send acknowledgement"
                );
            }
        }
    }

    fn handle_invalid_payload(&self, namespace: &str, event: &str, ack: &AckRequest) {
        warn!(target: "gateway.router", namespace, event, "Invalid message received");
        self.send_ack(
            ack,
            format!("Error: Invalid {event} message received in namespace: {namespace}"),
        );
    }
}

#[async_trait]
impl EventHandler for NamespaceRouter {
    async fn on_connect(&self, namespace: &str, connection: ConnectionId, handshake: &Handshake) {
        let source = TokenSource::from_handshake(handshake);

        let refused = match source.token() {
            None => Some(AuthFailure::Missing),
            Some(token) => self.core.validator.check(token).err(),
        };

        if let Some(reason) = refused {
            warn!(
                target: "gateway.router",
                namespace,
                connection = %connection,
                remote_addr = handshake.remote_addr().unwrap_or("unknown"),
                reason = reason.label(),
                "Failed authentication for connection"
            );
            record_auth_failure(reason.label());
            if let Err(e) = self.core.transport.disconnect(connection).await {
                error!(
                    target: "gateway.router",
                    connection = %connection,
                    error = %e,
                    "Failed to disconnect unauthenticated connection"
                );
            }
            return;
        }

        // check() above rejected absent tokens, so this is always Some.
        if let Some(token) = source.token() {
            self.core.registry.add_session(connection, token);
        }

        info!(
            target: "gateway.router",
            namespace,
            connection = %connection,
            token_source = source.label(),
            "User connected with valid token"
        );
        self.send_connection_status(namespace, connection, true).await;
    }

    async fn on_disconnect(&self, namespace: &str, connection: ConnectionId) {
        self.core.registry.remove_session(connection);
        info!(
            target: "gateway.router",
            namespace,
            connection = %connection,
            "User disconnected"
        );
        self.send_connection_status(namespace, connection, false)
            .await;
    }

    async fn on_message(
        &self,
        namespace: &str,
        event: &str,
        connection: ConnectionId,
        payload: Option<Value>,
        ack: AckRequest,
    ) {
        let Some(payload) = payload else {
            self.handle_invalid_payload(namespace, event, &ack);
            return;
        };

        info!(
            target: "gateway.router",
            namespace,
            event,
            connection = %connection,
            "Message received"
        );

        match self
            .core
            .transport
            .broadcast(namespace, event, &payload, Some(connection))
            .await
        {
            Ok(()) => {
                self.send_ack(
                    &ack,
                    format!("Message sent successfully in namespace: {namespace}"),
                );
            }
            Err(e) => {
                record_broadcast_failure(namespace);
                error!(
                    target: "gateway.router",
                    namespace,
                    event,
                    connection = %connection,
                    error = %e,
                    "Error sending message"
                );
                self.send_ack(
                    &ack,
                    format!("Error: Failed to send message in namespace: {namespace}"),
                );
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_path_joins_prefix() {
        assert_eq!(namespace_path("serial"), "/socket-io/serial");
        assert_eq!(namespace_path("device-42"), "/socket-io/device-42");
    }

    #[test]
    fn test_routed_events() {
        assert_eq!(ROUTED_EVENTS, ["selfcheckSend", "selfcheckConnection"]);
    }
}
