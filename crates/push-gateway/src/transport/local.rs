//! In-process transport implementation.
//!
//! `LocalTransport` is a channel-backed hub that satisfies the [`Transport`]
//! contract for clients living in the same process: each established
//! connection owns an unbounded outbox that broadcasts are fanned out to.
//! The binary wires the router against it, and the end-to-end tests drive
//! the full connect/message/disconnect flow through it.
//!
//! The type is a cheap-clone handle over shared state, so the binary, the
//! router, and every client hold the same hub.
//!
//! # Connect phase
//!
//! A peer is registered before its connect listener runs so namespace
//! broadcasts reach it immediately, but it only becomes *established* once
//! the listener returns with the peer still present. A connection the
//! listener force-closed is reported as refused to the caller and emits no
//! disconnect event.

use super::{AckRequest, ConnectionId, EventHandler, Handshake, Transport, TransportError};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// One event delivered to a client by a namespace broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastEvent {
    /// Event name.
    pub event: String,
    /// Payload, verbatim as broadcast.
    pub payload: Value,
}

struct NamespaceBinding {
    events: Vec<String>,
    handler: Arc<dyn EventHandler>,
}

struct Peer {
    namespace: String,
    established: bool,
    outbox: mpsc::UnboundedSender<BroadcastEvent>,
}

#[derive(Default)]
struct Hub {
    namespaces: DashMap<String, NamespaceBinding>,
    peers: DashMap<ConnectionId, Peer>,
    draining: AtomicBool,
}

/// Channel-backed in-process transport hub handle.
#[derive(Clone, Default)]
pub struct LocalTransport {
    hub: Arc<Hub>,
}

impl LocalTransport {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop accepting new connections. Established connections and their
    /// event flow are unaffected; this is the first step of shutdown.
    pub fn begin_shutdown(&self) {
        self.hub.draining.store(true, Ordering::SeqCst);
        info!(target: "gateway.transport", "Transport draining, refusing new connections");
    }

    /// Open a connection under `namespace` and run the connect listener.
    ///
    /// # Errors
    ///
    /// - `Draining` if [`LocalTransport::begin_shutdown`] was called
    /// - `UnknownNamespace` if nothing is bound under `namespace`
    /// - `ConnectionRefused` if the connect listener force-closed the peer
    pub async fn connect(
        &self,
        namespace: &str,
        handshake: Handshake,
    ) -> Result<LocalClient, TransportError> {
        if self.hub.draining.load(Ordering::SeqCst) {
            return Err(TransportError::Draining);
        }

        let handler = self
            .hub
            .namespaces
            .get(namespace)
            .map(|binding| Arc::clone(&binding.handler))
            .ok_or_else(|| TransportError::UnknownNamespace(namespace.to_string()))?;

        let id = ConnectionId::new();
        let (outbox, inbox) = mpsc::unbounded_channel();
        self.hub.peers.insert(
            id,
            Peer {
                namespace: namespace.to_string(),
                established: false,
                outbox,
            },
        );

        handler.on_connect(namespace, id, &handshake).await;

        // The connect listener disconnects peers it rejects; only a peer
        // that survived the listener becomes established.
        match self.hub.peers.get_mut(&id) {
            Some(mut peer) => {
                peer.established = true;
                drop(peer);
                debug!(target: "gateway.transport", connection = %id, namespace, "Connection established");
                Ok(LocalClient {
                    id,
                    namespace: namespace.to_string(),
                    transport: self.clone(),
                    inbox,
                })
            }
            None => Err(TransportError::ConnectionRefused),
        }
    }

    fn routed_handler(
        &self,
        namespace: &str,
        event: &str,
    ) -> Result<Arc<dyn EventHandler>, TransportError> {
        let binding = self
            .hub
            .namespaces
            .get(namespace)
            .ok_or_else(|| TransportError::UnknownNamespace(namespace.to_string()))?;
        if !binding.events.iter().any(|e| e == event) {
            return Err(TransportError::UnknownEvent(event.to_string()));
        }
        Ok(Arc::clone(&binding.handler))
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn bind_namespace(&self, namespace: &str, events: &[&str], handler: Arc<dyn EventHandler>) {
        self.hub.namespaces.insert(
            namespace.to_string(),
            NamespaceBinding {
                events: events.iter().map(ToString::to_string).collect(),
                handler,
            },
        );
        debug!(target: "gateway.transport", namespace, "Namespace bound");
    }

    async fn broadcast(
        &self,
        namespace: &str,
        event: &str,
        payload: &Value,
        exclude: Option<ConnectionId>,
    ) -> Result<(), TransportError> {
        if !self.hub.namespaces.contains_key(namespace) {
            return Err(TransportError::UnknownNamespace(namespace.to_string()));
        }

        let recipients: Vec<mpsc::UnboundedSender<BroadcastEvent>> = self
            .hub
            .peers
            .iter()
            .filter(|entry| {
                entry.value().namespace == namespace
                    && entry.value().established
                    && Some(*entry.key()) != exclude
            })
            .map(|entry| entry.value().outbox.clone())
            .collect();

        for outbox in recipients {
            // A send failure means the receiving client is already gone;
            // its peer entry is cleaned up on disconnect.
            let _ = outbox.send(BroadcastEvent {
                event: event.to_string(),
                payload: payload.clone(),
            });
        }

        Ok(())
    }

    async fn disconnect(&self, connection: ConnectionId) -> Result<(), TransportError> {
        let Some((id, peer)) = self.hub.peers.remove(&connection) else {
            // Already closed; disconnect is idempotent.
            return Ok(());
        };

        if peer.established {
            let handler = self
                .hub
                .namespaces
                .get(&peer.namespace)
                .map(|binding| Arc::clone(&binding.handler));
            if let Some(handler) = handler {
                handler.on_disconnect(&peer.namespace, id).await;
            }
        }

        debug!(target: "gateway.transport", connection = %id, namespace = %peer.namespace, "Connection closed");
        Ok(())
    }
}

/// Client half of an in-process connection.
pub struct LocalClient {
    id: ConnectionId,
    namespace: String,
    transport: LocalTransport,
    inbox: mpsc::UnboundedReceiver<BroadcastEvent>,
}

impl LocalClient {
    /// This connection's identity.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The namespace this client connected under.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Send a named event to the gateway, optionally requesting an ack.
    ///
    /// Returns the acknowledgment value the handler sent, if any.
    ///
    /// # Errors
    ///
    /// - `ConnectionClosed` if this connection was disconnected
    /// - `UnknownEvent` if the event is not routed for this namespace
    pub async fn emit(
        &self,
        event: &str,
        payload: Option<Value>,
        want_ack: bool,
    ) -> Result<Option<String>, TransportError> {
        if !self.transport.hub.peers.contains_key(&self.id) {
            return Err(TransportError::ConnectionClosed(self.id));
        }
        let handler = self.transport.routed_handler(&self.namespace, event)?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let ack = AckRequest::new(want_ack, tx);
        handler
            .on_message(&self.namespace, event, self.id, payload, ack)
            .await;

        Ok(rx.try_recv().ok())
    }

    /// Receive the next broadcast delivered to this connection.
    /// Returns `None` once the connection is closed and drained.
    pub async fn recv(&mut self) -> Option<BroadcastEvent> {
        self.inbox.recv().await
    }

    /// Non-blocking receive, for assertions on "nothing was delivered".
    pub fn try_recv(&mut self) -> Option<BroadcastEvent> {
        self.inbox.try_recv().ok()
    }

    /// Close this connection, running the disconnect listener.
    ///
    /// # Errors
    ///
    /// Propagates transport failures from the disconnect primitive.
    pub async fn close(self) -> Result<(), TransportError> {
        self.transport.disconnect(self.id).await
    }
}
