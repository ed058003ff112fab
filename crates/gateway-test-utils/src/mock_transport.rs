//! Recording mock for the [`Transport`] seam.
//!
//! Records namespace bindings, broadcasts, and disconnects so tests can
//! assert on the gateway's outward behavior. Broadcast and disconnect
//! failures can be injected to exercise the transport-failure paths.

use async_trait::async_trait;
use push_gateway::transport::{ConnectionId, EventHandler, Transport, TransportError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One recorded broadcast call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastRecord {
    pub namespace: String,
    pub event: String,
    pub payload: Value,
    pub exclude: Option<ConnectionId>,
}

/// One recorded namespace binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingRecord {
    pub namespace: String,
    pub events: Vec<String>,
}

/// Recording [`Transport`] double with failure injection.
#[derive(Default)]
pub struct MockTransport {
    bindings: Mutex<Vec<BindingRecord>>,
    handlers: Mutex<HashMap<String, Arc<dyn EventHandler>>>,
    broadcasts: Mutex<Vec<BroadcastRecord>>,
    disconnects: Mutex<Vec<ConnectionId>>,
    fail_broadcasts: AtomicBool,
    fail_disconnects: AtomicBool,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent broadcast fail.
    pub fn set_fail_broadcasts(&self, fail: bool) {
        self.fail_broadcasts.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent disconnect fail (after recording it).
    pub fn set_fail_disconnects(&self, fail: bool) {
        self.fail_disconnects.store(fail, Ordering::SeqCst);
    }

    /// Namespaces bound so far, in binding order.
    #[must_use]
    pub fn bound_namespaces(&self) -> Vec<String> {
        self.bindings
            .lock()
            .expect("bindings lock")
            .iter()
            .map(|b| b.namespace.clone())
            .collect()
    }

    /// All recorded bindings.
    #[must_use]
    pub fn bindings(&self) -> Vec<BindingRecord> {
        self.bindings.lock().expect("bindings lock").clone()
    }

    /// The handler bound under `namespace`, if any.
    #[must_use]
    pub fn handler_for(&self, namespace: &str) -> Option<Arc<dyn EventHandler>> {
        self.handlers
            .lock()
            .expect("handlers lock")
            .get(namespace)
            .cloned()
    }

    /// All recorded broadcasts.
    #[must_use]
    pub fn broadcasts(&self) -> Vec<BroadcastRecord> {
        self.broadcasts.lock().expect("broadcasts lock").clone()
    }

    /// All recorded disconnects, including injected failures.
    #[must_use]
    pub fn disconnects(&self) -> Vec<ConnectionId> {
        self.disconnects.lock().expect("disconnects lock").clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn bind_namespace(&self, namespace: &str, events: &[&str], handler: Arc<dyn EventHandler>) {
        self.bindings.lock().expect("bindings lock").push(BindingRecord {
            namespace: namespace.to_string(),
            events: events.iter().map(ToString::to_string).collect(),
        });
        self.handlers
            .lock()
            .expect("handlers lock")
            .insert(namespace.to_string(), handler);
    }

    async fn broadcast(
        &self,
        namespace: &str,
        event: &str,
        payload: &Value,
        exclude: Option<ConnectionId>,
    ) -> Result<(), TransportError> {
        if self.fail_broadcasts.load(Ordering::SeqCst) {
            return Err(TransportError::BroadcastFailed(
                "injected broadcast failure".to_string(),
            ));
        }
        self.broadcasts.lock().expect("broadcasts lock").push(BroadcastRecord {
            namespace: namespace.to_string(),
            event: event.to_string(),
            payload: payload.clone(),
            exclude,
        });
        Ok(())
    }

    async fn disconnect(&self, connection: ConnectionId) -> Result<(), TransportError> {
        self.disconnects
            .lock()
            .expect("disconnects lock")
            .push(connection);
        if self.fail_disconnects.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed(connection));
        }
        Ok(())
    }
}
