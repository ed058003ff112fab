//! Concurrent store of connection -> token expiry.
//!
//! The registry is the only state shared across connection callbacks and the
//! sweep task. It is a sharded concurrent map, so insert/remove/scan from
//! different connections never contend on a single global lock, and nothing
//! here performs I/O: eviction hands the expired connection ids back to the
//! caller, which disconnects them outside any map access.
//!
//! An entry's expiry is written once at insert and never mutated; the only
//! transitions are insert (connect), remove (disconnect), and atomic
//! removal by the sweep.

use crate::observability::metrics::{record_session_removed, record_session_tracked};
use crate::transport::ConnectionId;
use common::jwt::extract_expiry_ms;
use dashmap::DashMap;
use tracing::{debug, warn};

/// Concurrent registry of authenticated sessions keyed by connection.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    expiry_by_connection: DashMap<ConnectionId, i64>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a session for `connection` keyed by its token expiry.
    ///
    /// The expiry is extracted best-effort from the (already validated)
    /// token. When extraction fails the session is left untracked and the
    /// connection stays open; the sweep simply never sees it. This is a
    /// deliberate soft degradation, not an error.
    pub fn add_session(&self, connection: ConnectionId, token: &str) {
        match extract_expiry_ms(token) {
            Ok(expiry_ms) => {
                if self
                    .expiry_by_connection
                    .insert(connection, expiry_ms)
                    .is_none()
                {
                    record_session_tracked();
                }
                debug!(
                    target: "gateway.session",
                    connection = %connection,
                    expiry_ms,
                    "Tracking session"
                );
            }
            Err(e) => {
                warn!(
                    target: "gateway.session",
                    connection = %connection,
                    error = %e,
                    "Failed to track session; connection stays open untracked"
                );
            }
        }
    }

    /// Stop tracking `connection`. Idempotent; removing an absent id is a
    /// no-op.
    pub fn remove_session(&self, connection: ConnectionId) {
        if self.expiry_by_connection.remove(&connection).is_some() {
            record_session_removed();
            debug!(
                target: "gateway.session",
                connection = %connection,
                "Removed session from tracking"
            );
        }
    }

    /// Snapshot of connections whose expiry is at or before `now_ms`.
    ///
    /// Entries inserted while the scan runs may or may not be included;
    /// eviction itself goes through [`SessionRegistry::evict_if_expired`],
    /// which is what guarantees exactly-once semantics.
    #[must_use]
    pub fn expired_sessions(&self, now_ms: i64) -> Vec<ConnectionId> {
        self.expiry_by_connection
            .iter()
            .filter(|entry| *entry.value() <= now_ms)
            .map(|entry| *entry.key())
            .collect()
    }

    /// Atomically remove `connection` if its expiry is at or before
    /// `now_ms`. Returns `true` only for the single caller that performed
    /// the removal, so an entry can never be evicted twice even while
    /// other connections add and remove sessions concurrently.
    #[must_use]
    pub fn evict_if_expired(&self, connection: ConnectionId, now_ms: i64) -> bool {
        let removed = self
            .expiry_by_connection
            .remove_if(&connection, |_, expiry_ms| *expiry_ms <= now_ms)
            .is_some();
        if removed {
            record_session_removed();
        }
        removed
    }

    /// Whether `connection` currently has a tracked session.
    #[must_use]
    pub fn is_tracked(&self, connection: ConnectionId) -> bool {
        self.expiry_by_connection.contains_key(&connection)
    }

    /// The tracked expiry for `connection`, if any.
    #[must_use]
    pub fn expiry_ms(&self, connection: ConnectionId) -> Option<i64> {
        self.expiry_by_connection
            .get(&connection)
            .map(|entry| *entry.value())
    }

    /// Number of tracked sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.expiry_by_connection.len()
    }

    /// Whether no sessions are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expiry_by_connection.is_empty()
    }
}
