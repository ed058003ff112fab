//! Metric names and recording helpers.
//!
//! All metrics are registered through the `metrics` facade and rendered by
//! the Prometheus exporter mounted on the health listener.

/// Gauge: sessions currently tracked in the registry.
pub const SESSIONS_TRACKED: &str = "gateway_sessions_tracked";

/// Counter: sessions evicted by the expiry sweep.
pub const SESSIONS_EVICTED_TOTAL: &str = "gateway_sessions_evicted_total";

/// Counter: connections refused at connect time, labeled by reason.
pub const AUTH_FAILURES_TOTAL: &str = "gateway_auth_failures_total";

/// Counter: broadcast attempts that failed, labeled by namespace.
pub const BROADCAST_FAILURES_TOTAL: &str = "gateway_broadcast_failures_total";

/// A session entered the registry.
pub fn record_session_tracked() {
    metrics::gauge!(SESSIONS_TRACKED).increment(1.0);
}

/// A session left the registry (disconnect or eviction).
pub fn record_session_removed() {
    metrics::gauge!(SESSIONS_TRACKED).decrement(1.0);
}

/// The sweep evicted `count` expired sessions.
pub fn record_sessions_evicted(count: u64) {
    metrics::counter!(SESSIONS_EVICTED_TOTAL).increment(count);
}

/// A connection was refused at connect time.
pub fn record_auth_failure(reason: &'static str) {
    metrics::counter!(AUTH_FAILURES_TOTAL, "reason" => reason).increment(1);
}

/// A namespace broadcast failed.
pub fn record_broadcast_failure(namespace: &str) {
    metrics::counter!(BROADCAST_FAILURES_TOTAL, "namespace" => namespace.to_string()).increment(1);
}
