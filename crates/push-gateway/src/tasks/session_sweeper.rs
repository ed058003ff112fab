//! Session expiry sweeper background task.
//!
//! Periodically scans the session registry and disconnects connections whose
//! token expiry has passed. The task runs on its own execution context,
//! independent of connection handling; a single loop drives the sweep, so a
//! run never overlaps its predecessor.
//!
//! # Graceful Shutdown
//!
//! The task supports graceful shutdown via a cancellation token. When the
//! token is cancelled, the task completes its current iteration and exits
//! cleanly. It is cancelled after the transport stops accepting new
//! connections.

use crate::observability::metrics::record_sessions_evicted;
use crate::session::SessionRegistry;
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

/// Perform one sweep of the registry at the given instant.
///
/// Expired entries are removed atomically, then their connections are
/// disconnected one by one with no registry access held across the calls. A
/// disconnect failure is logged and does not abort the remaining scan.
/// Entries added while the scan runs are picked up by a later sweep at the
/// earliest.
///
/// Returns the number of evicted sessions.
pub async fn run_sweep_once(
    registry: &SessionRegistry,
    transport: &dyn Transport,
    now_ms: i64,
) -> usize {
    let mut evicted = 0;

    for connection in registry.expired_sessions(now_ms) {
        // The atomic removal decides who disconnects; a concurrent
        // disconnect handler racing on the same entry makes this a no-op.
        if !registry.evict_if_expired(connection, now_ms) {
            continue;
        }
        evicted += 1;

        if let Err(e) = transport.disconnect(connection).await {
            error!(
                target: "gateway.task.session_sweeper",
                connection = %connection,
                error = %e,
                "Failed to disconnect expired session"
            );
        }
    }

    if evicted > 0 {
        record_sessions_evicted(evicted as u64);
        info!(
            target: "gateway.task.session_sweeper",
            evicted,
            now_ms,
            "Evicted expired sessions"
        );
    }

    evicted
}

/// Start the session sweeper background task.
///
/// Sweeps on a fixed interval until the cancellation token is triggered.
/// Missed ticks are skipped rather than bursted, so at most one sweep is
/// ever in flight.
#[instrument(skip_all, name = "gateway.task.session_sweeper")]
pub async fn run_session_sweeper(
    registry: Arc<SessionRegistry>,
    transport: Arc<dyn Transport>,
    sweep_interval: Duration,
    cancel_token: CancellationToken,
) {
    info!(
        target: "gateway.task.session_sweeper",
        interval_secs = sweep_interval.as_secs(),
        "Starting session sweeper task"
    );

    let mut ticker = tokio::time::interval(sweep_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick of a tokio interval fires immediately; consume it so
    // the first sweep happens one full interval after startup.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now_ms = chrono::Utc::now().timestamp_millis();
                run_sweep_once(&registry, transport.as_ref(), now_ms).await;
            }
            () = cancel_token.cancelled() => {
                info!(
                    target: "gateway.task.session_sweeper",
                    "Session sweeper received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(target: "gateway.task.session_sweeper", "Session sweeper stopped");
}
