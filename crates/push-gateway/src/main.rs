//! Push Gateway
//!
//! Long-lived push gateway service. Clients connect under provisioned
//! namespaces, authenticate with a signed bearer token, and exchange small
//! event payloads re-broadcast to their namespace.
//!
//! # Servers
//!
//! - HTTP server for health endpoints and Prometheus metrics
//!   (default: 0.0.0.0:8081)
//! - The client-facing socket transport lives behind the `Transport` seam;
//!   the in-process `LocalTransport` is wired here
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment (missing token secret is fatal)
//! 2. Initialize Prometheus metrics recorder
//! 3. Start health HTTP server (liveness, readiness, metrics)
//! 4. Fetch namespace list and bind per-namespace listeners
//! 5. Spawn the session sweeper task
//! 6. Wait for shutdown signal
//!
//! # Shutdown Flow
//!
//! Readiness is dropped first, then the transport stops accepting new
//! connections, and only then are the sweeper and HTTP server cancelled.

#![warn(clippy::pedantic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use push_gateway::auth::TokenValidator;
use push_gateway::config::Config;
use push_gateway::observability::{health_router, HealthState};
use push_gateway::provider::NamespaceProvider;
use push_gateway::router::NamespaceRouter;
use push_gateway::session::SessionRegistry;
use push_gateway::tasks::run_session_sweeper;
use push_gateway::transport::local::LocalTransport;
use push_gateway::transport::Transport;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "push_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Push Gateway");

    // Load configuration; a missing token secret aborts startup here.
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        anyhow::anyhow!(e)
    })?;

    info!(
        socket_host = %config.socket_host,
        socket_port = config.socket_port,
        health_bind_address = %config.health_bind_address,
        namespace_list_url = %config.namespace_list_url,
        sweep_interval_seconds = config.sweep_interval_seconds,
        "Configuration loaded successfully"
    );

    // Initialize Prometheus metrics recorder before any metrics are recorded
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus metrics recorder")?;

    // Initialize health state
    let health_state = Arc::new(HealthState::new());

    // Core collaborators
    let validator = TokenValidator::new(&config.token_secret);
    let registry = Arc::new(SessionRegistry::new());
    let transport = LocalTransport::new();
    let provider = NamespaceProvider::new(config.namespace_list_url.clone())
        .context("Failed to build namespace provider client")?;
    let router = NamespaceRouter::new(
        validator,
        Arc::clone(&registry),
        Arc::new(transport.clone()) as Arc<dyn Transport>,
    );

    let shutdown_token = CancellationToken::new();

    // Health + metrics HTTP server. Bind before spawning to fail fast.
    let health_addr: SocketAddr = config
        .health_bind_address
        .parse()
        .with_context(|| format!("Invalid health bind address {}", config.health_bind_address))?;

    let metrics_router = Router::new().route(
        "/metrics",
        axum::routing::get(move || {
            let handle = prometheus_handle.clone();
            async move { handle.render() }
        }),
    );
    let app = health_router(Arc::clone(&health_state))
        .merge(metrics_router)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(health_addr)
        .await
        .with_context(|| format!("Failed to bind health server to {health_addr}"))?;
    info!(addr = %health_addr, "Health server bound successfully");

    let health_shutdown_token = shutdown_token.child_token();
    tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            health_shutdown_token.cancelled().await;
            info!("Health server shutting down");
        });
        if let Err(e) = server.await {
            error!(error = %e, "Health server failed");
        }
    });
    info!(addr = %health_addr, "Health server started");

    // Provision namespaces. An empty list leaves the gateway idle but healthy.
    let bound = router.provision(&provider).await;
    if bound == 0 {
        warn!("Gateway is idle: no namespaces provisioned");
    } else {
        info!(namespaces = bound, "Namespace listeners provisioned");
    }

    // TODO: serve the transport on (socket_host, socket_port) once the
    // network framing front-end lands; only in-process clients are wired
    // up today.

    // Spawn the session sweeper on its own task
    let sweeper_token = shutdown_token.child_token();
    let sweeper_handle = tokio::spawn(run_session_sweeper(
        Arc::clone(&registry),
        Arc::new(transport.clone()) as Arc<dyn Transport>,
        Duration::from_secs(config.sweep_interval_seconds),
        sweeper_token,
    ));
    info!("Session sweeper started");

    health_state.set_ready();
    info!("Push Gateway running - press Ctrl+C to shutdown");

    shutdown_signal().await;

    info!("Shutdown signal received, initiating graceful shutdown...");

    // Mark as not ready immediately so orchestrators stop sending traffic,
    // stop accepting new connections, and only then cancel background tasks.
    health_state.set_not_ready();
    transport.begin_shutdown();
    shutdown_token.cancel();

    if let Err(e) = sweeper_handle.await {
        warn!(error = %e, "Session sweeper did not exit cleanly");
    }

    info!("Push Gateway shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. This is acceptable because
/// without signal handlers, we cannot gracefully shut down the service.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
