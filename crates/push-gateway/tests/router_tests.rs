//! Namespace router behavior tests.
//!
//! Drives the router through the `EventHandler` seam with a recording mock
//! transport, covering provisioning, connect-time auth, session
//! bookkeeping, message routing, and acknowledgment behavior.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use common::secret::SecretString;
use gateway_test_utils::{
    expired_token, malformed_token, recording_ack, valid_token, wrong_secret_token,
    HandshakeBuilder, MockTransport, TestTokenBuilder, TEST_SECRET,
};
use push_gateway::auth::TokenValidator;
use push_gateway::provider::{NamespaceList, NamespaceProvider};
use push_gateway::router::{NamespaceRouter, SELFCHECK_CONNECTION_EVENT, SELFCHECK_SEND_EVENT};
use push_gateway::session::SessionRegistry;
use push_gateway::tasks::run_sweep_once;
use push_gateway::transport::{ConnectionId, EventHandler, Transport};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const NS: &str = "/socket-io/serial";

fn setup() -> (NamespaceRouter, Arc<SessionRegistry>, Arc<MockTransport>) {
    let validator = TokenValidator::new(&SecretString::from(TEST_SECRET));
    let registry = Arc::new(SessionRegistry::new());
    let transport = Arc::new(MockTransport::new());
    let router = NamespaceRouter::new(
        validator,
        Arc::clone(&registry),
        Arc::clone(&transport) as Arc<dyn Transport>,
    );
    (router, registry, transport)
}

// ============================================================================
// Provisioning
// ============================================================================

#[tokio::test]
async fn provision_binds_listeners_per_namespace_under_prefix() {
    let (router, _registry, transport) = setup();

    let bound = router.provision_namespaces(&NamespaceList::Live(vec![
        "a".to_string(),
        "b".to_string(),
    ]));

    assert_eq!(bound, 2);
    assert_eq!(
        transport.bound_namespaces(),
        vec!["/socket-io/a", "/socket-io/b"]
    );
    for binding in transport.bindings() {
        assert_eq!(
            binding.events,
            vec![SELFCHECK_SEND_EVENT, SELFCHECK_CONNECTION_EVENT]
        );
    }
}

#[tokio::test]
async fn provision_empty_list_binds_nothing() {
    let (router, _registry, transport) = setup();

    let bound = router.provision_namespaces(&NamespaceList::Live(vec![]));

    assert_eq!(bound, 0);
    assert!(transport.bound_namespaces().is_empty());
}

#[tokio::test]
async fn provision_uses_fallback_when_provider_is_down() {
    let (router, _registry, transport) = setup();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let provider = NamespaceProvider::new(format!("{}/api/licences", server.uri())).unwrap();
    let bound = router.provision(&provider).await;

    assert_eq!(bound, 3);
    assert_eq!(
        transport.bound_namespaces(),
        vec![
            "/socket-io/serial",
            "/socket-io/serial1",
            "/socket-io/serial2"
        ]
    );
}

// ============================================================================
// Connect
// ============================================================================

#[tokio::test]
async fn connect_with_valid_token_tracks_session_and_broadcasts_status() {
    let (router, registry, transport) = setup();
    let conn = ConnectionId::new();
    let handshake = HandshakeBuilder::new().with_auth_header(&valid_token()).build();

    router.on_connect(NS, conn, &handshake).await;

    assert!(registry.is_tracked(conn));
    assert!(transport.disconnects().is_empty());

    let broadcasts = transport.broadcasts();
    assert_eq!(broadcasts.len(), 1);
    let status = broadcasts.first().unwrap();
    assert_eq!(status.namespace, NS);
    assert_eq!(status.event, SELFCHECK_CONNECTION_EVENT);
    assert_eq!(status.payload, json!(true));
    assert_eq!(status.exclude, Some(conn));
}

#[tokio::test]
async fn connect_records_expiry_from_token() {
    let (router, registry, _transport) = setup();
    let conn = ConnectionId::new();
    let exp = chrono::Utc::now().timestamp() + 60;
    let token = TestTokenBuilder::new().expires_at(exp).build();
    let handshake = HandshakeBuilder::new().with_auth_header(&token).build();

    router.on_connect(NS, conn, &handshake).await;

    assert_eq!(registry.expiry_ms(conn), Some(exp * 1000));
}

#[tokio::test]
async fn connect_accepts_token_from_auth_map_payload() {
    let (router, registry, _transport) = setup();
    let conn = ConnectionId::new();
    let handshake = HandshakeBuilder::new().with_auth_map(&valid_token()).build();

    router.on_connect(NS, conn, &handshake).await;

    assert!(registry.is_tracked(conn));
}

#[tokio::test]
async fn connect_accepts_token_from_raw_auth_payload() {
    let (router, registry, _transport) = setup();
    let conn = ConnectionId::new();
    let handshake = HandshakeBuilder::new().with_raw_auth(&valid_token()).build();

    router.on_connect(NS, conn, &handshake).await;

    assert!(registry.is_tracked(conn));
}

#[tokio::test]
async fn connect_without_token_disconnects_without_broadcast() {
    let (router, registry, transport) = setup();
    let conn = ConnectionId::new();
    let handshake = HandshakeBuilder::new().build();

    router.on_connect(NS, conn, &handshake).await;

    assert_eq!(transport.disconnects(), vec![conn]);
    assert!(!registry.is_tracked(conn));
    assert!(transport.broadcasts().is_empty());
}

#[tokio::test]
async fn connect_with_bad_tokens_disconnects_exactly_once() {
    for token in [expired_token(), wrong_secret_token(), malformed_token()] {
        let (router, registry, transport) = setup();
        let conn = ConnectionId::new();
        let handshake = HandshakeBuilder::new().with_auth_header(&token).build();

        router.on_connect(NS, conn, &handshake).await;

        assert_eq!(transport.disconnects(), vec![conn], "token: {token}");
        assert!(!registry.is_tracked(conn));
        assert!(transport.broadcasts().is_empty());
    }
}

#[tokio::test]
async fn connect_auth_failure_survives_disconnect_failure() {
    let (router, registry, transport) = setup();
    transport.set_fail_disconnects(true);
    let conn = ConnectionId::new();
    let handshake = HandshakeBuilder::new().build();

    router.on_connect(NS, conn, &handshake).await;

    // The failure is logged and isolated; still no session, no broadcast.
    assert!(!registry.is_tracked(conn));
    assert!(transport.broadcasts().is_empty());
}

// ============================================================================
// Disconnect
// ============================================================================

#[tokio::test]
async fn disconnect_removes_session_and_broadcasts_status() {
    let (router, registry, transport) = setup();
    let conn = ConnectionId::new();
    let handshake = HandshakeBuilder::new().with_auth_header(&valid_token()).build();
    router.on_connect(NS, conn, &handshake).await;

    router.on_disconnect(NS, conn).await;

    assert!(!registry.is_tracked(conn));
    let broadcasts = transport.broadcasts();
    assert_eq!(broadcasts.len(), 2);
    let status = broadcasts.last().unwrap();
    assert_eq!(status.event, SELFCHECK_CONNECTION_EVENT);
    assert_eq!(status.payload, json!(false));
    assert_eq!(status.exclude, Some(conn));
}

#[tokio::test]
async fn disconnect_of_untracked_connection_is_harmless() {
    let (router, registry, transport) = setup();
    let conn = ConnectionId::new();

    router.on_disconnect(NS, conn).await;

    assert!(registry.is_empty());
    assert_eq!(transport.broadcasts().len(), 1);
}

// ============================================================================
// Messages
// ============================================================================

#[tokio::test]
async fn message_rebroadcasts_payload_verbatim_with_positive_ack() {
    let (router, _registry, transport) = setup();
    let conn = ConnectionId::new();
    let payload = json!({ "reading": 42, "unit": "C" });
    let (ack, mut ack_rx) = recording_ack(false);

    router
        .on_message(NS, SELFCHECK_SEND_EVENT, conn, Some(payload.clone()), ack)
        .await;

    let broadcasts = transport.broadcasts();
    assert_eq!(broadcasts.len(), 1);
    let sent = broadcasts.first().unwrap();
    assert_eq!(sent.namespace, NS);
    assert_eq!(sent.event, SELFCHECK_SEND_EVENT);
    assert_eq!(sent.payload, payload);
    assert_eq!(sent.exclude, Some(conn));

    let reply = ack_rx.try_recv().unwrap();
    assert_eq!(reply, format!("Message sent successfully in namespace: {NS}"));
}

#[tokio::test]
async fn selfcheck_connection_event_is_routed_too() {
    let (router, _registry, transport) = setup();
    let conn = ConnectionId::new();
    let (ack, mut ack_rx) = recording_ack(false);

    router
        .on_message(NS, SELFCHECK_CONNECTION_EVENT, conn, Some(json!(true)), ack)
        .await;

    assert_eq!(transport.broadcasts().len(), 1);
    assert!(ack_rx.try_recv().unwrap().contains("successfully"));
}

#[tokio::test]
async fn null_payload_gets_negative_ack_and_no_broadcast() {
    let (router, _registry, transport) = setup();
    let conn = ConnectionId::new();
    let (ack, mut ack_rx) = recording_ack(false);

    router
        .on_message(NS, SELFCHECK_SEND_EVENT, conn, None, ack)
        .await;

    assert!(transport.broadcasts().is_empty());
    let reply = ack_rx.try_recv().unwrap();
    assert!(reply.starts_with("Error:"));
    assert!(reply.contains(NS), "negative ack must name the namespace");
    assert!(
        reply.contains(SELFCHECK_SEND_EVENT),
        "negative ack must name the event"
    );
}

#[tokio::test]
async fn broadcast_failure_becomes_negative_ack() {
    let (router, _registry, transport) = setup();
    transport.set_fail_broadcasts(true);
    let conn = ConnectionId::new();
    let (ack, mut ack_rx) = recording_ack(false);

    router
        .on_message(NS, SELFCHECK_SEND_EVENT, conn, Some(json!("x")), ack)
        .await;

    let reply = ack_rx.try_recv().unwrap();
    assert_eq!(
        reply,
        format!("Error: Failed to send message in namespace: {NS}")
    );
    // The failure never disconnects the sender.
    assert!(transport.disconnects().is_empty());
}

#[tokio::test]
async fn no_ack_sent_when_ack_requested_flag_set() {
    // Pins the deployed acknowledgment guard: a request that sets the
    // ack-requested flag gets no reply. See DESIGN.md before changing.
    let (router, _registry, transport) = setup();
    let conn = ConnectionId::new();
    let (ack, mut ack_rx) = recording_ack(true);

    router
        .on_message(NS, SELFCHECK_SEND_EVENT, conn, Some(json!("x")), ack)
        .await;

    assert_eq!(transport.broadcasts().len(), 1);
    assert!(ack_rx.try_recv().is_err(), "no ack should have been sent");
}

// ============================================================================
// Sweep interplay
// ============================================================================

#[tokio::test]
async fn session_expiring_in_a_minute_survives_now_and_is_evicted_after() {
    let (router, registry, transport) = setup();
    let conn = ConnectionId::new();

    let now_ms = chrono::Utc::now().timestamp_millis();
    let exp_secs = now_ms / 1000 + 60;
    let token = TestTokenBuilder::new().expires_at(exp_secs).build();
    let handshake = HandshakeBuilder::new().with_auth_header(&token).build();
    router.on_connect(NS, conn, &handshake).await;
    assert_eq!(registry.expiry_ms(conn), Some(exp_secs * 1000));

    // A sweep at "now" leaves it alone.
    let evicted = run_sweep_once(&registry, transport.as_ref(), now_ms).await;
    assert_eq!(evicted, 0);
    assert!(registry.is_tracked(conn));

    // A sweep past the expiry evicts and disconnects exactly once.
    let evicted = run_sweep_once(&registry, transport.as_ref(), exp_secs * 1000 + 1).await;
    assert_eq!(evicted, 1);
    assert!(!registry.is_tracked(conn));
    assert_eq!(transport.disconnects(), vec![conn]);
}
