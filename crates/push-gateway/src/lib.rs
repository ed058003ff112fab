//! Push Gateway
//!
//! Single-process real-time push gateway. Clients connect under dynamically
//! provisioned namespaces, authenticate with a signed bearer token, and
//! exchange small event payloads that are re-broadcast to their namespace.
//!
//! # Architecture
//!
//! - [`auth`] - bearer-token validation and handshake token extraction
//! - [`session`] - concurrent registry of connection -> token expiry
//! - [`tasks`] - background sweep that evicts expired sessions
//! - [`router`] - per-namespace connect/disconnect/message handling
//! - [`provider`] - namespace list retrieval with a fixed fallback
//! - [`transport`] - the socket collaborator contract and the in-process
//!   implementation used by the binary and the end-to-end tests
//! - [`observability`] - health endpoints and metric recording helpers

#![warn(clippy::pedantic)]

pub mod auth;
pub mod config;
pub mod observability;
pub mod provider;
pub mod router;
pub mod session;
pub mod tasks;
pub mod transport;
