//! Namespace list retrieval.
//!
//! At boot the router asks the provider for the namespace identifiers to
//! provision. The list lives behind an HTTP endpoint; when it cannot be
//! retrieved or parsed, a fixed fallback list is substituted so the gateway
//! always comes up. Callers treat live and fallback data uniformly.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Default timeout for namespace list requests in seconds.
const FETCH_TIMEOUT_SECS: u64 = 10;

/// Namespace identifiers provisioned when the list cannot be retrieved.
pub const FALLBACK_NAMESPACES: [&str; 3] = ["serial", "serial1", "serial2"];

/// Namespace list retrieval errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Request, non-2xx status, or body decode failure.
    #[error("Namespace list request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The HTTP client could not be constructed.
    #[error("Namespace list client error: {0}")]
    Client(String),
}

/// Wire shape of the namespace list document.
#[derive(Debug, Deserialize)]
struct NamespaceResponse {
    data: Vec<NamespaceEntry>,
    #[allow(dead_code)]
    status: i32,
    #[allow(dead_code)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct NamespaceEntry {
    serial: String,
}

/// The provider's answer: either the live list or the explicit fallback.
///
/// The distinction exists for logging and tests; routing treats both the
/// same via [`NamespaceList::identifiers`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceList {
    /// Identifiers retrieved from the configured endpoint, in document order.
    Live(Vec<String>),
    /// The fixed fallback list, substituted after a retrieval failure.
    Fallback(Vec<String>),
}

impl NamespaceList {
    /// The namespace identifiers, regardless of origin.
    #[must_use]
    pub fn identifiers(&self) -> &[String] {
        match self {
            NamespaceList::Live(ids) | NamespaceList::Fallback(ids) => ids,
        }
    }

    /// Whether this is the substituted fallback list.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, NamespaceList::Fallback(_))
    }

    fn fallback() -> Self {
        NamespaceList::Fallback(FALLBACK_NAMESPACES.iter().map(ToString::to_string).collect())
    }
}

/// HTTP client for the namespace list endpoint.
pub struct NamespaceProvider {
    client: reqwest::Client,
    url: String,
}

impl NamespaceProvider {
    /// Create a provider fetching from `url`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Client` if the HTTP client cannot be built.
    pub fn new(url: String) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        Ok(Self { client, url })
    }

    /// Fetch the live namespace list.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Http` on connection failure, non-2xx status,
    /// or an undecodable body.
    pub async fn try_fetch(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json::<NamespaceResponse>()
            .await?;

        Ok(response
            .data
            .into_iter()
            .map(|entry| entry.serial)
            .collect())
    }

    /// Fetch the namespace list, substituting the fixed fallback on any
    /// failure. Never errors; the failure is logged and invisible to the
    /// caller beyond the [`NamespaceList::Fallback`] tag.
    pub async fn fetch(&self) -> NamespaceList {
        match self.try_fetch().await {
            Ok(ids) => {
                debug!(
                    target: "gateway.provider",
                    count = ids.len(),
                    "Fetched namespace list"
                );
                NamespaceList::Live(ids)
            }
            Err(e) => {
                warn!(
                    target: "gateway.provider",
                    error = %e,
                    "Namespace list fetch failed, using fallback list"
                );
                NamespaceList::fallback()
            }
        }
    }
}
