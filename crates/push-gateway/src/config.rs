//! Push Gateway configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output. The token secret is the only
//! required variable; its absence is a fatal startup error.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default socket bind host.
pub const DEFAULT_SOCKET_HOST: &str = "0.0.0.0";

/// Default socket bind port.
pub const DEFAULT_SOCKET_PORT: u16 = 9092;

/// Default health endpoint bind address.
pub const DEFAULT_HEALTH_BIND_ADDRESS: &str = "0.0.0.0:8081";

/// Default namespace list URL.
pub const DEFAULT_NAMESPACE_LIST_URL: &str = "http://localhost:8080/api/licences";

/// Default session sweep interval in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 120;

/// Push Gateway configuration.
///
/// Loaded from environment variables with sensible defaults.
/// Sensitive fields are redacted in Debug output.
#[derive(Clone)]
pub struct Config {
    /// Socket bind host for the client-facing transport (default: "0.0.0.0").
    pub socket_host: String,

    /// Socket bind port for the client-facing transport (default: 9092).
    pub socket_port: u16,

    /// Health endpoint bind address (default: "0.0.0.0:8081").
    pub health_bind_address: String,

    /// URL the namespace list is fetched from at boot.
    pub namespace_list_url: String,

    /// Interval between session-expiry sweeps, in seconds (default: 120).
    pub sweep_interval_seconds: u64,

    /// Shared secret for bearer-token signature verification.
    /// Protected by `SecretString` to prevent accidental logging.
    pub token_secret: SecretString,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("socket_host", &self.socket_host)
            .field("socket_port", &self.socket_port)
            .field("health_bind_address", &self.health_bind_address)
            .field("namespace_list_url", &self.namespace_list_url)
            .field("sweep_interval_seconds", &self.sweep_interval_seconds)
            .field("token_secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `AUTH_TOKEN_SECRET` is unset,
    /// or `ConfigError::InvalidValue` for unparseable numeric values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let token_secret = SecretString::from(
            vars.get("AUTH_TOKEN_SECRET")
                .ok_or_else(|| ConfigError::MissingEnvVar("AUTH_TOKEN_SECRET".to_string()))?
                .clone(),
        );

        let socket_host = vars
            .get("SOCKET_HOST")
            .cloned()
            .unwrap_or_else(|| DEFAULT_SOCKET_HOST.to_string());

        let socket_port = match vars.get("SOCKET_PORT") {
            Some(raw) => raw.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("SOCKET_PORT must be a port number, got {raw:?}"))
            })?,
            None => DEFAULT_SOCKET_PORT,
        };

        let health_bind_address = vars
            .get("HEALTH_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HEALTH_BIND_ADDRESS.to_string());

        let namespace_list_url = vars
            .get("NAMESPACE_LIST_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_NAMESPACE_LIST_URL.to_string());

        let sweep_interval_seconds = match vars.get("SESSION_SWEEP_INTERVAL_SECONDS") {
            Some(raw) => {
                let parsed: u64 = raw.parse().map_err(|_| {
                    ConfigError::InvalidValue(format!(
                        "SESSION_SWEEP_INTERVAL_SECONDS must be a positive integer, got {raw:?}"
                    ))
                })?;
                if parsed == 0 {
                    return Err(ConfigError::InvalidValue(
                        "SESSION_SWEEP_INTERVAL_SECONDS must be greater than zero".to_string(),
                    ));
                }
                parsed
            }
            None => DEFAULT_SWEEP_INTERVAL_SECONDS,
        };

        Ok(Config {
            socket_host,
            socket_port,
            health_bind_address,
            namespace_list_url,
            sweep_interval_seconds,
            token_secret,
        })
    }
}
