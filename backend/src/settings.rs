//! Service configuration loaded via OrthoConfig.
//!
//! Values come from CLI flags, `USERS_*` environment variables and optional
//! configuration files, in increasing order of precedence of the source
//! layering OrthoConfig applies. Only the connection string is required.

use std::ffi::OsString;
use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::RetryPolicy;
use crate::outbound::mongo::StoreConfig;

const DEFAULT_DATABASE: &str = "usuarios_db";
const DEFAULT_COLLECTION: &str = "usuarios";
const DEFAULT_BIND_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_POOL_SIZE: u32 = 10;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_INITIAL_BACKOFF_MS: u64 = 100;
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Errors raised while loading or validating settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// Sources could not be read or merged.
    #[error("failed to load settings: {0}")]
    Load(String),
    /// The store connection string is absent or blank.
    #[error("USERS_MONGODB_URI must be set to a non-empty connection string")]
    MissingMongoUri,
    /// The bind host and port do not form a socket address.
    #[error("invalid bind address {0}")]
    InvalidBindAddress(String),
}

/// Configuration values for one service instance.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "USERS")]
pub struct ServiceSettings {
    /// Document store connection string.
    pub mongodb_uri: Option<String>,
    /// Database holding the users collection.
    pub database: Option<String>,
    /// Users collection name.
    pub collection: Option<String>,
    /// Interface the HTTP server binds to.
    pub bind_host: Option<String>,
    /// Port the HTTP server listens on.
    pub port: Option<u16>,
    /// Maximum pooled store connections per server.
    pub max_pool_size: Option<u32>,
    /// Per-attempt store deadline in milliseconds.
    pub store_timeout_ms: Option<u64>,
    /// Store calls per operation, including the first.
    pub retry_attempts: Option<u32>,
    /// Delay before the first retry in milliseconds.
    pub retry_initial_backoff_ms: Option<u64>,
}

impl ServiceSettings {
    /// Load settings from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Load`] when a source cannot be parsed.
    pub fn from_args<I>(args: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = OsString>,
    {
        Self::load_from_iter(args).map_err(|err| SettingsError::Load(err.to_string()))
    }

    /// Return the connection string, rejecting missing or blank values.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingMongoUri`] when unset or blank.
    pub fn mongodb_uri(&self) -> Result<&str, SettingsError> {
        self.mongodb_uri
            .as_deref()
            .map(str::trim)
            .filter(|uri| !uri.is_empty())
            .ok_or(SettingsError::MissingMongoUri)
    }

    /// Return the configured database, falling back to the default.
    pub fn database(&self) -> &str {
        self.database.as_deref().unwrap_or(DEFAULT_DATABASE)
    }

    /// Return the configured collection, falling back to the default.
    pub fn collection(&self) -> &str {
        self.collection.as_deref().unwrap_or(DEFAULT_COLLECTION)
    }

    /// Return the socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidBindAddress`] when the host is not an
    /// IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let host = self.bind_host.as_deref().unwrap_or(DEFAULT_BIND_HOST);
        let port = self.port.unwrap_or(DEFAULT_PORT);
        let raw = if host.contains(':') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        };
        raw.parse()
            .map_err(|_| SettingsError::InvalidBindAddress(raw))
    }

    /// Per-attempt store deadline.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms.unwrap_or(DEFAULT_STORE_TIMEOUT_MS))
    }

    /// Build the store client configuration.
    ///
    /// Server selection is bounded by the same deadline as each store call.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingMongoUri`] when no connection string is
    /// configured.
    pub fn store_config(&self) -> Result<StoreConfig, SettingsError> {
        Ok(
            StoreConfig::new(self.mongodb_uri()?, self.database(), self.collection())
                .with_max_pool_size(self.max_pool_size.unwrap_or(DEFAULT_MAX_POOL_SIZE))
                .with_server_selection_timeout(self.store_timeout()),
        )
    }

    /// Build the retry policy applied to every store call.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS),
            initial_backoff: Duration::from_millis(
                self.retry_initial_backoff_ms
                    .unwrap_or(DEFAULT_RETRY_INITIAL_BACKOFF_MS),
            ),
            max_backoff: MAX_RETRY_BACKOFF,
            attempt_timeout: self.store_timeout(),
        }
    }
}
