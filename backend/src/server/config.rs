//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::time::Duration;

use users_backend::domain::RetryPolicy;
use users_backend::outbound::mongo::MongoStore;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) store: MongoStore,
    pub(crate) retry_policy: RetryPolicy,
    pub(crate) shutdown_timeout: Duration,
    pub(crate) probe_interval: Duration,
}

impl ServerConfig {
    /// Construct a server configuration bound to `bind_addr` and backed by
    /// `store`.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, store: MongoStore) -> Self {
        Self {
            bind_addr,
            store,
            retry_policy: RetryPolicy::default(),
            shutdown_timeout: Duration::from_secs(30),
            probe_interval: Duration::from_secs(10),
        }
    }

    /// Set the retry policy applied to store calls.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }
}
