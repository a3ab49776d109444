//! Pooled MongoDB client for the process lifetime.
//!
//! The driver keeps its own connection pool per server; this module only
//! configures its bounds, checks reachability at startup and releases the
//! pool on shutdown.

use std::time::Duration;

use bson::{Document, doc};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

/// Errors raised while building or probing the store client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The connection string or driver options were rejected.
    #[error("failed to build store client: {message}")]
    Build { message: String },

    /// The store did not answer a `ping` command.
    #[error("store ping failed: {message}")]
    Ping { message: String },
}

impl StoreError {
    /// Create a build error with the given message.
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }

    /// Create a ping error with the given message.
    pub fn ping(message: impl Into<String>) -> Self {
        Self::Ping {
            message: message.into(),
        }
    }
}

/// Configuration for the store client.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use users_backend::outbound::mongo::StoreConfig;
///
/// let config = StoreConfig::new("mongodb://localhost:27017", "usuarios_db", "usuarios")
///     .with_max_pool_size(20)
///     .with_server_selection_timeout(Duration::from_secs(2));
/// assert_eq!(config.database(), "usuarios_db");
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    uri: String,
    database: String,
    collection: String,
    max_pool_size: u32,
    min_pool_size: u32,
    server_selection_timeout: Duration,
    app_name: String,
}

impl StoreConfig {
    /// Create a configuration with default pool bounds.
    ///
    /// Defaults:
    /// - `max_pool_size`: 10 connections
    /// - `min_pool_size`: 0 connections
    /// - `server_selection_timeout`: 5 seconds
    pub fn new(
        uri: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            collection: collection.into(),
            max_pool_size: 10,
            min_pool_size: 0,
            server_selection_timeout: Duration::from_secs(5),
            app_name: String::from("users-backend"),
        }
    }

    /// Set the maximum number of pooled connections per server.
    pub fn with_max_pool_size(mut self, max_pool_size: u32) -> Self {
        self.max_pool_size = max_pool_size;
        self
    }

    /// Set the number of connections kept open while idle.
    pub fn with_min_pool_size(mut self, min_pool_size: u32) -> Self {
        self.min_pool_size = min_pool_size;
        self
    }

    /// Bound how long the driver waits for a suitable server.
    pub fn with_server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = timeout;
        self
    }

    /// Name reported to the server in connection handshakes.
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Database holding the users collection.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Users collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Maximum pooled connections per server.
    pub fn max_pool_size(&self) -> u32 {
        self.max_pool_size
    }

    fn apply(&self, options: &mut ClientOptions) {
        options.max_pool_size = Some(self.max_pool_size);
        options.min_pool_size = Some(self.min_pool_size);
        options.server_selection_timeout = Some(self.server_selection_timeout);
        options.app_name = Some(self.app_name.clone());
    }
}

/// Handle to the configured database.
///
/// Cheap to clone; clones share the driver's connection pool.
#[derive(Clone, Debug)]
pub struct MongoStore {
    client: Client,
    database: Database,
    collection: String,
}

impl MongoStore {
    /// Build the client from configuration.
    ///
    /// Connections are opened lazily by the driver, so this succeeds while the
    /// store is still unreachable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Build`] when the connection string cannot be
    /// parsed or the driver rejects the options.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|err| StoreError::build(err.to_string()))?;
        config.apply(&mut options);
        let client =
            Client::with_options(options).map_err(|err| StoreError::build(err.to_string()))?;
        let database = client.database(config.database());
        info!(
            database = config.database(),
            collection = config.collection(),
            max_pool_size = config.max_pool_size(),
            "store client configured"
        );
        Ok(Self {
            client,
            database,
            collection: config.collection().to_owned(),
        })
    }

    /// Verify the store answers a `ping`, bounded by server selection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Ping`] when no server could be reached.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|err| StoreError::ping(err.to_string()))?;
        debug!("store ping succeeded");
        Ok(())
    }

    /// The configured users collection.
    pub fn users(&self) -> Collection<Document> {
        self.database.collection(&self.collection)
    }

    /// Close pooled connections and wait for in-flight operations.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
        info!("store client shut down");
    }
}
