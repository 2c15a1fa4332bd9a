//! Document database connection manager.
//!
//! Opens the MongoDB connection only when asked to. Every failure stays
//! inside this module: callers see `false` plus a log line, never an error.
//!
//! ### Bounded connect
//! - URI parsing (including SRV lookups) is bounded by the connect timeout.
//! - Server selection and initial connect use the driver's own timeouts.
//! - The verification `ping` is bounded by the socket timeout.
//!
//! The state only becomes `Connected` once that `ping` has round-tripped.

use std::time::Duration;

use async_trait::async_trait;
use cachegate_core::AppConfig;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::Client;

/// Lifecycle of the managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

/// Reasons a connection attempt fails.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("no database URI configured")]
    NotConfigured,

    #[error("invalid connection options: {0}")]
    InvalidOptions(mongodb::error::Error),

    #[error("connection verification failed: {0}")]
    Verification(mongodb::error::Error),

    #[error("{stage} timed out after {}ms", .timeout.as_millis())]
    Timeout { stage: &'static str, timeout: Duration },
}

/// Timeouts and target for the connection manager.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub uri: Option<String>,
    pub database: String,
    pub server_selection_timeout: Duration,
    pub connect_timeout: Duration,
    pub socket_timeout: Duration,
}

impl ConnectionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            uri: config.database_uri().map(str::to_string),
            database: config.database_name.clone(),
            server_selection_timeout: config.server_selection_timeout(),
            connect_timeout: config.connect_timeout(),
            socket_timeout: config.socket_timeout(),
        }
    }
}

/// Connection manager seam used by the bootstrap sequence.
#[async_trait]
pub trait DatabaseConnector: Send + Sync {
    /// Open a fresh connection, replacing any existing one.
    async fn connect(&mut self) -> bool;

    /// Close the connection if one is open.
    async fn close(&mut self);

    fn state(&self) -> ConnectionState;

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}

/// MongoDB-backed [`DatabaseConnector`].
#[derive(Debug)]
pub struct MongoConnectionManager {
    settings: ConnectionSettings,
    client: Option<Client>,
    state: ConnectionState,
}

impl MongoConnectionManager {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self { settings, client: None, state: ConnectionState::Disconnected }
    }

    async fn try_connect(&mut self) -> Result<(), ConnectError> {
        let uri = self.settings.uri.clone().ok_or(ConnectError::NotConfigured)?;

        if self.client.is_some() {
            tracing::debug!("closing existing database connection before reconnecting");
            self.close().await;
        }

        self.state = ConnectionState::Connecting;

        let connect_timeout = self.settings.connect_timeout;
        let mut options = tokio::time::timeout(connect_timeout, async { ClientOptions::parse(uri).await })
            .await
            .map_err(|_| ConnectError::Timeout { stage: "connection string resolution", timeout: connect_timeout })?
            .map_err(ConnectError::InvalidOptions)?;

        options.app_name = Some("cachegate".to_string());
        options.server_selection_timeout = Some(self.settings.server_selection_timeout);
        options.connect_timeout = Some(connect_timeout);

        let client = Client::with_options(options).map_err(ConnectError::InvalidOptions)?;
        let db = client.database(&self.settings.database);

        let socket_timeout = self.settings.socket_timeout;
        let ping = tokio::time::timeout(socket_timeout, async { db.run_command(doc! { "ping": 1 }).await }).await;

        match ping {
            Ok(Ok(_)) => {
                self.client = Some(client);
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Ok(Err(e)) => {
                client.shutdown().await;
                Err(ConnectError::Verification(e))
            }
            Err(_) => {
                client.shutdown().await;
                Err(ConnectError::Timeout { stage: "ping", timeout: socket_timeout })
            }
        }
    }

    async fn reset(&mut self) {
        if let Some(client) = self.client.take() {
            client.shutdown().await;
        }
        self.state = ConnectionState::Disconnected;
    }
}

#[async_trait]
impl DatabaseConnector for MongoConnectionManager {
    async fn connect(&mut self) -> bool {
        match self.try_connect().await {
            Ok(()) => {
                tracing::info!(database = %self.settings.database, "database connection established");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "database connection failed");
                self.reset().await;
                false
            }
        }
    }

    async fn close(&mut self) {
        if let Some(client) = self.client.take() {
            self.state = ConnectionState::Disconnecting;
            client.shutdown().await;
            tracing::info!("database connection closed");
        }
        self.state = ConnectionState::Disconnected;
    }

    fn state(&self) -> ConnectionState {
        self.state
    }
}
