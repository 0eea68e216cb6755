//! Connection management for MongoDB
//!
//! [`ConnectionManager`] owns the driver client. Connection pooling,
//! authentication and server selection stay inside the `mongodb` crate; the
//! manager configures the client, checks it with a `ping`, and hands out
//! database handles carrying the configured cursor and option settings.
//! Every handle shares one dispatcher, and with it the sessions pinned to
//! open cursors.

use std::sync::Arc;
use std::time::Duration;

use mongodb::bson::doc;
use mongodb::{Client, options::ClientOptions};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::database::Database;
use crate::error::{FacadeError, Result, TransportError};
use crate::protocol::{CommandDispatcher, MongoDispatcher};

/// MongoDB connection manager
pub struct ConnectionManager {
    /// Dispatcher over the connected client
    dispatcher: Option<Arc<MongoDispatcher>>,

    /// Connection, cursor and option configuration
    config: Config,

    /// Current connection state
    state: Arc<RwLock<ConnectionState>>,
}

/// Connection state information
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,

    /// Currently connecting
    Connecting,

    /// Connected and ready
    Connected,

    /// Connection failed
    Failed(String),
}

impl ConnectionManager {
    /// Create a new connection manager
    ///
    /// # Arguments
    /// * `config` - Full configuration; `connection` drives the client,
    ///   `cursor` and `options` are applied to every database handle
    pub fn new(config: Config) -> Self {
        Self {
            dispatcher: None,
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
        }
    }

    /// Establish connection to MongoDB
    ///
    /// Builds the client from the configured URI and pings the server so a
    /// bad address fails here rather than on the first operation.
    ///
    /// # Returns
    /// * `Result<()>` - Success or connection error
    pub async fn connect(&mut self) -> Result<()> {
        self.set_state(ConnectionState::Connecting).await;
        info!("Connecting to MongoDB at {}", self.config.connection.uri);

        match self.establish().await {
            Ok(client) => {
                self.dispatcher = Some(Arc::new(MongoDispatcher::new(client)));
                self.set_state(ConnectionState::Connected).await;
                info!("Connected to MongoDB");
                Ok(())
            }
            Err(e) => {
                warn!("Failed to connect to MongoDB: {}", e);
                self.set_state(ConnectionState::Failed(e.to_string())).await;
                Err(e)
            }
        }
    }

    /// Disconnect from MongoDB
    ///
    /// Ends the sessions of cursors still open and shuts the client down;
    /// handles obtained earlier stop working.
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(dispatcher) = self.dispatcher.take() {
            // shutdown waits for every live session, including pinned ones
            let released = dispatcher.release_sessions().await;
            debug!("Shutting down MongoDB client ({} cursor sessions released)", released);
            dispatcher.client().clone().shutdown().await;
        }
        self.set_state(ConnectionState::Disconnected).await;
        Ok(())
    }

    /// Get the MongoDB client
    ///
    /// # Returns
    /// * `Result<&Client>` - Reference to client or `NotConnected`
    pub fn get_client(&self) -> Result<&Client> {
        self.dispatcher
            .as_deref()
            .map(MongoDispatcher::client)
            .ok_or(FacadeError::Transport(TransportError::NotConnected))
    }

    /// Get the command dispatcher shared by every handle of this manager
    pub fn dispatcher(&self) -> Result<Arc<dyn CommandDispatcher>> {
        let dispatcher: Arc<dyn CommandDispatcher> = match self.dispatcher {
            Some(ref dispatcher) => dispatcher.clone(),
            None => return Err(TransportError::NotConnected.into()),
        };
        Ok(dispatcher)
    }

    /// Get a database handle
    ///
    /// # Arguments
    /// * `name` - Database name
    pub fn database(&self, name: &str) -> Result<Database> {
        Ok(self.bind_database(self.dispatcher()?, name))
    }

    /// Get a handle on the configured default database
    pub fn default_database(&self) -> Result<Database> {
        self.database(&self.config.connection.database)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn bind_database(&self, dispatcher: Arc<dyn CommandDispatcher>, name: &str) -> Database {
        Database::from_config(dispatcher, name, &self.config)
    }

    /// Get current connection state
    pub async fn get_state(&self) -> ConnectionState {
        self.state.read().await.clone()
    }

    /// Check if currently connected
    pub async fn is_connected(&self) -> bool {
        matches!(*self.state.read().await, ConnectionState::Connected)
    }

    /// Build client options from the configuration
    async fn client_options(&self) -> Result<ClientOptions> {
        let connection = &self.config.connection;
        let mut options = ClientOptions::parse(&connection.uri)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        let timeout = Duration::from_secs(connection.timeout);
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        if let Some(ref app_name) = connection.app_name {
            options.app_name = Some(app_name.clone());
        }

        Ok(options)
    }

    async fn establish(&self) -> Result<Client> {
        let options = self.client_options().await?;
        let client = Client::with_options(options)
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        Ok(client)
    }

    /// Update connection state
    async fn set_state(&self, new_state: ConnectionState) {
        *self.state.write().await = new_state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnknownFieldPolicy;
    use crate::protocol::mock::MockDispatcher;
    use mongodb::bson::Document;

    #[tokio::test]
    async fn test_new_manager_is_disconnected() {
        let manager = ConnectionManager::new(Config::default());
        assert_eq!(manager.get_state().await, ConnectionState::Disconnected);
        assert!(!manager.is_connected().await);
    }

    #[test]
    fn test_handles_require_connection() {
        let manager = ConnectionManager::new(Config::default());

        assert!(matches!(
            manager.get_client(),
            Err(FacadeError::Transport(TransportError::NotConnected))
        ));
        assert!(manager.dispatcher().is_err());
        assert!(manager.database("test").is_err());
        assert!(manager.default_database().is_err());
    }

    #[tokio::test]
    async fn test_invalid_uri_fails() {
        let mut config = Config::default();
        config.connection.uri = "not-a-mongodb-uri".to_string();
        let mut manager = ConnectionManager::new(config);

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(
            err,
            FacadeError::Transport(TransportError::ConnectionFailed(_))
        ));
        assert!(matches!(
            manager.get_state().await,
            ConnectionState::Failed(_)
        ));
    }

    #[tokio::test]
    async fn test_disconnect_when_not_connected() {
        let mut manager = ConnectionManager::new(Config::default());
        manager.disconnect().await.unwrap();
        assert_eq!(manager.get_state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_database_handles_carry_configuration() {
        let mut config = Config::default();
        config.cursor.initial_batch_size = 64;
        config.cursor.batch_size = Some(500);
        config.options.unknown_fields = UnknownFieldPolicy::Ignore;
        let manager = ConnectionManager::new(config);

        let dispatcher = Arc::new(MockDispatcher::with_responses(vec![
            doc! {
                "cursor": { "firstBatch": [], "id": 5i64, "ns": "shop.orders" },
                "ok": 1,
            },
            doc! {
                "cursor": { "nextBatch": [], "id": 0i64, "ns": "shop.orders" },
                "ok": 1,
            },
        ]));
        let orders = manager
            .bind_database(dispatcher.clone(), "shop")
            .collection::<Document>("orders");

        assert_eq!(orders.unknown_field_policy(), UnknownFieldPolicy::Ignore);

        let mut cursor = orders.find(None, None).await.unwrap();
        assert!(cursor.next().await.unwrap().is_none());

        let commands = dispatcher.commands().await;
        assert_eq!(commands[0].1.get_i32("batchSize").unwrap(), 64);
        assert_eq!(commands[1].1.get_i32("batchSize").unwrap(), 500);
    }
}
