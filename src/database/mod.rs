//! Database handles
//!
//! A [`Database`] names one database on a dispatcher and hands out
//! [`Collection`] handles that share its dispatcher, identifier generator
//! and cursor settings.

use std::fmt;
use std::sync::Arc;

use mongodb::bson::Document;
use tracing::debug;

use crate::collection::Collection;
use crate::config::{Config, CursorConfig, UnknownFieldPolicy};
use crate::error::Result;
use crate::protocol::{CommandDispatcher, IdGenerator, ObjectIdGenerator, command_name};

/// Handle on one database
#[derive(Clone)]
pub struct Database {
    dispatcher: Arc<dyn CommandDispatcher>,
    ids: Arc<dyn IdGenerator>,
    name: String,
    cursor_config: CursorConfig,
    unknown_fields: UnknownFieldPolicy,
}

impl Database {
    /// Create a database handle
    ///
    /// # Arguments
    /// * `dispatcher` - Command dispatcher
    /// * `name` - Database name
    pub fn new(dispatcher: Arc<dyn CommandDispatcher>, name: impl Into<String>) -> Self {
        Self {
            dispatcher,
            ids: Arc::new(ObjectIdGenerator),
            name: name.into(),
            cursor_config: CursorConfig::default(),
            unknown_fields: UnknownFieldPolicy::default(),
        }
    }

    /// Create a database handle carrying the cursor and option settings of `config`
    pub fn from_config(
        dispatcher: Arc<dyn CommandDispatcher>,
        name: impl Into<String>,
        config: &Config,
    ) -> Self {
        Self::new(dispatcher, name)
            .with_cursor_config(config.cursor.clone())
            .with_unknown_field_policy(config.options.unknown_fields)
    }

    /// Use a different identifier generator for every collection of this database
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Use different cursor settings for every collection of this database
    pub fn with_cursor_config(mut self, cursor_config: CursorConfig) -> Self {
        self.cursor_config = cursor_config;
        self
    }

    /// Policy for unrecognized option fields in every collection of this database
    pub fn with_unknown_field_policy(mut self, policy: UnknownFieldPolicy) -> Self {
        self.unknown_fields = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a collection handle reading documents as `T`
    ///
    /// No command is sent; the collection does not need to exist.
    pub fn collection<T>(&self, name: &str) -> Collection<T> {
        Collection::new(Arc::clone(&self.dispatcher), &self.name, name)
            .with_id_generator(Arc::clone(&self.ids))
            .with_cursor_config(self.cursor_config.clone())
            .with_unknown_field_policy(self.unknown_fields)
    }

    /// Run an arbitrary command against this database
    ///
    /// # Returns
    /// * `Result<Document>` - The raw response of a successful command
    pub async fn run_command(&self, command: Document) -> Result<Document> {
        debug!(
            "Running command '{}' on database '{}'",
            command_name(&command),
            self.name
        );
        self.dispatcher.command_single(&self.name, command).await
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("cursor_config", &self.cursor_config)
            .field("unknown_fields", &self.unknown_fields)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::mock::MockDispatcher;
    use mongodb::bson::{Bson, doc};

    #[tokio::test]
    async fn test_collection_shares_settings() {
        let dispatcher = Arc::new(MockDispatcher::with_responses(vec![doc! { "n": 1, "ok": 1 }]));
        let cursor_config = CursorConfig {
            initial_batch_size: 10,
            ..Default::default()
        };
        let db = Database::new(dispatcher.clone(), "shop")
            .with_id_generator(Arc::new(|| Bson::Int64(1)))
            .with_cursor_config(cursor_config);

        let orders = db.collection::<Document>("orders");
        assert_eq!(orders.namespace().to_string(), "shop.orders");

        let mut order = doc! { "total": 12 };
        let id = orders.insert_one(&mut order, None).await.unwrap();
        assert_eq!(id, Bson::Int64(1));

        let (database, command) = dispatcher.commands().await.remove(0);
        assert_eq!(database, "shop");
        assert_eq!(command.get_str("insert").unwrap(), "orders");
    }

    #[tokio::test]
    async fn test_run_command() {
        let dispatcher = Arc::new(MockDispatcher::with_responses(vec![doc! { "ok": 1 }]));
        let db = Database::new(dispatcher.clone(), "admin");

        let response = db.run_command(doc! { "ping": 1 }).await.unwrap();
        assert_eq!(response, doc! { "ok": 1 });
        assert_eq!(dispatcher.last_command().await, Some(doc! { "ping": 1 }));
    }

    #[tokio::test]
    async fn test_run_command_failure() {
        let dispatcher = Arc::new(MockDispatcher::with_responses(vec![
            doc! { "ok": 0, "errmsg": "no such command", "code": 59 },
        ]));
        let db = Database::new(dispatcher, "admin");

        assert!(db.run_command(doc! { "bogus": 1 }).await.is_err());
    }

    #[tokio::test]
    async fn test_from_config_reaches_find() {
        let dispatcher = Arc::new(MockDispatcher::with_responses(vec![doc! {
            "cursor": { "firstBatch": [], "id": 0i64, "ns": "shop.orders" },
            "ok": 1,
        }]));
        let mut config = Config::default();
        config.cursor.initial_batch_size = 20;
        config.cursor.no_cursor_timeout = false;
        config.options.unknown_fields = UnknownFieldPolicy::Ignore;

        let db = Database::from_config(dispatcher.clone(), "shop", &config);
        let orders = db.collection::<Document>("orders");

        let options = orders.find_options(&doc! { "limit": 3, "bogus": true }).unwrap();
        orders.find(None, options).await.unwrap();

        let command = dispatcher.last_command().await.unwrap();
        assert_eq!(command.get_i32("batchSize").unwrap(), 20);
        assert!(!command.get_bool("noCursorTimeout").unwrap());
        assert_eq!(command.get_i64("limit").unwrap(), 3);
    }

    #[test]
    fn test_default_policy_rejects_unknown_options() {
        let db = Database::new(Arc::new(MockDispatcher::new()), "shop");
        let orders = db.collection::<Document>("orders");

        assert_eq!(orders.unknown_field_policy(), UnknownFieldPolicy::Reject);
        assert!(orders.delete_options(&doc! { "bogus": 1 }).is_err());
        assert!(orders.insert_options(&doc! { "ordered": false }).is_ok());
    }
}
