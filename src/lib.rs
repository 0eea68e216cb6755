//! MongoDB collection facade
//!
//! A thin collection API over the MongoDB command protocol: `find` and
//! `find_one` return pull-based cursors that stream through `getMore`,
//! inserts assign `_id` values on the client, and deletes map onto the
//! `delete` command. Every operation is expressed as a command document and
//! sent through a [`CommandDispatcher`], so the driver connection can be
//! swapped for any other request/response transport.
//!
//! # Modules
//!
//! - `collection`: Collection handles and their read/write operations
//! - `command`: Command document builders
//! - `config`: Configuration management
//! - `connection`: MongoDB connection management
//! - `cursor`: Result cursors and the `getMore` protocol
//! - `database`: Database handles
//! - `error`: Error types and handling
//! - `logging`: Tracing subscriber setup
//! - `options`: Operation option bags
//! - `protocol`: Dispatch boundary, identifier generation, response helpers
//!
//! # Example
//!
//! ```no_run
//! use mongo_facade::{config::Config, connection::ConnectionManager};
//! use mongodb::bson::{Document, doc};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load()?;
//!     let mut manager = ConnectionManager::new(config);
//!     manager.connect().await?;
//!
//!     let users = manager.default_database()?.collection::<Document>("users");
//!
//!     let mut alice = doc! { "name": "alice", "age": 30 };
//!     let id = users.insert_one(&mut alice, None).await?;
//!     println!("inserted {id}");
//!
//!     let mut cursor = users.find(doc! { "age": { "$gte": 18 } }, None).await?;
//!     while let Some(user) = cursor.next().await? {
//!         println!("{user}");
//!     }
//!
//!     users.delete_one(doc! { "_id": id }, None).await?;
//!     manager.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod collection;
pub mod command;
pub mod config;
pub mod connection;
pub mod cursor;
pub mod database;
pub mod error;
pub mod logging;
pub mod options;
pub mod protocol;

// Re-export commonly used types
pub use collection::{Collection, InsertManyResult};
pub use config::Config;
pub use connection::ConnectionManager;
pub use cursor::{Cursor, CursorState};
pub use database::Database;
pub use error::{FacadeError, Result};
pub use options::{DeleteOptions, FindOptions, InsertOptions};
pub use protocol::{CommandDispatcher, IdGenerator, MongoDispatcher, ObjectIdGenerator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}
