//! Command dispatch boundary
//!
//! Everything above this module speaks in command documents; everything below
//! it (connections, framing, authentication, server selection) belongs to the
//! `mongodb` driver. The [`CommandDispatcher`] trait is the seam between the
//! two, which also lets tests substitute a recording dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::Document;
use mongodb::{Client, ClientSession};
use tracing::{debug, trace};

use crate::error::Result;

pub mod ids;
pub mod response;
pub mod session;

#[cfg(test)]
pub(crate) mod mock;

pub use ids::{IdGenerator, ObjectIdGenerator};
pub use session::{CursorSessions, SessionRoute};

/// Sends database commands and returns decoded responses.
///
/// Implementations own their connection resources; the facade only calls
/// this request/response contract and never mutates dispatcher state.
/// Commands continuing a cursor (`getMore`, `killCursors`) must reach the
/// server under the same session as the command that opened it.
#[async_trait]
pub trait CommandDispatcher: Send + Sync {
    /// Run one command against `database` and return its response document.
    ///
    /// Fails on transport errors and on server-reported command failure
    /// (`ok: 0`).
    async fn command_single(&self, database: &str, command: Document) -> Result<Document>;
}

/// Dispatcher backed by a connected `mongodb::Client`
///
/// Cursor-opening commands run under an explicit session that stays
/// attached to the cursor until the server reports it exhausted or it is
/// killed. Clones share the same session registry.
#[derive(Clone)]
pub struct MongoDispatcher {
    client: Client,
    sessions: Arc<CursorSessions<ClientSession>>,
}

impl MongoDispatcher {
    /// Create a dispatcher over an existing client
    pub fn new(client: Client) -> Self {
        Self {
            client,
            sessions: Arc::new(CursorSessions::new()),
        }
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Number of open cursors holding a session
    pub async fn pinned_cursors(&self) -> usize {
        self.sessions.len().await
    }

    /// Drop the sessions of every open cursor; returns how many were held
    pub async fn release_sessions(&self) -> usize {
        self.sessions.clear().await
    }

    async fn run_unpinned(&self, database: &str, command: Document) -> Result<Document> {
        Ok(self.client.database(database).run_command(command).await?)
    }

    async fn run_opening(&self, database: &str, command: Document) -> Result<Document> {
        let mut session = self.client.start_session().await?;
        let response = self
            .client
            .database(database)
            .run_command(command)
            .session(&mut session)
            .await?;

        if self.sessions.pin(database, &response, session).await {
            trace!(database, "pinned cursor session");
        }

        Ok(response)
    }

    async fn run_pinned(
        &self,
        database: &str,
        command: Document,
        ids: Vec<i64>,
    ) -> Result<Document> {
        let pinned = match ids.first() {
            Some(&id) => self.sessions.get(database, id).await,
            None => None,
        };
        let Some(pinned) = pinned else {
            return self.run_unpinned(database, command).await;
        };

        let response = {
            let mut session = pinned.lock().await;
            self.client
                .database(database)
                .run_command(command.clone())
                .session(&mut *session)
                .await?
        };

        self.sessions.settle(database, &command, &ids, &response).await;
        Ok(response)
    }
}

#[async_trait]
impl CommandDispatcher for MongoDispatcher {
    async fn command_single(&self, database: &str, command: Document) -> Result<Document> {
        let name = command_name(&command).to_string();
        debug!(database, command = %name, "dispatching command");
        trace!(?command, "command body");

        let response = match SessionRoute::of(&command) {
            SessionRoute::Opens => self.run_opening(database, command).await?,
            SessionRoute::Pinned(ids) => self.run_pinned(database, command, ids).await?,
            SessionRoute::Unpinned => self.run_unpinned(database, command).await?,
        };

        trace!(command = %name, ?response, "command response");
        Ok(response)
    }
}

/// Name of a command document (its first key)
pub fn command_name(command: &Document) -> &str {
    command.keys().next().map(String::as_str).unwrap_or("<empty>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_command_name_is_first_key() {
        let command = doc! { "insert": "users", "documents": [], "ordered": true };
        assert_eq!(command_name(&command), "insert");
    }

    #[test]
    fn test_command_name_of_empty_document() {
        assert_eq!(command_name(&Document::new()), "<empty>");
    }

    #[test]
    fn test_dispatcher_trait_object() {
        fn _accepts_dispatcher(_dispatcher: std::sync::Arc<dyn CommandDispatcher>) {}
    }
}
