//! Read operations for the collection facade
//!
//! - find
//! - findOne

use mongodb::bson::Document;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::command;
use crate::cursor::{Cursor, CursorDescriptor};
use crate::error::Result;
use crate::options::FindOptions;

/// Read operations implementation
impl<T: DeserializeOwned> super::Collection<T> {
    /// Execute find command
    ///
    /// The first batch is kept small (`CursorConfig::initial_batch_size`,
    /// one document by default) and the cursor is opened with
    /// `noCursorTimeout` unless the caller turns it off; the rest streams
    /// through `getMore` as the returned cursor is pulled.
    ///
    /// # Arguments
    /// * `filter` - Query filter, or `None` for every document
    /// * `options` - Find options
    ///
    /// # Returns
    /// * `Result<Cursor<T>>` - Cursor over the result set
    pub async fn find(
        &self,
        filter: impl Into<Option<Document>>,
        options: impl Into<Option<FindOptions>>,
    ) -> Result<Cursor<T>> {
        let filter = filter.into();
        let options = options.into().unwrap_or_default();

        info!(
            "Executing find on collection '{}' with filter: {:?}",
            self.name, filter
        );

        let command = command::find(&self.name, filter, &options, &self.cursor_config)?;
        let response = self.dispatch(command).await?;
        let descriptor = CursorDescriptor::from_find_response(&response)?;

        debug!(
            cursor_id = %descriptor.id,
            first_batch = descriptor.batch.len(),
            "find opened cursor"
        );

        let batch_size = options.batch_size.or(self.cursor_config.batch_size);
        Ok(Cursor::new(self.dispatcher.clone(), descriptor).with_batch_size(batch_size))
    }

    /// Execute findOne command
    ///
    /// Runs `find` (limited to one document unless the caller set a limit),
    /// pulls a single document and closes the cursor so nothing stays open
    /// on the server.
    ///
    /// # Returns
    /// * `Result<Option<T>>` - The first match, or `None` for an empty result set
    pub async fn find_one(
        &self,
        filter: impl Into<Option<Document>>,
        options: impl Into<Option<FindOptions>>,
    ) -> Result<Option<T>> {
        let mut options = options.into().unwrap_or_default();
        if options.limit.is_none() {
            options.limit = Some(1);
        }

        let mut cursor = self.find(filter, options).await?;
        let first = cursor.next().await;

        if let Err(e) = cursor.close().await {
            warn!(
                namespace = %cursor.namespace(),
                error = %e,
                "failed to close findOne cursor"
            );
        }

        first
    }
}
