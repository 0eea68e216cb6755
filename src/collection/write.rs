//! Write operations for the collection facade
//!
//! - insert, insertOne, insertMany
//! - delete, deleteOne, deleteMany

use mongodb::bson::{Bson, Document};
use tracing::{debug, info, warn};

use super::{InsertDocuments, InsertManyResult};
use crate::command;
use crate::error::{ArgumentError, FacadeError, Result};
use crate::options::{DeleteOptions, InsertOptions};
use crate::protocol::IdGenerator;
use crate::protocol::response::{has_write_concern_error, read_count, write_error_count};

/// Make sure `doc` carries an `_id` and return it.
///
/// An existing non-null `_id` is kept untouched. Otherwise a generated one
/// is placed as the first field, replacing a null `_id` if present.
pub fn assign_id(doc: &mut Document, ids: &dyn IdGenerator) -> Bson {
    match doc.get("_id") {
        Some(id) if *id != Bson::Null => id.clone(),
        _ => {
            let id = ids.generate();
            doc.remove("_id");

            let mut with_id = Document::new();
            with_id.insert("_id", id.clone());
            for (key, value) in std::mem::take(doc) {
                with_id.insert(key, value);
            }
            *doc = with_id;

            id
        }
    }
}

/// Write operations implementation
impl<T> super::Collection<T> {
    /// Execute insertOne command
    ///
    /// `doc` is modified in place when it has no `_id`.
    ///
    /// # Returns
    /// * `Result<Bson>` - The document's identifier
    pub async fn insert_one(
        &self,
        doc: &mut Document,
        options: impl Into<Option<InsertOptions>>,
    ) -> Result<Bson> {
        let result = self
            .insert_many(std::slice::from_mut(doc), options)
            .await?;

        result
            .inserted_ids
            .into_iter()
            .next()
            .ok_or_else(|| FacadeError::Generic("insertOne produced no identifier".to_string()))
    }

    /// Insert one document or many
    ///
    /// Accepts `&mut Document`, `&mut [Document]` or `&mut Vec<Document>`
    /// and forwards to [`insert_many`](Self::insert_many).
    pub async fn insert<'a>(
        &self,
        docs: impl Into<InsertDocuments<'a>>,
        options: impl Into<Option<InsertOptions>>,
    ) -> Result<InsertManyResult> {
        self.insert_many(docs.into().into_slice(), options).await
    }

    /// Execute insertMany command
    ///
    /// Every document without an `_id` gets one from the identifier
    /// generator before the command is built, so the identifiers are known
    /// to the caller even when the command then fails.
    ///
    /// # Arguments
    /// * `docs` - Documents to insert, modified in place when they lack an `_id`
    /// * `options` - Insert options (`ordered` defaults to true)
    ///
    /// # Returns
    /// * `Result<InsertManyResult>` - Assigned identifiers and the server's count
    pub async fn insert_many(
        &self,
        docs: &mut [Document],
        options: impl Into<Option<InsertOptions>>,
    ) -> Result<InsertManyResult> {
        if docs.is_empty() {
            return Err(ArgumentError::EmptyInsert.into());
        }

        let options = options.into().unwrap_or_default();
        let inserted_ids: Vec<Bson> = docs
            .iter_mut()
            .map(|doc| assign_id(doc, self.ids.as_ref()))
            .collect();

        debug!(
            "Executing insertMany on collection '{}' ({} documents, ordered: {})",
            self.name,
            docs.len(),
            options.ordered
        );

        let command = command::insert(&self.name, docs, &options);
        let response = self.dispatch(command).await?;
        let inserted_count = read_count(&response, "n")?;

        let write_errors = write_error_count(&response);
        if write_errors > 0 || has_write_concern_error(&response) {
            warn!(
                collection = %self.name,
                submitted = inserted_ids.len(),
                inserted = inserted_count,
                write_errors,
                "insert completed with errors"
            );
        }

        Ok(InsertManyResult {
            inserted_ids,
            inserted_count,
        })
    }

    /// Execute deleteMany command
    ///
    /// # Arguments
    /// * `filter` - Query filter
    /// * `options` - Delete options (`limit` 0 deletes every match)
    ///
    /// # Returns
    /// * `Result<u64>` - Number of documents the server deleted
    pub async fn delete_many(
        &self,
        filter: Document,
        options: impl Into<Option<DeleteOptions>>,
    ) -> Result<u64> {
        let options = options.into().unwrap_or_default();

        info!(
            "Executing delete on collection '{}' with filter: {:?} (limit {})",
            self.name, filter, options.limit
        );

        let command = command::delete(&self.name, filter, &options);
        let response = self.dispatch(command).await?;
        let deleted = read_count(&response, "n")?;

        if write_error_count(&response) > 0 || has_write_concern_error(&response) {
            warn!(collection = %self.name, deleted, "delete completed with errors");
        }

        Ok(deleted)
    }

    /// Synonym of [`delete_many`](Self::delete_many)
    pub async fn delete(
        &self,
        filter: Document,
        options: impl Into<Option<DeleteOptions>>,
    ) -> Result<u64> {
        self.delete_many(filter, options).await
    }

    /// Execute deleteOne command
    ///
    /// Always deletes at most one document: any caller-supplied `limit` is
    /// overridden with 1.
    pub async fn delete_one(
        &self,
        filter: Document,
        options: impl Into<Option<DeleteOptions>>,
    ) -> Result<u64> {
        let options = DeleteOptions {
            limit: 1,
            ..options.into().unwrap_or_default()
        };
        self.delete(filter, options).await
    }
}
