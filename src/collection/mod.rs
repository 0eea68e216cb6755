//! Collection facade
//!
//! [`Collection`] is the operation surface callers use: it builds command
//! documents, applies option defaults, dispatches, and maps responses to
//! stable result shapes. The module is organized by operation type:
//! - `read`: find, find_one
//! - `write`: insert, insert_one, insert_many, delete, delete_one, delete_many
//! - `result`: result types returned by write operations

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use mongodb::bson::Document;

use crate::config::{CursorConfig, UnknownFieldPolicy};
use crate::cursor::Namespace;
use crate::error::Result;
use crate::options::{DeleteOptions, FindOptions, InsertOptions};
use crate::protocol::{CommandDispatcher, IdGenerator, ObjectIdGenerator};

// Sub-modules
mod read;
mod result;
mod write;

pub use result::InsertManyResult;
pub use write::assign_id;


/// Handle on one collection, reading documents as `T`
///
/// Cheap to clone; every clone shares the same dispatcher and identifier
/// generator.
pub struct Collection<T> {
    dispatcher: Arc<dyn CommandDispatcher>,
    ids: Arc<dyn IdGenerator>,
    database: String,
    name: String,
    cursor_config: CursorConfig,
    unknown_fields: UnknownFieldPolicy,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Collection<T> {
    /// Create a collection handle with `ObjectId` identifiers and default cursor settings
    ///
    /// # Arguments
    /// * `dispatcher` - Command dispatcher shared with other handles
    /// * `database` - Database name
    /// * `name` - Collection name
    pub fn new(
        dispatcher: Arc<dyn CommandDispatcher>,
        database: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            ids: Arc::new(ObjectIdGenerator),
            database: database.into(),
            name: name.into(),
            cursor_config: CursorConfig::default(),
            unknown_fields: UnknownFieldPolicy::default(),
            _marker: PhantomData,
        }
    }

    /// Use a different identifier generator for inserted documents
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Use different cursor batching settings for `find`
    pub fn with_cursor_config(mut self, cursor_config: CursorConfig) -> Self {
        self.cursor_config = cursor_config;
        self
    }

    /// Policy for unrecognized fields in option documents
    pub fn with_unknown_field_policy(mut self, policy: UnknownFieldPolicy) -> Self {
        self.unknown_fields = policy;
        self
    }

    /// Same collection, documents read as `U`
    pub fn clone_with_type<U>(&self) -> Collection<U> {
        Collection {
            dispatcher: Arc::clone(&self.dispatcher),
            ids: Arc::clone(&self.ids),
            database: self.database.clone(),
            name: self.name.clone(),
            cursor_config: self.cursor_config.clone(),
            unknown_fields: self.unknown_fields,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    pub fn namespace(&self) -> Namespace {
        Namespace::new(&self.database, &self.name)
    }

    pub fn unknown_field_policy(&self) -> UnknownFieldPolicy {
        self.unknown_fields
    }

    /// Parse a dynamic option document for `find`/`find_one`
    ///
    /// Unrecognized fields follow this collection's [`UnknownFieldPolicy`].
    pub fn find_options(&self, options: &Document) -> Result<FindOptions> {
        FindOptions::from_document(options, self.unknown_fields)
    }

    /// Parse a dynamic option document for the insert operations
    pub fn insert_options(&self, options: &Document) -> Result<InsertOptions> {
        InsertOptions::from_document(options, self.unknown_fields)
    }

    /// Parse a dynamic option document for the delete operations
    pub fn delete_options(&self, options: &Document) -> Result<DeleteOptions> {
        DeleteOptions::from_document(options, self.unknown_fields)
    }

    /// Send a command to this collection's database
    async fn dispatch(&self, command: Document) -> Result<Document> {
        self.dispatcher.command_single(&self.database, command).await
    }
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        self.clone_with_type()
    }
}

impl<T> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("database", &self.database)
            .field("name", &self.name)
            .field("cursor_config", &self.cursor_config)
            .field("unknown_fields", &self.unknown_fields)
            .finish()
    }
}

/// Documents accepted by [`Collection::insert`]: one or many
///
/// Whatever the shape, documents without an `_id` get one assigned in place.
#[derive(Debug)]
pub enum InsertDocuments<'a> {
    One(&'a mut Document),
    Many(&'a mut [Document]),
}

impl<'a> InsertDocuments<'a> {
    /// Normalize to the slice form
    pub fn into_slice(self) -> &'a mut [Document] {
        match self {
            InsertDocuments::One(doc) => std::slice::from_mut(doc),
            InsertDocuments::Many(docs) => docs,
        }
    }
}

impl<'a> From<&'a mut Document> for InsertDocuments<'a> {
    fn from(doc: &'a mut Document) -> Self {
        InsertDocuments::One(doc)
    }
}

impl<'a> From<&'a mut [Document]> for InsertDocuments<'a> {
    fn from(docs: &'a mut [Document]) -> Self {
        InsertDocuments::Many(docs)
    }
}

impl<'a> From<&'a mut Vec<Document>> for InsertDocuments<'a> {
    fn from(docs: &'a mut Vec<Document>) -> Self {
        InsertDocuments::Many(docs.as_mut_slice())
    }
}
