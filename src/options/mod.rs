//! Typed options for collection operations
//!
//! Each operation takes an explicit options struct whose `Default` holds the
//! documented defaults. Passthrough values (write concern, collation, hint,
//! comment) are not interpreted here; they are forwarded verbatim into the
//! command document and absent ones are left out.
//!
//! Options can also be parsed from a dynamic document (as typed in a shell),
//! with unrecognized fields handled by an explicit [`UnknownFieldPolicy`].

use mongodb::bson::{Bson, Document};
use tracing::debug;

use crate::config::UnknownFieldPolicy;
use crate::error::{ArgumentError, Result};

/// Index hint: either an index name or a key pattern
#[derive(Debug, Clone, PartialEq)]
pub enum Hint {
    Name(String),
    Keys(Document),
}

impl Hint {
    /// Value as it appears in a command document
    pub fn to_bson(&self) -> Bson {
        match self {
            Hint::Name(name) => Bson::String(name.clone()),
            Hint::Keys(keys) => Bson::Document(keys.clone()),
        }
    }
}

impl From<&str> for Hint {
    fn from(name: &str) -> Self {
        Hint::Name(name.to_string())
    }
}

impl From<Document> for Hint {
    fn from(keys: Document) -> Self {
        Hint::Keys(keys)
    }
}

/// Options for `find` and `find_one`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
    /// Batch size for `getMore`; the initial `find` batch comes from configuration
    pub batch_size: Option<u32>,
    pub hint: Option<Hint>,
    pub collation: Option<Document>,
    pub comment: Option<Bson>,
    pub max_time_ms: Option<u64>,
    /// `None` keeps the configured default (no server-side timeout)
    pub no_cursor_timeout: Option<bool>,
}

/// Options for `insert`, `insert_one` and `insert_many`
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOptions {
    /// Stop at the first failing document (`true`) or try them all
    pub ordered: bool,
    pub write_concern: Option<Document>,
    pub bypass_document_validation: Option<bool>,
    pub comment: Option<Bson>,
}

/// Options for `delete`, `delete_one` and `delete_many`
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOptions {
    /// Maximum documents to delete; 0 means no limit
    pub limit: i64,
    pub collation: Option<Document>,
    pub hint: Option<Hint>,
    pub ordered: bool,
    pub write_concern: Option<Document>,
    pub comment: Option<Bson>,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            ordered: true,
            write_concern: None,
            bypass_document_validation: None,
            comment: None,
        }
    }
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            limit: 0,
            collation: None,
            hint: None,
            ordered: true,
            write_concern: None,
            comment: None,
        }
    }
}

impl FindOptions {
    /// Parse find options from a dynamic document
    pub fn from_document(doc: &Document, policy: UnknownFieldPolicy) -> Result<Self> {
        let mut options = FindOptions::default();

        for (key, value) in doc {
            match key.as_str() {
                "projection" => options.projection = Some(expect_document(key, value)?),
                "sort" => options.sort = Some(expect_document(key, value)?),
                "skip" => options.skip = Some(expect_non_negative(key, value)?),
                "limit" => options.limit = Some(expect_integer(key, value)?),
                "batchSize" => options.batch_size = Some(expect_batch_size(key, value)?),
                "hint" => options.hint = Some(expect_hint(key, value)?),
                "collation" => options.collation = Some(expect_document(key, value)?),
                "comment" => options.comment = Some(value.clone()),
                "maxTimeMS" => options.max_time_ms = Some(expect_non_negative(key, value)?),
                "noCursorTimeout" => options.no_cursor_timeout = Some(expect_bool(key, value)?),
                _ => unknown_field("find", key, policy)?,
            }
        }

        Ok(options)
    }
}

impl InsertOptions {
    /// Parse insert options from a dynamic document
    pub fn from_document(doc: &Document, policy: UnknownFieldPolicy) -> Result<Self> {
        let mut options = InsertOptions::default();

        for (key, value) in doc {
            match key.as_str() {
                "ordered" => options.ordered = expect_bool(key, value)?,
                "writeConcern" => options.write_concern = Some(expect_document(key, value)?),
                "bypassDocumentValidation" => {
                    options.bypass_document_validation = Some(expect_bool(key, value)?)
                }
                "comment" => options.comment = Some(value.clone()),
                _ => unknown_field("insert", key, policy)?,
            }
        }

        Ok(options)
    }
}

impl DeleteOptions {
    /// Parse delete options from a dynamic document
    pub fn from_document(doc: &Document, policy: UnknownFieldPolicy) -> Result<Self> {
        let mut options = DeleteOptions::default();

        for (key, value) in doc {
            match key.as_str() {
                "limit" => options.limit = expect_non_negative::<i64>(key, value)?,
                "collation" => options.collation = Some(expect_document(key, value)?),
                "hint" => options.hint = Some(expect_hint(key, value)?),
                "ordered" => options.ordered = expect_bool(key, value)?,
                "writeConcern" => options.write_concern = Some(expect_document(key, value)?),
                "comment" => options.comment = Some(value.clone()),
                _ => unknown_field("delete", key, policy)?,
            }
        }

        Ok(options)
    }
}

fn unknown_field(operation: &str, field: &str, policy: UnknownFieldPolicy) -> Result<()> {
    match policy {
        UnknownFieldPolicy::Reject => Err(ArgumentError::UnknownOption {
            operation: operation.to_string(),
            field: field.to_string(),
        }
        .into()),
        UnknownFieldPolicy::Ignore => {
            debug!(operation, field, "ignoring unknown option");
            Ok(())
        }
    }
}

fn invalid(field: &str, expected: &str) -> crate::error::FacadeError {
    ArgumentError::InvalidOption {
        field: field.to_string(),
        expected: expected.to_string(),
    }
    .into()
}

fn expect_document(field: &str, value: &Bson) -> Result<Document> {
    match value {
        Bson::Document(doc) => Ok(doc.clone()),
        _ => Err(invalid(field, "a document")),
    }
}

fn expect_bool(field: &str, value: &Bson) -> Result<bool> {
    match value {
        Bson::Boolean(flag) => Ok(*flag),
        _ => Err(invalid(field, "a boolean")),
    }
}

fn expect_integer(field: &str, value: &Bson) -> Result<i64> {
    match value {
        Bson::Int32(v) => Ok(*v as i64),
        Bson::Int64(v) => Ok(*v),
        Bson::Double(v) if v.fract() == 0.0 => Ok(*v as i64),
        _ => Err(invalid(field, "an integer")),
    }
}

fn expect_non_negative<T: TryFrom<i64>>(field: &str, value: &Bson) -> Result<T> {
    let n = expect_integer(field, value)?;
    if n < 0 {
        return Err(invalid(field, "a non-negative integer"));
    }
    T::try_from(n).map_err(|_| invalid(field, "a non-negative integer"))
}

fn expect_batch_size(field: &str, value: &Bson) -> Result<u32> {
    let n = expect_integer(field, value)?;
    if n <= 0 || n > i32::MAX as i64 {
        return Err(invalid(field, "a positive integer"));
    }
    Ok(n as u32)
}

fn expect_hint(field: &str, value: &Bson) -> Result<Hint> {
    match value {
        Bson::String(name) => Ok(Hint::Name(name.clone())),
        Bson::Document(keys) => Ok(Hint::Keys(keys.clone())),
        _ => Err(invalid(field, "an index name or key pattern")),
    }
}
