//! Cursor descriptors returned by `find` and `getMore`

use std::collections::VecDeque;
use std::fmt;

use mongodb::bson::{Bson, Document};

use crate::error::{CommandError, Result};

/// Server-side cursor handle. Zero means the server has nothing left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorId(i64);

impl CursorId {
    /// The id of a cursor the server has closed
    pub const EXHAUSTED: CursorId = CursorId(0);

    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// Whether the server still holds state for this cursor
    pub fn is_live(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for CursorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `database.collection` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// Split `db.collection`; collection names may themselves contain dots.
    pub fn parse(ns: &str) -> Result<Self> {
        match ns.split_once('.') {
            Some((database, collection)) if !database.is_empty() && !collection.is_empty() => {
                Ok(Self::new(database, collection))
            }
            _ => Err(malformed(format!("invalid namespace '{ns}'"))),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Cursor id, namespace and one batch of documents
#[derive(Debug, Clone, PartialEq)]
pub struct CursorDescriptor {
    pub id: CursorId,
    pub namespace: Namespace,
    pub batch: VecDeque<Document>,
}

impl CursorDescriptor {
    /// Read the `cursor` sub-document of a `find` response.
    pub fn from_find_response(response: &Document) -> Result<Self> {
        Self::from_response(response, "firstBatch")
    }

    /// Read the `cursor` sub-document of a `getMore` response.
    pub fn from_get_more_response(response: &Document) -> Result<Self> {
        Self::from_response(response, "nextBatch")
    }

    fn from_response(response: &Document, batch_field: &str) -> Result<Self> {
        let cursor = response
            .get_document("cursor")
            .map_err(|_| malformed("missing 'cursor' document".to_string()))?;

        let id = match cursor.get("id") {
            Some(Bson::Int64(id)) => CursorId(*id),
            Some(Bson::Int32(id)) => CursorId(*id as i64),
            _ => return Err(malformed("cursor id missing or not an integer".to_string())),
        };

        let ns = cursor
            .get_str("ns")
            .map_err(|_| malformed("cursor namespace missing".to_string()))?;
        let namespace = Namespace::parse(ns)?;

        let batch = cursor
            .get_array(batch_field)
            .map_err(|_| malformed(format!("cursor '{batch_field}' missing")))?
            .iter()
            .map(|item| match item {
                Bson::Document(doc) => Ok(doc.clone()),
                other => Err(malformed(format!(
                    "cursor batch entry is not a document: {other}"
                ))),
            })
            .collect::<Result<VecDeque<_>>>()?;

        Ok(Self {
            id,
            namespace,
            batch,
        })
    }
}

fn malformed(message: String) -> crate::error::FacadeError {
    CommandError::MalformedResponse(message).into()
}
