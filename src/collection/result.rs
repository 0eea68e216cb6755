//! Write result types

use mongodb::bson::Bson;
use serde::Serialize;

/// Outcome of an insert
///
/// `inserted_ids` is assigned client-side before the command is sent and has
/// one entry per submitted document, in submission order, whatever the
/// server persisted. `inserted_count` is the server's own count and is the
/// authoritative figure; when they disagree some documents were rejected
/// and [`InsertManyResult::is_partial`] returns true.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertManyResult {
    pub inserted_ids: Vec<Bson>,
    pub inserted_count: u64,
}

impl InsertManyResult {
    /// Whether the server persisted fewer documents than were submitted
    pub fn is_partial(&self) -> bool {
        self.inserted_count < self.inserted_ids.len() as u64
    }
}
