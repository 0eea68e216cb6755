//! Command document builders
//!
//! Pure functions turning an operation plus its options into the command
//! document the server expects. Nothing here talks to the dispatcher, so the
//! exact wire shape of each operation is testable on its own.

use mongodb::bson::{Bson, Document, doc};

use crate::config::CursorConfig;
use crate::cursor::CursorId;
use crate::error::{ArgumentError, Result};
use crate::options::{DeleteOptions, FindOptions, InsertOptions};

/// Build a `find` command.
///
/// The initial `batchSize` and the `noCursorTimeout` default come from
/// `cursor`; an explicit `options.no_cursor_timeout` wins over the default.
///
/// Fails when a numeric option does not fit the wire type.
pub fn find(
    collection: &str,
    filter: Option<Document>,
    options: &FindOptions,
    cursor: &CursorConfig,
) -> Result<Document> {
    let mut command = doc! { "find": collection };

    if let Some(filter) = filter {
        command.insert("filter", filter);
    }
    if let Some(ref projection) = options.projection {
        command.insert("projection", projection.clone());
    }
    if let Some(ref sort) = options.sort {
        command.insert("sort", sort.clone());
    }
    if let Some(skip) = options.skip {
        command.insert("skip", to_i64("skip", skip)?);
    }
    if let Some(limit) = options.limit {
        command.insert("limit", limit);
    }

    command.insert(
        "batchSize",
        to_i32("initialBatchSize", cursor.initial_batch_size)?,
    );
    command.insert(
        "noCursorTimeout",
        options.no_cursor_timeout.unwrap_or(cursor.no_cursor_timeout),
    );

    if let Some(ref hint) = options.hint {
        command.insert("hint", hint.to_bson());
    }
    if let Some(ref collation) = options.collation {
        command.insert("collation", collation.clone());
    }
    if let Some(ref comment) = options.comment {
        command.insert("comment", comment.clone());
    }
    if let Some(max_time_ms) = options.max_time_ms {
        command.insert("maxTimeMS", to_i64("maxTimeMS", max_time_ms)?);
    }

    Ok(command)
}

/// Build an `insert` command. Documents must already carry their `_id`.
pub fn insert(collection: &str, documents: &[Document], options: &InsertOptions) -> Document {
    let documents: Vec<Bson> = documents.iter().cloned().map(Bson::Document).collect();

    let mut command = doc! {
        "insert": collection,
        "documents": documents,
        "ordered": options.ordered,
    };

    if let Some(ref write_concern) = options.write_concern {
        command.insert("writeConcern", write_concern.clone());
    }
    if let Some(bypass) = options.bypass_document_validation {
        command.insert("bypassDocumentValidation", bypass);
    }
    if let Some(ref comment) = options.comment {
        command.insert("comment", comment.clone());
    }

    command
}

/// Build a `delete` command holding a single delete statement.
pub fn delete(collection: &str, filter: Document, options: &DeleteOptions) -> Document {
    let mut statement = doc! {
        "q": filter,
        "limit": options.limit,
    };

    if let Some(ref collation) = options.collation {
        statement.insert("collation", collation.clone());
    }
    if let Some(ref hint) = options.hint {
        statement.insert("hint", hint.to_bson());
    }

    let mut command = doc! {
        "delete": collection,
        "deletes": [statement],
        "ordered": options.ordered,
    };

    if let Some(ref write_concern) = options.write_concern {
        command.insert("writeConcern", write_concern.clone());
    }
    // comment is a command-level field for delete
    if let Some(ref comment) = options.comment {
        command.insert("comment", comment.clone());
    }

    command
}

/// Build a `getMore` command for an open cursor.
///
/// Servers accept `maxTimeMS` on `getMore` only for tailable await-data
/// cursors, which `find` never opens, so it is not sent here.
pub fn get_more(id: CursorId, collection: &str, batch_size: Option<u32>) -> Result<Document> {
    let mut command = doc! {
        "getMore": id.get(),
        "collection": collection,
    };

    if let Some(batch_size) = batch_size {
        command.insert("batchSize", to_i32("batchSize", batch_size)?);
    }

    Ok(command)
}

/// Build a `killCursors` command.
pub fn kill_cursors(collection: &str, ids: &[CursorId]) -> Document {
    let cursors: Vec<Bson> = ids.iter().map(|id| Bson::Int64(id.get())).collect();
    doc! {
        "killCursors": collection,
        "cursors": cursors,
    }
}

fn to_i64(field: &str, value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| out_of_range(field, "at most i64::MAX"))
}

fn to_i32(field: &str, value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| out_of_range(field, "at most i32::MAX"))
}

fn out_of_range(field: &str, expected: &str) -> crate::error::FacadeError {
    ArgumentError::InvalidOption {
        field: field.to_string(),
        expected: expected.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FacadeError;
    use crate::options::Hint;

    #[test]
    fn test_find_defaults() {
        let command = find(
            "users",
            Some(doc! { "age": { "$gt": 21 } }),
            &FindOptions::default(),
            &CursorConfig::default(),
        )
        .unwrap();

        assert_eq!(
            command,
            doc! {
                "find": "users",
                "filter": { "age": { "$gt": 21 } },
                "batchSize": 1,
                "noCursorTimeout": true,
            }
        );
    }

    #[test]
    fn test_find_without_filter_omits_field() {
        let command = find("users", None, &FindOptions::default(), &CursorConfig::default()).unwrap();
        assert!(!command.contains_key("filter"));
    }

    #[test]
    fn test_find_forwards_options() {
        let options = FindOptions {
            projection: Some(doc! { "name": 1 }),
            sort: Some(doc! { "name": 1 }),
            skip: Some(5),
            limit: Some(10),
            hint: Some(Hint::from("name_1")),
            comment: Some(Bson::String("report".to_string())),
            max_time_ms: Some(500),
            no_cursor_timeout: Some(false),
            ..Default::default()
        };
        let command = find("users", None, &options, &CursorConfig::default()).unwrap();

        assert_eq!(command.get_i64("skip").unwrap(), 5);
        assert_eq!(command.get_i64("limit").unwrap(), 10);
        assert_eq!(command.get_str("hint").unwrap(), "name_1");
        assert_eq!(command.get_str("comment").unwrap(), "report");
        assert_eq!(command.get_i64("maxTimeMS").unwrap(), 500);
        assert!(!command.get_bool("noCursorTimeout").unwrap());
        assert_eq!(command.get_document("projection").unwrap(), &doc! { "name": 1 });
    }

    #[test]
    fn test_find_initial_batch_from_config() {
        let cursor = CursorConfig {
            initial_batch_size: 50,
            ..Default::default()
        };
        let command = find("users", None, &FindOptions::default(), &cursor).unwrap();
        assert_eq!(command.get_i32("batchSize").unwrap(), 50);
    }

    #[test]
    fn test_insert_omits_absent_passthrough() {
        let command = insert(
            "users",
            &[doc! { "_id": 1, "name": "a" }],
            &InsertOptions::default(),
        );

        assert_eq!(
            command,
            doc! {
                "insert": "users",
                "documents": [{ "_id": 1, "name": "a" }],
                "ordered": true,
            }
        );
    }

    #[test]
    fn test_insert_passthrough() {
        let options = InsertOptions {
            ordered: false,
            write_concern: Some(doc! { "w": 1, "j": true }),
            bypass_document_validation: Some(true),
            comment: Some(Bson::String("load".to_string())),
        };
        let command = insert("users", &[doc! { "_id": 1 }], &options);

        assert!(!command.get_bool("ordered").unwrap());
        assert_eq!(
            command.get_document("writeConcern").unwrap(),
            &doc! { "w": 1, "j": true }
        );
        assert!(command.get_bool("bypassDocumentValidation").unwrap());
        assert_eq!(command.get_str("comment").unwrap(), "load");
    }

    #[test]
    fn test_delete_statement_shape() {
        let options = DeleteOptions {
            limit: 1,
            collation: Some(doc! { "locale": "en" }),
            hint: Some(Hint::from(doc! { "status": 1 })),
            ordered: false,
            write_concern: Some(doc! { "w": "majority" }),
            comment: Some(Bson::String("cleanup".to_string())),
        };
        let command = delete("users", doc! { "status": "D" }, &options);

        assert_eq!(
            command,
            doc! {
                "delete": "users",
                "deletes": [{
                    "q": { "status": "D" },
                    "limit": 1i64,
                    "collation": { "locale": "en" },
                    "hint": { "status": 1 },
                }],
                "ordered": false,
                "writeConcern": { "w": "majority" },
                "comment": "cleanup",
            }
        );
    }

    #[test]
    fn test_get_more_and_kill_cursors() {
        let id = CursorId::new(42);
        assert_eq!(
            get_more(id, "users", Some(100)).unwrap(),
            doc! { "getMore": 42i64, "collection": "users", "batchSize": 100 }
        );
        assert_eq!(
            get_more(id, "users", None).unwrap(),
            doc! { "getMore": 42i64, "collection": "users" }
        );
        assert_eq!(
            kill_cursors("users", &[id]),
            doc! { "killCursors": "users", "cursors": [42i64] }
        );
    }

    #[test]
    fn test_out_of_range_numbers_are_rejected() {
        let options = FindOptions {
            skip: Some(u64::MAX),
            ..Default::default()
        };
        let err = find("users", None, &options, &CursorConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            FacadeError::Argument(ArgumentError::InvalidOption { ref field, .. }) if field == "skip"
        ));

        let options = FindOptions {
            max_time_ms: Some(u64::MAX),
            ..Default::default()
        };
        assert!(find("users", None, &options, &CursorConfig::default()).is_err());

        let cursor = CursorConfig {
            initial_batch_size: u32::MAX,
            ..Default::default()
        };
        assert!(find("users", None, &FindOptions::default(), &cursor).is_err());

        assert!(get_more(CursorId::new(1), "users", Some(u32::MAX)).is_err());
    }
}
