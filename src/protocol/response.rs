//! Helpers for reading command responses

use mongodb::bson::{Bson, Document};

use crate::error::{CommandError, Result};

/// Check the `ok` field of a raw command response.
///
/// Dispatchers that talk to the server without going through the driver's
/// command helpers use this to turn `ok: 0` into [`CommandError::Server`].
pub fn ensure_ok(response: Document) -> Result<Document> {
    let ok = match response.get("ok") {
        Some(value) => numeric(value),
        None => {
            return Err(CommandError::MalformedResponse("missing 'ok' field".to_string()).into());
        }
    };

    if ok == Some(1.0) {
        return Ok(response);
    }

    let code = response
        .get("code")
        .and_then(numeric)
        .map(|c| c as i32)
        .unwrap_or(0);
    let code_name = response.get_str("codeName").ok().map(str::to_string);
    let message = response
        .get_str("errmsg")
        .unwrap_or("command failed")
        .to_string();

    Err(CommandError::Server {
        code,
        code_name,
        message,
    }
    .into())
}

/// Read an affected-document count such as `n`.
///
/// Unacknowledged writes come back without a count; that reads as zero.
pub fn read_count(response: &Document, field: &str) -> Result<u64> {
    match response.get(field) {
        None => Ok(0),
        Some(value) => match numeric(value) {
            Some(n) if n >= 0.0 => Ok(n as u64),
            _ => Err(CommandError::MalformedResponse(format!(
                "field '{field}' is not a non-negative number: {value}"
            ))
            .into()),
        },
    }
}

/// Number of per-document write errors in a write response.
pub fn write_error_count(response: &Document) -> usize {
    response
        .get_array("writeErrors")
        .map(|errors| errors.len())
        .unwrap_or(0)
}

/// Whether the response carries a write concern error.
pub fn has_write_concern_error(response: &Document) -> bool {
    response.contains_key("writeConcernError")
}

fn numeric(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(*v as f64),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        Bson::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FacadeError;
    use mongodb::bson::doc;

    #[test]
    fn test_ensure_ok_accepts_double_and_int() {
        assert!(ensure_ok(doc! { "ok": 1.0 }).is_ok());
        assert!(ensure_ok(doc! { "ok": 1 }).is_ok());
    }

    #[test]
    fn test_ensure_ok_reports_server_error() {
        let err = ensure_ok(doc! {
            "ok": 0.0,
            "errmsg": "ns does not exist",
            "code": 26,
            "codeName": "NamespaceNotFound",
        })
        .unwrap_err();

        match err {
            FacadeError::Command(CommandError::Server {
                code,
                code_name,
                message,
            }) => {
                assert_eq!(code, 26);
                assert_eq!(code_name.as_deref(), Some("NamespaceNotFound"));
                assert_eq!(message, "ns does not exist");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_ensure_ok_missing_field() {
        assert!(matches!(
            ensure_ok(doc! { "n": 1 }),
            Err(FacadeError::Command(CommandError::MalformedResponse(_)))
        ));
    }

    #[test]
    fn test_read_count_variants() {
        assert_eq!(read_count(&doc! { "n": 3 }, "n").unwrap(), 3);
        assert_eq!(read_count(&doc! { "n": 4i64 }, "n").unwrap(), 4);
        assert_eq!(read_count(&doc! { "ok": 1 }, "n").unwrap(), 0);
        assert!(read_count(&doc! { "n": "three" }, "n").is_err());
        assert!(read_count(&doc! { "n": -1 }, "n").is_err());
    }

    #[test]
    fn test_write_error_count() {
        let response = doc! {
            "n": 1,
            "writeErrors": [
                { "index": 1, "code": 11000, "errmsg": "E11000 duplicate key error" }
            ],
            "ok": 1,
        };
        assert_eq!(write_error_count(&response), 1);
        assert_eq!(write_error_count(&doc! { "n": 1, "ok": 1 }), 0);
        assert!(!has_write_concern_error(&response));
    }
}
