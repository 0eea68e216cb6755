use std::fmt;

use serde::{Deserialize, Serialize};

use super::kinds::{ArgumentError, CommandError, FacadeError, TransportError};

/// Structured error information extracted from facade and driver errors.
///
/// This is intended to be serialized to JSON and consumed by other
/// components (e.g. structured logs).
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub(crate) error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
}

impl ErrorInfo {
    /// Summarize any facade error.
    pub fn from_error(error: &FacadeError) -> Self {
        match error {
            FacadeError::MongoDb(e) => extract_error_info(e),
            FacadeError::Command(CommandError::Server {
                code,
                code_name,
                message,
            }) => {
                let name = code_name.clone().or_else(|| get_error_name(*code));
                simplify(ErrorInfo {
                    error_type: Some("mongo.command_error".to_string()),
                    code: Some(*code),
                    name,
                    message: Some(message.clone()),
                })
            }
            FacadeError::Command(e @ CommandError::MalformedResponse(_)) => ErrorInfo {
                error_type: Some("mongo.malformed_response".to_string()),
                message: Some(e.to_string()),
                ..Default::default()
            },
            FacadeError::Transport(e) => ErrorInfo {
                error_type: Some(transport_type(e).to_string()),
                message: Some(e.to_string()),
                ..Default::default()
            },
            FacadeError::Argument(e) => ErrorInfo {
                error_type: Some(argument_type(e).to_string()),
                message: Some(e.to_string()),
                ..Default::default()
            },
            other => ErrorInfo {
                message: Some(other.to_string()),
                ..Default::default()
            },
        }
    }

    /// Error code, when the server reported one.
    pub fn code(&self) -> Option<i32> {
        self.code
    }

    /// Human-readable error name, when known.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Convert error info to pretty-printed JSON string.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Convert error info to compact JSON string (single line).
    pub fn to_json_compact(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn transport_type(error: &TransportError) -> &'static str {
    match error {
        TransportError::ServerSelection(_) => "mongo.server_selection_error",
        TransportError::Timeout => "mongo.timeout",
        _ => "mongo.transport_error",
    }
}

fn argument_type(error: &ArgumentError) -> &'static str {
    match error {
        ArgumentError::UnknownOption { .. } | ArgumentError::InvalidOption { .. } => {
            "facade.invalid_option"
        }
        _ => "mongo.invalid_argument",
    }
}

/// Format MongoDB error messages as pretty JSON wrapped in an `error` field.
///
/// Used by the `Display` implementation of `FacadeError::MongoDb`.
pub fn format_mongodb_error(
    f: &mut fmt::Formatter<'_>,
    error: &mongodb::error::Error,
) -> fmt::Result {
    let info = extract_error_info(error);

    let wrapper = serde_json::json!({ "error": info });

    let json_output = serde_json::to_string_pretty(&wrapper).map_err(|_| fmt::Error)?;
    write!(f, "\n{json_output}")
}

/// Extract structured information from a MongoDB error using the driver API.
pub fn extract_error_info(error: &mongodb::error::Error) -> ErrorInfo {
    use mongodb::error::ErrorKind;

    let mut info = ErrorInfo::default();

    match error.kind.as_ref() {
        ErrorKind::Command(command_error) => {
            info.error_type = Some("mongo.command_error".to_string());
            info.code = Some(command_error.code);
            info.message = Some(command_error.message.clone());
            info.name = get_error_name(command_error.code);
        }
        ErrorKind::Authentication { message, .. } => {
            info.error_type = Some("mongo.authentication_error".to_string());
            info.message = Some(message.clone());
        }
        ErrorKind::InvalidArgument { message, .. } => {
            info.error_type = Some("mongo.invalid_argument".to_string());
            info.message = Some(message.clone());
        }
        ErrorKind::ServerSelection { message, .. } => {
            info.error_type = Some("mongo.server_selection_error".to_string());
            info.message = Some(message.clone());
        }
        _ => {
            info.message = Some(error.to_string());
        }
    }

    simplify(info)
}

fn simplify(mut info: ErrorInfo) -> ErrorInfo {
    if let Some(code) = info.code {
        if code == 11000 || code == 11001 {
            info.message = Some("Duplicate key error".to_string());
        }
    }
    info
}

/// Get a human-readable error name from a MongoDB error code.
fn get_error_name(code: i32) -> Option<String> {
    let name = match code {
        11000 | 11001 => "DuplicateKey",
        2 => "BadValue",
        9 => "FailedToParse",
        13 => "Unauthorized",
        18 => "AuthenticationFailed",
        26 => "NamespaceNotFound",
        43 => "CursorNotFound",
        50 => "MaxTimeMSExpired",
        121 => "DocumentValidationFailure",
        _ => return None,
    };

    Some(name.to_string())
}
