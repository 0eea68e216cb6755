use std::{fmt, io};

use crate::error::mongo::format_mongodb_error;

/// Crate-wide `Result` type using [`FacadeError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, FacadeError>;

/// Top-level error type for facade operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used throughout the crate.
#[derive(Debug)]
pub enum FacadeError {
    /// The dispatcher could not reach or talk to the server.
    Transport(TransportError),

    /// The server rejected a command or returned an unusable response.
    Command(CommandError),

    /// Caller-supplied options or documents are unusable.
    Argument(ArgumentError),

    /// Cursor iteration errors.
    Cursor(CursorError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// Driver errors that do not map onto a more specific kind.
    MongoDb(mongodb::error::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Transport-level errors.
#[derive(Debug)]
pub enum TransportError {
    /// No client has been established yet.
    NotConnected,

    /// Failed to establish a connection.
    ConnectionFailed(String),

    /// The server did not answer in time.
    Timeout,

    /// Network failure while a command was in flight.
    Network(String),

    /// No suitable server could be selected.
    ServerSelection(String),
}

/// Command-level errors reported by (or about) the server.
#[derive(Debug)]
pub enum CommandError {
    /// The server answered with `ok: 0`.
    Server {
        code: i32,
        code_name: Option<String>,
        message: String,
    },

    /// The response lacked a field the operation depends on, or had the wrong shape.
    MalformedResponse(String),
}

/// Errors caused by caller-supplied arguments.
#[derive(Debug)]
pub enum ArgumentError {
    /// An options document carried a field the operation does not recognize.
    UnknownOption { operation: String, field: String },

    /// An option was present with a value of the wrong type or range.
    InvalidOption { field: String, expected: String },

    /// A document could not be encoded.
    InvalidDocument(String),

    /// `insert_many` was called without documents.
    EmptyInsert,

    /// The driver refused an argument before sending it.
    Rejected(String),
}

/// Cursor-specific errors.
#[derive(Debug)]
pub enum CursorError {
    /// A returned document could not be decoded into the requested type.
    Decode(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for FacadeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacadeError::Transport(e) => write!(f, "Transport error: {e}"),
            FacadeError::Command(e) => write!(f, "Command error: {e}"),
            FacadeError::Argument(e) => write!(f, "Argument error: {e}"),
            FacadeError::Cursor(e) => write!(f, "Cursor error: {e}"),
            FacadeError::Config(e) => write!(f, "Configuration error: {e}"),
            FacadeError::Io(e) => write!(f, "I/O error: {e}"),
            FacadeError::MongoDb(e) => format_mongodb_error(f, e),
            FacadeError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::NotConnected => write!(f, "Not connected to MongoDB"),
            TransportError::ConnectionFailed(msg) => write!(f, "Failed to connect: {msg}"),
            TransportError::Timeout => write!(f, "Operation timed out"),
            TransportError::Network(msg) => write!(f, "Network failure: {msg}"),
            TransportError::ServerSelection(msg) => write!(f, "Server selection failed: {msg}"),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Server {
                code,
                code_name: Some(name),
                message,
            } => write!(f, "{message} ({name}, code {code})"),
            CommandError::Server {
                code,
                code_name: None,
                message,
            } => write!(f, "{message} (code {code})"),
            CommandError::MalformedResponse(msg) => write!(f, "Malformed response: {msg}"),
        }
    }
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentError::UnknownOption { operation, field } => {
                write!(f, "Unknown option '{field}' for {operation}")
            }
            ArgumentError::InvalidOption { field, expected } => {
                write!(f, "Option '{field}' must be {expected}")
            }
            ArgumentError::InvalidDocument(msg) => write!(f, "Invalid document: {msg}"),
            ArgumentError::EmptyInsert => write!(f, "insertMany requires at least one document"),
            ArgumentError::Rejected(msg) => write!(f, "Invalid argument: {msg}"),
        }
    }
}

impl fmt::Display for CursorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorError::Decode(msg) => write!(f, "Failed to decode document: {msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for FacadeError {}
impl std::error::Error for TransportError {}
impl std::error::Error for CommandError {}
impl std::error::Error for ArgumentError {}
impl std::error::Error for CursorError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to FacadeError ========================= */

impl From<io::Error> for FacadeError {
    fn from(err: io::Error) -> Self {
        FacadeError::Io(err)
    }
}

/// Classify a driver error into the facade taxonomy.
///
/// Kinds without a natural counterpart are kept whole in [`FacadeError::MongoDb`].
impl From<mongodb::error::Error> for FacadeError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        match err.kind.as_ref() {
            ErrorKind::Io(io_err) if io_err.kind() == io::ErrorKind::TimedOut => {
                TransportError::Timeout.into()
            }
            ErrorKind::Io(io_err) => TransportError::Network(io_err.to_string()).into(),
            ErrorKind::ConnectionPoolCleared { message, .. } => {
                TransportError::Network(message.clone()).into()
            }
            ErrorKind::ServerSelection { message, .. } => {
                TransportError::ServerSelection(message.clone()).into()
            }
            ErrorKind::Command(command_error) => CommandError::Server {
                code: command_error.code,
                code_name: Some(command_error.code_name.clone())
                    .filter(|name| !name.is_empty()),
                message: command_error.message.clone(),
            }
            .into(),
            ErrorKind::InvalidArgument { message, .. } => {
                ArgumentError::Rejected(message.clone()).into()
            }
            _ => FacadeError::MongoDb(err),
        }
    }
}

impl From<bson::de::Error> for FacadeError {
    fn from(err: bson::de::Error) -> Self {
        FacadeError::Cursor(CursorError::Decode(err.to_string()))
    }
}

impl From<bson::ser::Error> for FacadeError {
    fn from(err: bson::ser::Error) -> Self {
        FacadeError::Argument(ArgumentError::InvalidDocument(err.to_string()))
    }
}

impl From<toml::de::Error> for FacadeError {
    fn from(err: toml::de::Error) -> Self {
        FacadeError::Config(ConfigError::InvalidFormat(err.to_string()))
    }
}

impl From<toml::ser::Error> for FacadeError {
    fn from(err: toml::ser::Error) -> Self {
        FacadeError::Config(ConfigError::InvalidFormat(err.to_string()))
    }
}

impl From<TransportError> for FacadeError {
    fn from(err: TransportError) -> Self {
        FacadeError::Transport(err)
    }
}

impl From<CommandError> for FacadeError {
    fn from(err: CommandError) -> Self {
        FacadeError::Command(err)
    }
}

impl From<ArgumentError> for FacadeError {
    fn from(err: ArgumentError) -> Self {
        FacadeError::Argument(err)
    }
}

impl From<CursorError> for FacadeError {
    fn from(err: CursorError) -> Self {
        FacadeError::Cursor(err)
    }
}

impl From<ConfigError> for FacadeError {
    fn from(err: ConfigError) -> Self {
        FacadeError::Config(err)
    }
}

impl From<String> for FacadeError {
    fn from(msg: String) -> Self {
        FacadeError::Generic(msg)
    }
}

impl From<&str> for FacadeError {
    fn from(msg: &str) -> Self {
        FacadeError::Generic(msg.to_owned())
    }
}
