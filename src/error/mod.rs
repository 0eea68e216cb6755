//! Error handling for the collection facade.
//!
//! Failures are grouped the way callers need to react to them:
//! - transport failures (the server could not be reached)
//! - command failures (the server rejected a command or answered with garbage)
//! - argument failures (caller supplied options or documents that cannot be used)
//! - cursor failures (a returned document could not be decoded)
//!
//! Driver errors coming from the `mongodb` crate are classified into the same
//! taxonomy on conversion, so code above the dispatcher only ever sees
//! [`FacadeError`].
//!
//! # Example
//!
//! ```rust,no_run
//! use mongo_facade::error::{ErrorInfo, FacadeError, Result};
//!
//! fn report(err: &FacadeError) {
//!     let info = ErrorInfo::from_error(err);
//!     println!("{}", info.to_json_compact().unwrap_or_default());
//! }
//!
//! fn example_operation() -> Result<()> {
//!     Ok(())
//! }
//! ```

pub mod kinds;
pub mod mongo;

// Re-export commonly used types
pub use kinds::{
    ArgumentError, CommandError, ConfigError, CursorError, FacadeError, Result, TransportError,
};
pub use mongo::ErrorInfo;
