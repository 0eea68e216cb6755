//! Configuration management for the collection facade
//!
//! This module handles loading, parsing, and managing configuration from various sources:
//! - Configuration files (TOML format)
//! - Environment variables
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Prefix shared by all environment overrides.
pub const ENV_PREFIX: &str = "MONGO_FACADE_";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Cursor batching configuration
    #[serde(default)]
    pub cursor: CursorConfig,

    /// Option-bag parsing configuration
    #[serde(default)]
    pub options: OptionsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection-related configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// MongoDB connection URI
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Database used when none is named explicitly
    #[serde(default = "default_database")]
    pub database: String,

    /// Connect and server-selection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Application name reported to the server
    #[serde(default)]
    pub app_name: Option<String>,
}

/// Cursor batching configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorConfig {
    /// `batchSize` of the initial `find` command
    ///
    /// Kept small so the first answer comes back fast; later batches stream
    /// through `getMore`.
    #[serde(default = "default_initial_batch_size")]
    pub initial_batch_size: u32,

    /// `batchSize` of `getMore` commands (server default when unset)
    #[serde(default)]
    pub batch_size: Option<u32>,

    /// Ask the server not to expire idle cursors
    #[serde(default = "default_no_cursor_timeout")]
    pub no_cursor_timeout: bool,
}

/// How option documents treat fields they do not recognize
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFieldPolicy {
    /// Fail with an argument error
    #[default]
    Reject,

    /// Skip the field and log it at debug level
    Ignore,
}

/// Option-bag parsing configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Policy for unrecognized option fields
    #[serde(default)]
    pub unknown_fields: UnknownFieldPolicy,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "test".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_initial_batch_size() -> u32 {
    1
}

fn default_no_cursor_timeout() -> bool {
    true
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            database: default_database(),
            timeout: default_timeout(),
            app_name: None,
        }
    }
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            initial_batch_size: default_initial_batch_size(),
            batch_size: None,
            no_cursor_timeout: default_no_cursor_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from multiple sources with proper precedence
    ///
    /// Reads the default config file when it exists, then applies
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables on top of defaults
    ///
    /// Environment variables are prefixed with `MONGO_FACADE_`.
    /// Example: `MONGO_FACADE_CONNECTION_TIMEOUT=60`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides read through `lookup`
    ///
    /// The lookup indirection keeps this testable without touching the
    /// process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(uri) = var("CONNECTION_URI") {
            self.connection.uri = uri;
        }
        if let Some(database) = var("CONNECTION_DATABASE") {
            self.connection.database = database;
        }
        if let Some(timeout) = var("CONNECTION_TIMEOUT") {
            self.connection.timeout = parse_env("connection.timeout", &timeout)?;
        }
        if let Some(app_name) = var("CONNECTION_APP_NAME") {
            self.connection.app_name = Some(app_name);
        }
        if let Some(size) = var("CURSOR_INITIAL_BATCH_SIZE") {
            self.cursor.initial_batch_size = parse_env("cursor.initial_batch_size", &size)?;
        }
        if let Some(size) = var("CURSOR_BATCH_SIZE") {
            self.cursor.batch_size = Some(parse_env("cursor.batch_size", &size)?);
        }
        if let Some(flag) = var("CURSOR_NO_CURSOR_TIMEOUT") {
            self.cursor.no_cursor_timeout = parse_env("cursor.no_cursor_timeout", &flag)?;
        }
        if let Some(policy) = var("OPTIONS_UNKNOWN_FIELDS") {
            self.options.unknown_fields = match policy.to_ascii_lowercase().as_str() {
                "reject" => UnknownFieldPolicy::Reject,
                "ignore" => UnknownFieldPolicy::Ignore,
                _ => return Err(invalid_value("options.unknown_fields", &policy)),
            };
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = LogLevel::parse(&level)
                .ok_or_else(|| invalid_value("logging.level", &level))?;
        }
        if let Some(flag) = var("LOG_TIMESTAMPS") {
            self.logging.timestamps = parse_env("logging.timestamps", &flag)?;
        }

        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - Path to default configuration file
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mongo-facade")
            .join("config.toml")
    }

    /// Save configuration to a file
    ///
    /// # Arguments
    /// * `path` - Path where to save the configuration
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let uri = &self.connection.uri;
        if !(uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://")) {
            return Err(invalid_value("connection.uri", uri));
        }

        if self.connection.database.is_empty() {
            return Err(invalid_value("connection.database", ""));
        }

        if self.connection.timeout == 0 {
            return Err(invalid_value("connection.timeout", "0"));
        }

        if self.cursor.initial_batch_size > i32::MAX as u32 {
            return Err(invalid_value(
                "cursor.initial_batch_size",
                &self.cursor.initial_batch_size.to_string(),
            ));
        }

        if let Some(size) = self.cursor.batch_size {
            if size == 0 || size > i32::MAX as u32 {
                return Err(invalid_value("cursor.batch_size", &size.to_string()));
            }
        }

        Ok(())
    }

    /// Get connection timeout as Duration
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.timeout)
    }
}

impl LogLevel {
    /// Parse a level name, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn parse_env<T: std::str::FromStr>(field: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| invalid_value(field, value))
}

fn invalid_value(field: &str, value: &str) -> crate::error::FacadeError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}
