//! Logging setup
//!
//! Installs a `tracing_subscriber` fmt subscriber. The configured level is
//! the default directive; `RUST_LOG` directives, when set, take precedence.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{FacadeError, Result};

/// Install the global subscriber
///
/// Fails if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = if config.timestamps {
        subscriber.try_init()
    } else {
        subscriber.without_time().try_init()
    };

    installed.map_err(|e| FacadeError::Generic(format!("failed to initialize logging: {e}")))
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    let level = LevelFilter::from_level(config.level.to_tracing_level());
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}
