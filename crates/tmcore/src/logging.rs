//! Structured logging setup.
//!
//! The library only emits `tracing` events. Binaries call [`init_logging`]
//! once at startup to install a subscriber writing to stderr.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Result, TmError};

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(config: &LoggingConfig) -> String {
    format!("tmcore={}", config.level)
}

/// Installs the global subscriber. `RUST_LOG` overrides the configured level.
///
/// Fails if a subscriber is already installed or the level does not parse.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter(config))
            .map_err(|e| TmError::Config(format!("invalid log level '{}': {}", config.level, e)))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .try_init()
    };
    installed.map_err(|e| TmError::Config(format!("logging already initialised: {}", e)))
}
