//! Logging setup and the error reporting sink

use appdev_shared::{AppDevError, LoggingConfig, Result};
use tracing_subscriber::EnvFilter;

/// Destination for errors the tool reports about itself
#[cfg_attr(test, mockall::automock)]
pub trait ErrorSink: Send + Sync {
    fn log_error(&self, message: &str);
}

/// Sink emitting `tracing` error events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn log_error(&self, message: &str) {
        tracing::error!(target: "appdev", "{}", message);
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. Fails if a subscriber is
/// already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| AppDevError::Config {
            message: format!("Invalid log level '{}': {}", config.level, e),
        })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| AppDevError::Internal {
        message: format!("Failed to install tracing subscriber: {}", e),
    })
}
