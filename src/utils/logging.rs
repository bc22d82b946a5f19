//! Structured logging setup.

use tracing::info;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};

/// Install a global `tracing` subscriber from `config`.
///
/// `RUST_LOG` directives take precedence over the configured level. Fails if
/// a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.log_level).into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| {
        ProtocolError::ConfigError(format!("Failed to install tracing subscriber: {e}"))
    })?;

    info!(app = %config.app_name, "Logging initialized");
    Ok(())
}
