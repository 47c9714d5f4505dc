//! Logging and tracing configuration

use crate::config::LoggingConfig;
use crate::error::{ByocError, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing based on configuration. `RUST_LOG` wins over the configured level.
/// Output goes to stderr so `lookup --json` keeps stdout clean.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(env_filter);

    let initialized = match config.format.as_str() {
        "json" => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false).json())
            .try_init(),
        "pretty" => registry
            .with(fmt::layer().with_writer(std::io::stderr).pretty())
            .try_init(),
        _ => registry
            .with(fmt::layer().with_writer(std::io::stderr).compact())
            .try_init(),
    };

    initialized.map_err(|e| ByocError::Config {
        message: format!("failed to initialize tracing: {}", e),
    })
}
