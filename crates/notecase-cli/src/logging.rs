//! Subscriber setup for the binary
//!
//! Logs go to stderr so command output on stdout stays pipeable.

use anyhow::{anyhow, Context, Result};
use notecase_config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Build the filter from a bare level or a full directive string
pub fn env_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level.trim()).with_context(|| format!("Invalid log filter '{level}'"))
}

/// Install the global subscriber
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(&config.level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow!("Failed to install log subscriber: {e}"))
}
