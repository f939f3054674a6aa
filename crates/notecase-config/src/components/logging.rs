//! Logging component configuration

use serde::{Deserialize, Serialize};

use crate::{ConfigError, ConfigResult};

const LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human oriented
    Pretty,
    /// Single line per event
    #[default]
    Compact,
    /// Newline-delimited JSON
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level, or a full `EnvFilter` directive such as `notecase_fs=debug,info`
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl LoggingConfig {
    pub(crate) fn validate(&self) -> ConfigResult<()> {
        // Directive strings are checked by the subscriber; a bare word must be a level.
        let level = self.level.trim();
        if level.is_empty() {
            return Err(ConfigError::Validation("logging.level must not be empty".into()));
        }
        if !level.contains(['=', ',']) && !LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level '{level}' is not one of {}",
                LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}
