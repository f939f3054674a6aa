//! Configuration loading
//!
//! Files are parsed by extension (`.toml`, `.yaml`/`.yml`). Environment
//! variables are applied last so they win over file values.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{BackendKind, ConfigError, ConfigResult, NotecaseConfig};

/// Environment variable selecting the backend
pub const ENV_BACKEND: &str = "NOTECASE_BACKEND";
/// Environment variable overriding the SQLite database path
pub const ENV_DB_PATH: &str = "NOTECASE_DB_PATH";
/// Environment variable overriding the filesystem root
pub const ENV_ROOT: &str = "NOTECASE_ROOT";
/// Environment variable overriding the log level/filter
pub const ENV_LOG: &str = "NOTECASE_LOG";

/// Loads [`NotecaseConfig`] from files and the environment
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration
    ///
    /// With an explicit path the file must exist. Without one, the default
    /// location is used when present, otherwise defaults apply. Environment
    /// overrides are applied and the result is validated.
    pub fn load(path: Option<&Path>) -> ConfigResult<NotecaseConfig> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::default_config_path().filter(|p| p.exists()) {
                Some(default_path) => Self::load_from_file(&default_path)?,
                None => {
                    debug!("No config file found, using defaults");
                    NotecaseConfig::default()
                }
            },
        };

        Self::apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a single config file without applying overrides
    pub fn load_from_file(path: &Path) -> ConfigResult<NotecaseConfig> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let config = Self::parse_str(&raw, &extension).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;

        info!(path = %path.display(), backend = %config.storage.backend, "Loaded configuration");
        Ok(config)
    }

    /// Parse config text in the given format (`toml`, `yaml`, `yml`)
    pub fn parse_str(raw: &str, format: &str) -> ConfigResult<NotecaseConfig> {
        match format {
            #[cfg(feature = "toml")]
            "toml" => toml::from_str(raw).map_err(|e| ConfigError::Parse {
                path: PathBuf::new(),
                message: e.to_string(),
            }),
            #[cfg(feature = "yaml")]
            "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| ConfigError::Parse {
                path: PathBuf::new(),
                message: e.to_string(),
            }),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    /// `<config_dir>/notecase/config.toml`, if a config dir exists on this platform
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("notecase").join("config.toml"))
    }

    /// Apply `NOTECASE_*` variables from the process environment
    pub fn apply_env_overrides(config: &mut NotecaseConfig) -> ConfigResult<()> {
        Self::apply_overrides_from(config, |key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in production)
    pub fn apply_overrides_from<F>(config: &mut NotecaseConfig, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup(ENV_BACKEND) {
            config.storage.backend = backend.parse::<BackendKind>()?;
            debug!(backend = %config.storage.backend, "Backend overridden from environment");
        }
        if let Some(db_path) = lookup(ENV_DB_PATH) {
            config.storage.sqlite.path = PathBuf::from(db_path);
        }
        if let Some(root) = lookup(ENV_ROOT) {
            config.storage.filesystem.root = PathBuf::from(root);
        }
        if let Some(level) = lookup(ENV_LOG) {
            config.logging.level = level;
        }
        Ok(())
    }
}
