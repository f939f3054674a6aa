//! Configuration components
//!
//! One module per concern; the top-level [`NotecaseConfig`] ties them together.

pub mod logging;
pub mod storage;

pub use logging::*;
pub use storage::*;

use serde::{Deserialize, Serialize};

use crate::ConfigResult;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotecaseConfig {
    /// Storage backend selection and options
    pub storage: StorageConfig,
    /// Logging options (used by binaries that install a subscriber)
    pub logging: LoggingConfig,
}

impl NotecaseConfig {
    /// Validate every component
    pub fn validate(&self) -> ConfigResult<()> {
        self.storage.validate()?;
        self.logging.validate()
    }
}
