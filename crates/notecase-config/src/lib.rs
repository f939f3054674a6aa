//! # notecase configuration
//!
//! Typed configuration for the notecase persistence layer: which backend to
//! use, how to open it, and how to log.
//!
//! ## Features
//!
//! - TOML and YAML files (selected by extension)
//! - `NOTECASE_*` environment overrides
//! - Validation before any storage is touched
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notecase_config::ConfigLoader;
//!
//! let config = ConfigLoader::load(None)?;
//! println!("backend = {}", config.storage.backend);
//! # Ok::<(), notecase_config::ConfigError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod components;
mod error;
mod loader;

pub use components::*;
pub use error::{ConfigError, ConfigResult};
pub use loader::*;
