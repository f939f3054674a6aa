//! Composition root for notecase storage
//!
//! Callers pick a backend once and get back a [`DaoSet`]; nothing above this
//! crate names a concrete DAO type.
//!
//! ```no_run
//! use notecase_config::StorageConfig;
//! use notecase_storage::StorageFactory;
//!
//! let daos = StorageFactory::from_config(&StorageConfig::filesystem("notes"))?;
//! let folders = daos.folders.fetch_all_folders_as_list()?;
//! # Ok::<(), notecase_core::StorageError>(())
//! ```

pub mod factory;

pub use factory::{BackendInit, DaoSet, StorageFactory};
pub use notecase_config::BackendKind;
