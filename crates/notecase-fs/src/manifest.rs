//! Trash manifest
//!
//! `<trash>/.manifest.json` lists every soft-deleted entry with its original
//! id, so restore knows where to put it back and listings can tell a trashed
//! folder from a directory that only exists to hold a trashed note.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use notecase_core::naming::is_same_or_nested;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FsError, FsResult};

/// File name of the manifest inside the trash directory
pub const MANIFEST_FILE: &str = ".manifest.json";

/// Folder or note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Folder,
    Note,
}

/// One soft-deleted entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrashEntry {
    pub kind: EntryKind,
    /// Id before deletion
    pub original_id: String,
    /// Id inside the trash (`.trash/...`)
    pub trash_id: String,
    pub deleted_date: DateTime<Utc>,
}

/// On-disk list of trash entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrashManifest {
    #[serde(default)]
    pub entries: Vec<TrashEntry>,
}

impl TrashManifest {
    pub fn path(trash_dir: &Path) -> PathBuf {
        trash_dir.join(MANIFEST_FILE)
    }

    /// Load the manifest; a missing file is an empty manifest. An unparsable
    /// file is moved aside to `.manifest.json.corrupt-<stamp>` first, so the
    /// next save cannot overwrite it.
    pub fn load(trash_dir: &Path) -> FsResult<Self> {
        let path = Self::path(trash_dir);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(FsError::io(path, e)),
        };
        match serde_json::from_str(&raw) {
            Ok(manifest) => Ok(manifest),
            Err(e) => {
                let aside = path.with_file_name(format!(
                    "{MANIFEST_FILE}.corrupt-{}",
                    Utc::now().format("%Y%m%d%H%M%S%3f")
                ));
                fs::rename(&path, &aside).map_err(|e| FsError::io(&path, e))?;
                warn!(
                    path = %path.display(),
                    kept = %aside.display(),
                    error = %e,
                    "Unreadable trash manifest moved aside, starting empty"
                );
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, trash_dir: &Path) -> FsResult<()> {
        fs::create_dir_all(trash_dir).map_err(|e| FsError::io(trash_dir, e))?;
        let path = Self::path(trash_dir);
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(&path, raw).map_err(|e| FsError::io(path, e))
    }

    pub fn record(&mut self, entry: TrashEntry) {
        self.entries.retain(|e| e.trash_id != entry.trash_id);
        self.entries.push(entry);
    }

    pub fn by_trash_id(&self, trash_id: &str) -> Option<&TrashEntry> {
        self.entries.iter().find(|e| e.trash_id == trash_id)
    }

    /// Most recent entry that was deleted from `original_id`
    pub fn latest_for_original(&self, original_id: &str) -> Option<&TrashEntry> {
        self.entries
            .iter()
            .filter(|e| e.original_id == original_id)
            .max_by_key(|e| e.deleted_date)
    }

    /// Drop entries at or below `trash_id`; returns how many were removed
    pub fn forget(&mut self, trash_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !is_same_or_nested(&e.trash_id, trash_id));
        before - self.entries.len()
    }

    pub fn folders(&self) -> impl Iterator<Item = &TrashEntry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::Folder)
    }
}
