use std::io::Write;

use anyhow::{Context, Result};
use notecase_storage::DaoSet;
use tracing::debug;

pub fn list(daos: &DaoSet, out: &mut impl Write) -> Result<()> {
    let folders = daos.folders.fetch_trash_folders().context("Failed to list trashed folders")?;
    let notes = daos.notes.fetch_trash_notes().context("Failed to list trashed notes")?;
    if folders.is_empty() && notes.is_empty() {
        writeln!(out, "(trash is empty)")?;
        return Ok(());
    }

    for folder in &folders {
        let when = folder.deleted_date.map(|d| d.to_rfc3339()).unwrap_or_default();
        writeln!(out, "folder  {}  [{}]  {when}", folder.title, folder.id.as_deref().unwrap_or_default())?;
    }
    for note in &notes {
        let when = note.deleted_date.map(|d| d.to_rfc3339()).unwrap_or_default();
        writeln!(out, "note    {}  [{}]  {when}", note.title, note.id.as_deref().unwrap_or_default())?;
    }
    Ok(())
}

/// Restore `id` as a note, falling back to a folder when no note matches
pub fn restore(daos: &DaoSet, id: &str, out: &mut impl Write) -> Result<()> {
    let restored = match daos.notes.restore_note(id) {
        Ok(restored) => restored,
        Err(e) if e.is_not_found() => {
            debug!(id, "No trashed note with this id, trying folders");
            daos.folders
                .restore_folder(id)
                .with_context(|| format!("Nothing in the trash matches '{id}'"))?
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to restore '{id}'")),
    };
    writeln!(out, "Restored [{restored}]")?;
    Ok(())
}
