//! Command handlers
//!
//! Each handler writes plain text to `out`; errors carry context and end up
//! as a non-zero exit in `main`.

use std::io::Write;

use anyhow::Result;
use notecase_storage::DaoSet;

use crate::cli::Commands;

pub mod folders;
pub mod notes;
pub mod tags;
pub mod trash;

pub fn execute(daos: &DaoSet, command: Commands, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Tree => folders::tree(daos, out),
        Commands::NewFolder { title, parent } => folders::create(daos, &title, parent, out),
        Commands::Ls { folder } => notes::list(daos, folder.as_deref(), out),
        Commands::Show { id } => notes::show(daos, &id, out),
        Commands::NewNote {
            title,
            folder,
            content,
            tags,
        } => notes::create(daos, &title, folder, &content, &tags, out),
        Commands::Rm { id, permanent } => notes::remove(daos, &id, permanent, out),
        Commands::Trash => trash::list(daos, out),
        Commands::Restore { id } => trash::restore(daos, &id, out),
        Commands::Tags => tags::list(daos, out),
    }
}
