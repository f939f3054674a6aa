use std::io::Write;

use anyhow::{Context, Result};
use notecase_storage::DaoSet;

pub fn list(daos: &DaoSet, out: &mut impl Write) -> Result<()> {
    let tags = daos.tags.fetch_all_tags().context("Failed to list tags")?;
    for tag in &tags {
        let Some(id) = tag.id.as_deref() else { continue };
        let count = daos
            .tags
            .fetch_all_notes_with_tag(id)
            .with_context(|| format!("Failed to count notes tagged '{}'", tag.title))?
            .len();
        writeln!(out, "{}  {count}", tag.title)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::cli::Commands;
    use crate::commands::test_support::{fs_store, run};

    fn note(title: &str, tags: &[&str]) -> Commands {
        Commands::NewNote {
            title: title.into(),
            folder: None,
            content: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_tags_with_counts() {
        let (_dir, daos) = fs_store();
        run(&daos, note("A", &["urgent", "home"]));
        run(&daos, note("B", &["urgent"]));

        let listing = run(&daos, Commands::Tags);
        let lines: Vec<_> = listing.lines().collect();
        assert_eq!(lines, ["home  1", "urgent  2"]);
    }
}
