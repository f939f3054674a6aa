use std::io::Write;

use anyhow::{Context, Result};
use notecase_core::{Folder, Hierarchy, Node};
use notecase_storage::DaoSet;

pub fn tree(daos: &DaoSet, out: &mut impl Write) -> Result<()> {
    let hierarchy = daos
        .folders
        .fetch_all_folders_as_tree()
        .context("Failed to load folders")?;
    if hierarchy.is_empty() {
        writeln!(out, "(no folders)")?;
        return Ok(());
    }
    for root in hierarchy.roots() {
        print_node(&hierarchy, root, 0, out)?;
    }
    Ok(())
}

fn print_node(hierarchy: &Hierarchy, node: &Node, depth: usize, out: &mut impl Write) -> Result<()> {
    let Some(id) = node.id() else { return Ok(()) };
    let path = hierarchy.path_of(id).unwrap_or_default();
    writeln!(out, "{:indent$}{}  {}  [{}]", "", node.title(), path, id, indent = depth * 2)?;
    for child in hierarchy.children_of(id) {
        print_node(hierarchy, child, depth + 1, out)?;
    }
    Ok(())
}

pub fn create(daos: &DaoSet, title: &str, parent: Option<String>, out: &mut impl Write) -> Result<()> {
    let mut folder = Folder::new(title);
    folder.parent_id = parent;
    let id = daos
        .folders
        .create_folder(&mut folder)
        .with_context(|| format!("Failed to create folder '{title}'"))?;
    let path = daos.folders.get_path_folder(&id)?;
    writeln!(out, "Created folder {path} [{id}]")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::cli::Commands;
    use crate::commands::test_support::{fs_store, run};

    #[test]
    fn test_tree_shows_paths() {
        let (_dir, daos) = fs_store();
        run(&daos, Commands::NewFolder { title: "Work".into(), parent: None });
        let created = run(
            &daos,
            Commands::NewFolder {
                title: "Reports".into(),
                parent: Some("Work".into()),
            },
        );
        assert_eq!(created.trim(), "Created folder /Work/Reports [Work/Reports]");

        let tree = run(&daos, Commands::Tree);
        let lines: Vec<_> = tree.lines().collect();
        assert_eq!(lines, ["Work  /Work  [Work]", "  Reports  /Work/Reports  [Work/Reports]"]);
    }

    #[test]
    fn test_empty_tree() {
        let (_dir, daos) = fs_store();
        assert_eq!(run(&daos, Commands::Tree).trim(), "(no folders)");
    }
}
