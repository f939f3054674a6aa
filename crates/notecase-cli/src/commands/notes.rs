use std::io::Write;

use anyhow::{bail, Context, Result};
use notecase_core::{Note, Tag, ROOT_FOLDER_ID};
use notecase_storage::DaoSet;

pub fn list(daos: &DaoSet, folder: Option<&str>, out: &mut impl Write) -> Result<()> {
    let folder = folder.unwrap_or(ROOT_FOLDER_ID);
    let notes = daos
        .notes
        .fetch_notes_by_folder_id(folder)
        .with_context(|| format!("Failed to list notes in '{folder}'"))?;
    for note in &notes {
        writeln!(out, "{}", summary(note))?;
    }
    Ok(())
}

fn summary(note: &Note) -> String {
    let mut line = format!("{}  [{}]", note.title, note.id.as_deref().unwrap_or_default());
    if note.is_todo() {
        line.push_str("  (todo)");
    }
    let tags = note.tag_titles();
    if !tags.is_empty() {
        line.push_str(&format!("  #{}", tags.join(" #")));
    }
    line
}

pub fn show(daos: &DaoSet, id: &str, out: &mut impl Write) -> Result<()> {
    let Some(note) = daos.notes.get_note_by_id(id).with_context(|| format!("Failed to read note '{id}'"))? else {
        bail!("No note with id '{id}'");
    };
    writeln!(out, "title:    {}", note.title)?;
    writeln!(out, "id:       {id}")?;
    writeln!(out, "folder:   {}", note.parent_id.as_deref().unwrap_or(ROOT_FOLDER_ID))?;
    writeln!(out, "created:  {}", note.created_date.to_rfc3339())?;
    writeln!(out, "modified: {}", note.modified_date.to_rfc3339())?;
    if !note.tags.is_empty() {
        writeln!(out, "tags:     {}", note.tag_titles().join(", "))?;
    }
    if let Some(todo) = &note.todo {
        let state = if todo.is_completed() { "done" } else { "open" };
        writeln!(out, "todo:     {state}")?;
    }
    if note.deleted {
        writeln!(out, "deleted:  yes")?;
    }
    writeln!(out)?;
    writeln!(out, "{}", note.content)?;
    Ok(())
}

pub fn create(
    daos: &DaoSet,
    title: &str,
    folder: Option<String>,
    content: &str,
    tags: &[String],
    out: &mut impl Write,
) -> Result<()> {
    let mut note = Note::new(title, content);
    note.parent_id = folder;
    let id = daos
        .notes
        .create_note(&mut note)
        .with_context(|| format!("Failed to create note '{title}'"))?;

    for title in tags {
        let tag = match find_tag(daos, title)? {
            Some(tag) => tag,
            None => {
                let mut tag = Tag::new(title.as_str());
                daos.tags.create_tag(&mut tag)?;
                tag
            }
        };
        daos.notes
            .add_tag_to_note(&mut note, &tag)
            .with_context(|| format!("Failed to tag '{id}' with '{title}'"))?;
    }
    writeln!(out, "Created note [{id}]")?;
    Ok(())
}

fn find_tag(daos: &DaoSet, title: &str) -> Result<Option<Tag>> {
    Ok(daos.tags.fetch_all_tags()?.into_iter().find(|t| t.title == title))
}

pub fn remove(daos: &DaoSet, id: &str, permanent: bool, out: &mut impl Write) -> Result<()> {
    if permanent {
        daos.notes
            .permanently_delete_note(id)
            .with_context(|| format!("Failed to delete note '{id}'"))?;
        writeln!(out, "Deleted [{id}]")?;
    } else {
        daos.notes
            .delete_note(id)
            .with_context(|| format!("Failed to trash note '{id}'"))?;
        writeln!(out, "Moved [{id}] to the trash")?;
    }
    Ok(())
}
