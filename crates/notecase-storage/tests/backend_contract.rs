//! Behaviour both backends must share, run against each in turn
//!
//! Where the backends legitimately differ (ids after a rename, how a duplicate
//! folder title is told apart) the test asserts each shape explicitly.

use notecase_core::{Folder, Note, StorageError, Tag};
use notecase_sqlite::SqlitePool;
use notecase_storage::{BackendInit, BackendKind, DaoSet, StorageFactory};
use tempfile::TempDir;

struct Backend {
    daos: DaoSet,
    _dir: Option<TempDir>,
}

fn sqlite() -> Backend {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let pool = SqlitePool::from_connection(conn).unwrap();
    let daos = StorageFactory::create(BackendKind::Sqlite, BackendInit::Sqlite(pool)).unwrap();
    Backend { daos, _dir: None }
}

fn filesystem() -> Backend {
    let dir = TempDir::new().unwrap();
    let init = BackendInit::FileSystem(dir.path().to_path_buf());
    let daos = StorageFactory::create(BackendKind::FileSystem, init).unwrap();
    Backend {
        daos,
        _dir: Some(dir),
    }
}

fn each_backend(check: impl Fn(&DaoSet)) {
    for backend in [sqlite(), filesystem()] {
        check(&backend.daos);
    }
}

fn new_folder(daos: &DaoSet, title: &str, parent: Option<&str>) -> String {
    let mut folder = Folder::new(title);
    folder.parent_id = parent.map(str::to_string);
    daos.folders.create_folder(&mut folder).unwrap()
}

fn new_note(daos: &DaoSet, title: &str, content: &str, folder: Option<&str>) -> String {
    let mut note = Note::new(title, content);
    note.parent_id = folder.map(str::to_string);
    daos.notes.create_note(&mut note).unwrap()
}

#[test]
fn test_note_fields_round_trip() {
    each_backend(|daos| {
        let work = new_folder(daos, "Work", None);
        let mut note = Note::new("Plan", "step one\nstep two")
            .in_folder(work.clone())
            .with_tags(["ops"]);
        note.favorite = true;
        note.pinned = true;
        note.author = Some("ana".into());
        note.source_url = Some("https://example.org".into());
        note.latitude = Some(52.52);
        note.longitude = Some(13.405);

        let id = daos.notes.create_note(&mut note).unwrap();
        let fetched = daos.notes.get_note_by_id(&id).unwrap().unwrap();

        assert_eq!(fetched, note, "{:?}", daos.kind);
        assert_eq!(fetched.parent_id.as_deref(), Some(work.as_str()));
    });
}

#[test]
fn test_todo_round_trip() {
    each_backend(|daos| {
        let mut todo = Note::todo("Call", None);
        let id = daos.notes.create_note(&mut todo).unwrap();
        let fetched = daos.notes.get_note_by_id(&id).unwrap().unwrap();
        assert!(fetched.is_todo(), "{:?}", daos.kind);
        assert_eq!(fetched.todo, todo.todo);
    });
}

#[test]
fn test_active_and_trash_partitions() {
    each_backend(|daos| {
        let keep = new_note(daos, "Keep", "", None);
        let drop = new_note(daos, "Drop", "", None);
        new_note(daos, "Other", "", None);

        daos.notes.delete_note(&drop).unwrap();

        let active = daos.notes.fetch_all_notes().unwrap();
        let trash = daos.notes.fetch_trash_notes().unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(trash.len(), 1);
        assert!(active.iter().all(|n| !n.deleted));
        assert!(trash.iter().all(|n| n.deleted && n.deleted_date.is_some()));
        assert!(active.iter().any(|n| n.id.as_deref() == Some(keep.as_str())));
    });
}

#[test]
fn test_delete_then_restore_keeps_content() {
    each_backend(|daos| {
        let work = new_folder(daos, "Work", None);
        let mut note = Note::new("Idea", "keep me").in_folder(work).with_tags(["x"]);
        note.favorite = true;
        let id = daos.notes.create_note(&mut note).unwrap();
        let before = daos.notes.get_note_by_id(&id).unwrap().unwrap();

        daos.notes.delete_note(&id).unwrap();
        let restored_id = daos.notes.restore_note(&id).unwrap();
        let after = daos.notes.get_note_by_id(&restored_id).unwrap().unwrap();

        assert_eq!(restored_id, id);
        assert_eq!(after.title, before.title);
        assert_eq!(after.content, before.content);
        assert_eq!(after.parent_id, before.parent_id);
        assert_eq!(after.tags, before.tags);
        assert_eq!(after.favorite, before.favorite);
        assert!(!after.deleted && after.deleted_date.is_none());

        // A second restore changes nothing
        assert_eq!(daos.notes.restore_note(&id).unwrap(), id);
        assert_eq!(daos.notes.fetch_all_notes().unwrap().len(), 1);
    });
}

#[test]
fn test_path_composition() {
    each_backend(|daos| {
        let a = new_folder(daos, "A", None);
        let b = new_folder(daos, "B", Some(&a));
        new_folder(daos, "C", Some(&b));
        new_folder(daos, "D", Some(&a));

        for folder in daos.folders.fetch_all_folders_as_list().unwrap() {
            let id = folder.id.clone().unwrap();
            let parent_path = match daos.folders.get_parent_folder(&id).unwrap() {
                Some(parent) => daos.folders.get_path_folder(parent.id.as_deref().unwrap()).unwrap(),
                None => String::new(),
            };
            let path = daos.folders.get_path_folder(&id).unwrap();
            assert_eq!(path, format!("{parent_path}/{}", folder.title), "{:?}", daos.kind);
        }
        assert_eq!(daos.folders.get_path_folder(&b).unwrap(), "/A/B");
    });
}

#[test]
fn test_same_title_folders_stay_distinct() {
    each_backend(|daos| {
        let first = new_folder(daos, "Work", None);
        let second = new_folder(daos, "Work", None);

        assert_ne!(first, second);
        let a = daos.folders.get_folder_by_id(&first).unwrap().unwrap();
        let b = daos.folders.get_folder_by_id(&second).unwrap().unwrap();
        match daos.kind {
            BackendKind::Sqlite => assert_eq!(a.title, b.title),
            BackendKind::FileSystem => assert_eq!(b.title, "Work (1)"),
        }
        assert_eq!(daos.folders.fetch_all_folders_as_list().unwrap().len(), 2);
    });
}

#[test]
fn test_rename_keeps_children() {
    each_backend(|daos| {
        let id = new_folder(daos, "Work", None);
        new_note(daos, "Todo", "buy milk", Some(&id));

        let mut folder = daos.folders.get_folder_by_id(&id).unwrap().unwrap();
        folder.title = "Job".into();
        daos.folders.update_folder(&mut folder).unwrap();
        let new_id = folder.id.clone().unwrap();

        match daos.kind {
            BackendKind::Sqlite => assert_eq!(new_id, id),
            BackendKind::FileSystem => assert_eq!(new_id, "Job"),
        }
        let notes = daos.notes.fetch_notes_by_folder_id(&new_id).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, "buy milk");
        assert_eq!(daos.folders.get_path_folder(&new_id).unwrap(), "/Job");
    });
}

#[test]
fn test_note_rename_keeps_content() {
    each_backend(|daos| {
        let id = new_note(daos, "Draft", "text", None);
        let mut note = daos.notes.get_note_by_id(&id).unwrap().unwrap();
        note.title = "Final".into();
        daos.notes.update_note(&mut note).unwrap();

        let new_id = note.id.clone().unwrap();
        match daos.kind {
            BackendKind::Sqlite => assert_eq!(new_id, id),
            BackendKind::FileSystem => assert_eq!(new_id, "Final.md"),
        }
        let fetched = daos.notes.get_note_by_id(&new_id).unwrap().unwrap();
        assert_eq!(fetched.title, "Final");
        assert_eq!(fetched.content, "text");
    });
}

#[test]
fn test_work_todo_scenario() {
    each_backend(|daos| {
        let work = new_folder(daos, "Work", None);
        let todo = new_note(daos, "Todo", "buy milk", Some(&work));

        let listed = daos.notes.fetch_notes_by_folder_id(&work).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Todo");
        assert_eq!(listed[0].content, "buy milk");

        daos.notes.delete_note(&todo).unwrap();
        assert!(daos.notes.fetch_all_notes().unwrap().is_empty());
        let trash = daos.notes.fetch_trash_notes().unwrap();
        assert_eq!(trash.len(), 1);

        let trash_id = trash[0].id.clone().unwrap();
        daos.notes.permanently_delete_note(&trash_id).unwrap();
        assert!(daos.notes.fetch_all_notes().unwrap().is_empty());
        assert!(daos.notes.fetch_trash_notes().unwrap().is_empty());
        assert!(daos.notes.get_note_by_id(&todo).unwrap().is_none());
        assert!(daos.notes.get_note_by_id(&trash_id).unwrap().is_none());
    });
}

#[test]
fn test_urgent_tag_scenario() {
    each_backend(|daos| {
        let mut urgent = Tag::new("urgent");
        let tag_id = daos.tags.create_tag(&mut urgent).unwrap();
        let mut a = Note::new("A", "");
        let mut b = Note::new("B", "");
        daos.notes.create_note(&mut a).unwrap();
        daos.notes.create_note(&mut b).unwrap();
        new_note(daos, "C", "", None);

        daos.notes.add_tag_to_note(&mut a, &urgent).unwrap();
        daos.notes.add_tag_to_note(&mut b, &urgent).unwrap();
        let tagged = daos.tags.fetch_all_notes_with_tag(&tag_id).unwrap();
        let titles: Vec<_> = tagged.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["A", "B"], "{:?}", daos.kind);

        daos.notes.remove_tag_from_note(&mut a, &urgent).unwrap();
        let tagged = daos.tags.fetch_all_notes_with_tag(&tag_id).unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].title, "B");
    });
}

#[test]
fn test_duplicate_tag_conflicts() {
    each_backend(|daos| {
        daos.tags.create_tag(&mut Tag::new("urgent")).unwrap();
        let err = daos.tags.create_tag(&mut Tag::new("urgent")).unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)), "{:?}", daos.kind);
        assert!(daos.tags.exists_by_title("Urgent").unwrap());
    });
}

#[test]
fn test_folder_trash_lifecycle() {
    each_backend(|daos| {
        let work = new_folder(daos, "Work", None);
        new_note(daos, "Todo", "", Some(&work));

        daos.folders.delete_folder(&work).unwrap();
        assert!(daos.folders.fetch_all_folders_as_list().unwrap().is_empty());
        assert!(daos.notes.fetch_all_notes().unwrap().is_empty());
        let trashed = daos.folders.fetch_trash_folders().unwrap();
        assert_eq!(trashed.len(), 1);

        let restored = daos.folders.restore_folder(&work).unwrap();
        assert_eq!(restored, work);
        assert_eq!(daos.notes.fetch_notes_by_folder_id(&restored).unwrap().len(), 1);

        daos.folders.permanently_delete_folder(&restored).unwrap();
        assert!(daos.folders.get_folder_by_id(&restored).unwrap().is_none());
        assert!(daos.notes.fetch_all_notes().unwrap().is_empty());
        assert!(daos.notes.fetch_trash_notes().unwrap().is_empty());
    });
}

#[test]
fn test_caller_errors_before_io() {
    each_backend(|daos| {
        let err = daos.notes.get_note_by_id("").unwrap_err();
        assert!(err.is_caller_error());
        let err = daos.folders.create_folder(&mut Folder::new("  ")).unwrap_err();
        assert!(err.is_caller_error());
        assert!(daos.notes.get_note_by_id("missing").unwrap().is_none());
    });
}

#[test]
fn test_kind_mismatch_is_not_found() {
    each_backend(|daos| {
        let work = new_folder(daos, "Work", None);
        let todo = new_note(daos, "Todo", "milk", Some(&work));

        assert!(daos.notes.permanently_delete_note(&work).unwrap_err().is_not_found());
        assert!(daos.folders.permanently_delete_folder(&todo).unwrap_err().is_not_found());

        assert!(daos.folders.get_folder_by_id(&work).unwrap().is_some());
        assert_eq!(daos.notes.get_note_by_id(&todo).unwrap().unwrap().content, "milk");
    });
}

#[test]
fn test_tree_path_matches_folder_path() {
    each_backend(|daos| {
        let a = new_folder(daos, "A", None);
        let b = new_folder(daos, "B", Some(&a));

        let tree = daos.folders.fetch_all_folders_as_tree().unwrap();
        let path = daos.folders.get_path_folder(&b).unwrap();
        assert_eq!(path, "/A/B");
        assert_eq!(tree.path_of(&b), Some(path));
    });
}
