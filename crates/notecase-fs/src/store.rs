//! Shared state of the filesystem backend
//!
//! [`FsStore`] owns the root directory, the frontmatter codec and two caches:
//!
//! - `paths`: every folder and note id with its absolute path and kind
//! - `notes`: a header-only copy of every active note (body dropped)
//!
//! Simple lookups go straight to the caches. Anything that changes the shape
//! of the tree (create, rename, move, trash, restore, purge) runs under the
//! `structure` lock, which covers the disk mutation and the cache patch
//! together. The two steps are still not crash-atomic; [`FsStore::refresh_cache`]
//! rebuilds both caches from disk and is the recovery path.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use notecase_config::FileSystemConfig;
use notecase_core::naming::{
    is_root_id, is_same_or_nested, last_segment, normalize_id, parent_of, sanitize_file_name,
    NOTE_EXTENSION,
};
use notecase_core::{
    ComponentRef, Folder, FrontmatterCodec, Note, StorageError, YamlFrontmatter,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{FsError, FsResult};
use crate::manifest::{EntryKind, TrashEntry, TrashManifest};

/// Suffix stamp for trash and restore collisions (`yyyymmddHHMMSSfff`)
const COLLISION_STAMP: &str = "%Y%m%d%H%M%S%3f";

#[derive(Debug, Clone)]
struct Indexed {
    kind: EntryKind,
    path: PathBuf,
}

/// Root directory, caches and the structural choke point
pub struct FsStore {
    root: PathBuf,
    trash_dir: String,
    codec: Arc<dyn FrontmatterCodec>,
    paths: DashMap<String, Indexed>,
    notes: DashMap<String, Note>,
    structure: Mutex<()>,
}

impl std::fmt::Debug for FsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsStore")
            .field("root", &self.root)
            .field("trash_dir", &self.trash_dir)
            .field("paths", &self.paths.len())
            .field("notes", &self.notes.len())
            .finish()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn is_note_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(NOTE_EXTENSION))
}

/// File or directory name for a stem
fn entry_name(stem: &str, kind: EntryKind) -> String {
    match kind {
        EntryKind::Folder => stem.to_string(),
        EntryKind::Note => format!("{stem}.{NOTE_EXTENSION}"),
    }
}

/// Name without the note extension
fn stem_of(name: &str) -> &str {
    let extension = format!(".{NOTE_EXTENSION}");
    name.strip_suffix(extension.as_str()).unwrap_or(name)
}

fn timestamp(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// Kind of the entry at `path`: a directory or a `.md` file
fn entry_kind(path: &Path) -> Option<EntryKind> {
    if path.is_dir() {
        Some(EntryKind::Folder)
    } else if path.is_file() && is_note_path(path) {
        Some(EntryKind::Note)
    } else {
        None
    }
}

fn kind_label(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Folder => "folder",
        EntryKind::Note => "note",
    }
}

/// `NotFound` unless `path` holds an entry of the `expected` kind
fn require_kind(id: &str, path: &Path, expected: EntryKind) -> FsResult<()> {
    if entry_kind(path) == Some(expected) {
        Ok(())
    } else {
        Err(StorageError::not_found(format!("{} '{id}'", kind_label(expected))).into())
    }
}

fn join_id(parent: Option<&str>, name: &str) -> String {
    match parent.filter(|p| !is_root_id(p)) {
        Some(parent) => format!("{parent}/{name}"),
        None => name.to_string(),
    }
}

impl FsStore {
    /// Open the store at `config.root`, creating the directory when allowed
    pub fn open(config: &FileSystemConfig) -> FsResult<Self> {
        let root = config.root.clone();
        if !root.exists() {
            if !config.create_if_missing {
                return Err(FsError::Root(format!("{} does not exist", root.display())));
            }
            fs::create_dir_all(&root).map_err(|e| {
                FsError::Root(format!("cannot create {}: {}", root.display(), e))
            })?;
            info!(root = %root.display(), "Created notes directory");
        }
        if !root.is_dir() {
            return Err(FsError::Root(format!("{} is not a directory", root.display())));
        }

        let store = Self {
            root,
            trash_dir: config.trash_dir.clone(),
            codec: Arc::new(YamlFrontmatter),
            paths: DashMap::new(),
            notes: DashMap::new(),
            structure: Mutex::new(()),
        };
        store.refresh_cache()?;
        Ok(store)
    }

    /// Open with default options at `root`
    pub fn open_root(root: impl Into<PathBuf>) -> FsResult<Self> {
        Self::open(&FileSystemConfig::new(root))
    }

    /// Swap the frontmatter codec and re-index with it
    pub fn with_codec(mut self, codec: Arc<dyn FrontmatterCodec>) -> FsResult<Self> {
        self.codec = codec;
        self.refresh_cache()?;
        Ok(self)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name of the trash directory (also the id prefix of trashed entries)
    pub fn trash_dir(&self) -> &str {
        &self.trash_dir
    }

    /// Whether `id` lives in the trash
    pub fn is_trash_id(&self, id: &str) -> bool {
        is_same_or_nested(id, &self.trash_dir)
    }

    /// Absolute path for an id; rejects ids that would leave the root
    pub fn resolve(&self, id: &str) -> FsResult<PathBuf> {
        let normalized = normalize_id(id);
        if normalized.split('/').any(|segment| segment == "..") {
            return Err(StorageError::invalid(format!("id '{id}' escapes the storage root")).into());
        }
        if is_root_id(&normalized) {
            return Ok(self.root.clone());
        }
        Ok(self.root.join(normalized))
    }

    /// Id for an absolute path under the root
    pub fn id_of(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let id = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        (!id.is_empty()).then_some(id)
    }

    fn trash_path(&self) -> PathBuf {
        self.root.join(&self.trash_dir)
    }

    // -----------------------------------------------------------------------
    // Cache
    // -----------------------------------------------------------------------

    /// Rebuild both caches from a full walk of the root
    pub fn refresh_cache(&self) -> FsResult<()> {
        let _guard = self.structure.lock();
        self.rescan()
    }

    fn rescan(&self) -> FsResult<()> {
        self.paths.clear();
        self.notes.clear();
        self.index_tree(&self.root);
        info!(
            root = %self.root.display(),
            entries = self.paths.len(),
            notes = self.notes.len(),
            "Indexed notes directory"
        );
        Ok(())
    }

    /// Index `path` and everything below it, skipping dot-prefixed entries
    fn index_tree(&self, path: &Path) {
        let walker = WalkDir::new(path)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            let Some(id) = self.id_of(entry.path()) else { continue };
            if entry.file_type().is_dir() {
                self.paths.insert(
                    id,
                    Indexed {
                        kind: EntryKind::Folder,
                        path: entry.path().to_path_buf(),
                    },
                );
            } else if entry.file_type().is_file() && is_note_path(entry.path()) {
                self.index_note_file(&id, entry.path());
            }
        }
    }

    fn index_note_file(&self, id: &str, path: &Path) {
        self.paths.insert(
            id.to_string(),
            Indexed {
                kind: EntryKind::Note,
                path: path.to_path_buf(),
            },
        );
        match self.parse_file(id, path) {
            Ok(note) => {
                self.notes.insert(id.to_string(), note.header_only());
            }
            Err(e) => warn!(id, error = %e, "Unreadable note left out of the cache"),
        }
    }

    /// Drop every cache entry at or below `id`
    fn forget(&self, id: &str) {
        self.paths.retain(|key, _| !is_same_or_nested(key, id));
        self.notes.retain(|key, _| !is_same_or_nested(key, id));
    }

    fn cached_kind(&self, id: &str) -> Option<EntryKind> {
        self.paths.get(id).map(|entry| entry.kind)
    }

    /// Whether `id` is the root or an active folder; misses fall back to disk
    pub fn contains_folder(&self, id: &str) -> bool {
        let id = normalize_id(id);
        if is_root_id(&id) {
            return true;
        }
        if self.is_trash_id(&id) {
            return false;
        }
        match self.cached_kind(&id) {
            Some(kind) => kind == EntryKind::Folder,
            None => match self.resolve(&id) {
                Ok(path) if path.is_dir() => {
                    debug!(id = %id, "Folder found on disk but not in cache");
                    self.paths.insert(
                        id,
                        Indexed {
                            kind: EntryKind::Folder,
                            path,
                        },
                    );
                    true
                }
                _ => false,
            },
        }
    }

    /// Ids of all active folders
    pub fn folder_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .paths
            .iter()
            .filter(|entry| entry.kind == EntryKind::Folder)
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Header-only copies of all active notes
    pub fn note_headers(&self) -> Vec<Note> {
        self.notes.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Ids of the active notes directly inside `folder_id`
    pub fn note_ids_in(&self, folder_id: &str) -> Vec<String> {
        let folder_id = normalize_id(folder_id);
        let mut ids: Vec<String> = self
            .paths
            .iter()
            .filter(|entry| entry.kind == EntryKind::Note)
            .filter(|entry| {
                let parent = parent_of(entry.key()).unwrap_or_default();
                parent == folder_id || (parent.is_empty() && is_root_id(&folder_id))
            })
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    fn child_refs(&self, folder_id: &str) -> BTreeSet<ComponentRef> {
        self.paths
            .iter()
            .filter(|entry| {
                let parent = parent_of(entry.key()).unwrap_or_default();
                parent == folder_id || (parent.is_empty() && is_root_id(folder_id))
            })
            .map(|entry| match entry.kind {
                EntryKind::Folder => ComponentRef::Folder(entry.key().clone()),
                EntryKind::Note => ComponentRef::Note(entry.key().clone()),
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    fn parse_file(&self, id: &str, path: &Path) -> FsResult<Note> {
        let text = fs::read_to_string(path).map_err(|e| FsError::io(path, e))?;
        let mut note = self.codec.parse(&text)?;
        self.fill_identity(&mut note, id);
        Ok(note)
    }

    /// Id, parent and title come from the path, never from the header
    pub(crate) fn fill_identity(&self, note: &mut Note, id: &str) {
        note.id = Some(id.to_string());
        note.parent_id = parent_of(id)
            .filter(|parent| *parent != self.trash_dir)
            .map(str::to_string);
        note.title = stem_of(last_segment(id)).to_string();
    }

    /// Full note (with body) from disk; `None` when no such file exists
    pub fn read_note(&self, id: &str) -> FsResult<Option<Note>> {
        let id = normalize_id(id);
        if is_root_id(&id) {
            return Ok(None);
        }
        let path = self.resolve(&id)?;
        if !path.is_file() || !is_note_path(&path) {
            if self.cached_kind(&id) == Some(EntryKind::Note) {
                warn!(id = %id, "Cached note vanished from disk");
                self.forget(&id);
            }
            return Ok(None);
        }
        let note = self.parse_file(&id, &path)?;
        if !self.is_trash_id(&id) && !self.notes.contains_key(&id) {
            debug!(id = %id, "Note found on disk but not in cache");
            self.index_note_file(&id, &path);
        }
        Ok(Some(note))
    }

    /// Folder built from its directory; the root is synthesized
    pub fn load_folder(&self, id: &str) -> FsResult<Option<Folder>> {
        let id = normalize_id(id);
        if is_root_id(&id) {
            let mut root = Folder::root();
            root.children = self.child_refs(&id);
            return Ok(Some(root));
        }
        let path = self.resolve(&id)?;
        if !path.is_dir() || id == self.trash_dir {
            return Ok(None);
        }
        let meta = fs::metadata(&path).map_err(|e| FsError::io(&path, e))?;
        let modified = meta.modified().map(timestamp).unwrap_or_else(|_| Utc::now());

        let mut folder = Folder::new(last_segment(&id));
        folder.id = Some(id.clone());
        folder.parent_id = parent_of(&id)
            .filter(|parent| *parent != self.trash_dir)
            .map(str::to_string);
        folder.created_date = meta.created().map(timestamp).unwrap_or(modified);
        folder.modified_date = modified;

        if self.is_trash_id(&id) {
            folder.deleted = true;
            folder.deleted_date = TrashManifest::load(&self.trash_path())?
                .by_trash_id(&id)
                .map(|entry| entry.deleted_date);
        } else {
            if !self.paths.contains_key(&id) {
                self.paths.insert(
                    id.clone(),
                    Indexed {
                        kind: EntryKind::Folder,
                        path: path.clone(),
                    },
                );
            }
            folder.children = self.child_refs(&id);
        }
        Ok(Some(folder))
    }

    /// Full notes for `ids`, skipping any that vanished from disk
    pub fn hydrate<I>(&self, ids: I) -> FsResult<Vec<Note>>
    where
        I: IntoIterator<Item = String>,
    {
        let mut notes = Vec::new();
        for id in ids {
            if let Some(note) = self.read_note(&id)? {
                notes.push(note);
            }
        }
        notes.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(notes)
    }

    /// Ids of cached notes whose header satisfies `predicate`
    pub fn note_ids_where(&self, predicate: impl Fn(&Note) -> bool) -> Vec<String> {
        self.notes
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Every note in the trash, with bodies
    pub fn trashed_notes(&self) -> FsResult<Vec<Note>> {
        let trash = self.trash_path();
        if !trash.is_dir() {
            return Ok(Vec::new());
        }
        let mut notes = Vec::new();
        let walker = WalkDir::new(&trash)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() || !is_note_path(entry.path()) {
                continue;
            }
            let Some(id) = self.id_of(entry.path()) else { continue };
            match self.parse_file(&id, entry.path()) {
                Ok(mut note) => {
                    // Files dropped into the trash by hand carry no flag
                    if !note.deleted || note.deleted_date.is_none() {
                        let at = note.deleted_date.unwrap_or_else(|| {
                            entry
                                .metadata()
                                .ok()
                                .and_then(|m| m.modified().ok())
                                .map_or_else(Utc::now, timestamp)
                        });
                        note.mark_deleted(at);
                    }
                    notes.push(note);
                }
                Err(e) => warn!(id = %id, error = %e, "Skipping unreadable trashed note"),
            }
        }
        notes.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(notes)
    }

    /// Folders that were trashed as a whole (per the manifest)
    pub fn trashed_folders(&self) -> FsResult<Vec<Folder>> {
        let manifest = TrashManifest::load(&self.trash_path())?;
        let mut folders = Vec::new();
        for entry in manifest.folders() {
            if let Some(folder) = self.load_folder(&entry.trash_id)? {
                folders.push(folder);
            }
        }
        folders.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(folders)
    }

    // -----------------------------------------------------------------------
    // Structural operations (hold the structure lock)
    // -----------------------------------------------------------------------

    /// First free `name`, `name (1)`, `name (2)`, ... inside `dir`.
    /// A candidate equal to `current` counts as free.
    fn unique_name(dir: &Path, stem: &str, kind: EntryKind, current: Option<&Path>) -> String {
        let mut candidate = entry_name(stem, kind);
        let mut n = 1;
        while dir.join(&candidate).exists() && current != Some(dir.join(&candidate).as_path()) {
            candidate = entry_name(&format!("{stem} ({n})"), kind);
            n += 1;
        }
        candidate
    }

    fn require_folder_dir(&self, folder_id: Option<&str>) -> FsResult<PathBuf> {
        let folder_id = folder_id.unwrap_or_default();
        let path = self.resolve(folder_id)?;
        if !path.is_dir() || (!is_root_id(folder_id) && self.is_trash_id(folder_id)) {
            return Err(StorageError::not_found(format!("folder '{folder_id}'")).into());
        }
        Ok(path)
    }

    /// Create a directory named after `title` inside `parent`; returns its id
    pub fn create_folder_dir(&self, parent: Option<&str>, title: &str) -> FsResult<String> {
        let _guard = self.structure.lock();
        let dir = self.require_folder_dir(parent)?;
        let name = Self::unique_name(&dir, &sanitize_file_name(title), EntryKind::Folder, None);
        let path = dir.join(&name);
        fs::create_dir(&path).map_err(|e| FsError::io(&path, e))?;

        let id = join_id(parent, &name);
        self.paths.insert(
            id.clone(),
            Indexed {
                kind: EntryKind::Folder,
                path,
            },
        );
        debug!(id = %id, "Created folder directory");
        Ok(id)
    }

    /// Write `note` as a new file inside `parent`; fills in id, parent and title
    pub fn create_note_file(&self, parent: Option<&str>, note: &mut Note) -> FsResult<String> {
        let _guard = self.structure.lock();
        let dir = self.require_folder_dir(parent)?;
        let name = Self::unique_name(&dir, &sanitize_file_name(&note.title), EntryKind::Note, None);
        let id = join_id(parent, &name);
        self.fill_identity(note, &id);
        self.write_unlocked(&id, note)?;
        debug!(id = %id, "Created note file");
        Ok(id)
    }

    /// Overwrite the note file at `id`
    pub fn write_note(&self, id: &str, note: &Note) -> FsResult<()> {
        let _guard = self.structure.lock();
        let path = self.resolve(id)?;
        if !path.is_file() {
            return Err(StorageError::not_found(format!("note '{id}'")).into());
        }
        self.write_unlocked(id, note)
    }

    fn write_unlocked(&self, id: &str, note: &Note) -> FsResult<()> {
        let path = self.resolve(id)?;
        let text = self.codec.generate(note)?;
        fs::write(&path, text).map_err(|e| FsError::io(&path, e))?;
        if !self.is_trash_id(id) {
            self.paths.insert(
                id.to_string(),
                Indexed {
                    kind: EntryKind::Note,
                    path,
                },
            );
            let mut header = note.header_only();
            self.fill_identity(&mut header, id);
            self.notes.insert(id.to_string(), header);
        }
        Ok(())
    }

    /// Rename `id` in place after `title`; returns the new id
    pub fn rename(&self, id: &str, title: &str, expected: EntryKind) -> FsResult<String> {
        let id = normalize_id(id);
        self.relocate(&id, parent_of(&id), &sanitize_file_name(title), expected)
    }

    /// Move `id` into `target_parent` under its current name; returns the new id
    pub fn move_into(
        &self,
        id: &str,
        target_parent: Option<&str>,
        expected: EntryKind,
    ) -> FsResult<String> {
        let id = normalize_id(id);
        let stem = match expected {
            EntryKind::Folder => last_segment(&id),
            EntryKind::Note => stem_of(last_segment(&id)),
        }
        .to_string();
        self.relocate(&id, target_parent, &stem, expected)
    }

    /// Move `id` into `target_parent` as `stem`, which must already be a
    /// valid file stem. A free name is picked on collision. Returns the new
    /// id, which equals `id` when nothing had to move.
    fn relocate(
        &self,
        id: &str,
        target_parent: Option<&str>,
        stem: &str,
        expected: EntryKind,
    ) -> FsResult<String> {
        let _guard = self.structure.lock();
        if is_root_id(id) || self.is_trash_id(id) {
            return Err(StorageError::invalid(format!("'{id}' cannot be moved")).into());
        }
        let source = self.resolve(id)?;
        require_kind(id, &source, expected)?;
        let kind = expected;

        let target_dir = self.require_folder_dir(target_parent)?;
        let name = Self::unique_name(&target_dir, stem, kind, Some(&source));
        let destination = target_dir.join(&name);
        if destination == source {
            return Ok(id.to_string());
        }
        fs::rename(&source, &destination).map_err(|e| FsError::io(&source, e))?;

        let new_id = join_id(target_parent, &name);
        match kind {
            EntryKind::Folder => {
                // Every id below the folder changed
                self.rescan()?;
            }
            EntryKind::Note => {
                self.forget(id);
                self.index_note_file(&new_id, &destination);
            }
        }
        debug!(from = %id, to = %new_id, "Relocated entry");
        Ok(new_id)
    }

    /// Move `id` under the trash directory and flag its notes deleted
    ///
    /// `id` must name an entry of the `expected` kind; otherwise nothing is
    /// touched and `NotFound` is returned.
    pub fn trash(&self, id: &str, expected: EntryKind) -> FsResult<String> {
        let _guard = self.structure.lock();
        let id = normalize_id(id);
        if is_root_id(&id) {
            return Err(StorageError::invalid("the root folder cannot be trashed").into());
        }
        let source = self.resolve(&id)?;
        require_kind(&id, &source, expected)?;
        if self.is_trash_id(&id) {
            return Ok(id);
        }
        let kind = expected;

        let trash_parent = match parent_of(&id) {
            Some(parent) => format!("{}/{parent}", self.trash_dir),
            None => self.trash_dir.clone(),
        };
        let target_dir = self.resolve(&trash_parent)?;
        fs::create_dir_all(&target_dir).map_err(|e| FsError::io(&target_dir, e))?;

        let now = Utc::now();
        let mut name = last_segment(&id).to_string();
        if target_dir.join(&name).exists() {
            let suffix = now.format(COLLISION_STAMP);
            name = entry_name(&format!("{}_{suffix}", stem_of(&name)), kind);
        }
        let destination = target_dir.join(&name);
        fs::rename(&source, &destination).map_err(|e| FsError::io(&source, e))?;
        let trash_id = format!("{trash_parent}/{name}");

        self.flag_notes(&destination, Some(now));
        let mut manifest = TrashManifest::load(&self.trash_path())?;
        manifest.record(TrashEntry {
            kind,
            original_id: id.clone(),
            trash_id: trash_id.clone(),
            deleted_date: now,
        });
        manifest.save(&self.trash_path())?;
        self.forget(&id);

        debug!(id = %id, trash_id = %trash_id, "Moved entry to trash");
        Ok(trash_id)
    }

    /// Move a trashed entry of the `expected` kind back; accepts the trash id
    /// or the original id
    pub fn restore(&self, id: &str, expected: EntryKind) -> FsResult<String> {
        let _guard = self.structure.lock();
        let id = normalize_id(id);
        let mut manifest = TrashManifest::load(&self.trash_path())?;

        let (trash_id, original_id) = if self.is_trash_id(&id) {
            let original = match manifest.by_trash_id(&id) {
                Some(entry) => entry.original_id.clone(),
                None => id[self.trash_dir.len()..].trim_start_matches('/').to_string(),
            };
            (id.clone(), original)
        } else {
            match manifest.latest_for_original(&id) {
                Some(entry) => (entry.trash_id.clone(), entry.original_id.clone()),
                None if entry_kind(&self.resolve(&id)?) == Some(expected) => return Ok(id),
                None => return Err(StorageError::not_found(format!("'{id}' is not in the trash")).into()),
            }
        };
        if trash_id == self.trash_dir || original_id.is_empty() {
            return Err(StorageError::invalid("the trash directory itself cannot be restored").into());
        }

        let source = self.resolve(&trash_id)?;
        let kind = match entry_kind(&source) {
            Some(kind) if kind == expected => kind,
            Some(_) => return Err(StorageError::not_found(format!("{} '{id}'", kind_label(expected))).into()),
            None => {
                if manifest.forget(&trash_id) > 0 {
                    manifest.save(&self.trash_path())?;
                }
                return Err(StorageError::not_found(trash_id).into());
            }
        };

        let mut destination = self.resolve(&original_id)?;
        let parent_dir = destination
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&parent_dir).map_err(|e| FsError::io(&parent_dir, e))?;

        let mut restored_id = original_id.clone();
        if destination.exists() {
            let suffix = Utc::now().format(COLLISION_STAMP);
            let name = entry_name(
                &format!("{}_restored_{suffix}", stem_of(last_segment(&original_id))),
                kind,
            );
            destination = parent_dir.join(&name);
            restored_id = join_id(parent_of(&original_id), &name);
        }
        fs::rename(&source, &destination).map_err(|e| FsError::io(&source, e))?;
        self.flag_notes(&destination, None);

        manifest.forget(&trash_id);
        manifest.save(&self.trash_path())?;
        self.rescan()?;

        debug!(trash_id = %trash_id, id = %restored_id, "Restored entry from trash");
        Ok(restored_id)
    }

    /// Remove `id` (active or trashed) and everything below it; `id` must
    /// name an entry of the `expected` kind
    pub fn purge(&self, id: &str, expected: EntryKind) -> FsResult<()> {
        let _guard = self.structure.lock();
        let mut id = normalize_id(id);
        if is_root_id(&id) || id == self.trash_dir {
            return Err(StorageError::invalid(format!("'{id}' cannot be deleted")).into());
        }
        let mut manifest = TrashManifest::load(&self.trash_path())?;

        let mut path = self.resolve(&id)?;
        if !path.exists() && !self.is_trash_id(&id) {
            if let Some(entry) = manifest.latest_for_original(&id) {
                id = entry.trash_id.clone();
                path = self.resolve(&id)?;
            }
        }
        require_kind(&id, &path, expected)?;
        match expected {
            EntryKind::Folder => fs::remove_dir_all(&path).map_err(|e| FsError::io(&path, e))?,
            EntryKind::Note => fs::remove_file(&path).map_err(|e| FsError::io(&path, e))?,
        }

        self.forget(&id);
        if manifest.forget(&id) > 0 {
            manifest.save(&self.trash_path())?;
        }
        debug!(id = %id, "Purged entry");
        Ok(())
    }

    /// Rewrite every note at or below `path` as deleted (`Some`) or active (`None`)
    fn flag_notes(&self, path: &Path, deleted: Option<DateTime<Utc>>) {
        for entry in WalkDir::new(path).follow_links(false).into_iter().flatten() {
            if !entry.file_type().is_file() || !is_note_path(entry.path()) {
                continue;
            }
            let Some(id) = self.id_of(entry.path()) else { continue };
            let result = self.parse_file(&id, entry.path()).and_then(|mut note| {
                match deleted {
                    Some(at) => note.mark_deleted(at),
                    None => note.clear_deleted(),
                }
                let text = self.codec.generate(&note)?;
                fs::write(entry.path(), text).map_err(|e| FsError::io(entry.path(), e))
            });
            if let Err(e) = result {
                warn!(id = %id, error = %e, "Could not update deleted flag");
            }
        }
    }

    /// The trash manifest as currently stored
    pub fn manifest(&self) -> FsResult<TrashManifest> {
        TrashManifest::load(&self.trash_path())
    }
}
