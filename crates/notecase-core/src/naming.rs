//! Id and filename helpers shared by the backends

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{StorageError, StorageResult};

/// Id of the synthetic root folder
pub const ROOT_FOLDER_ID: &str = "ROOT";

/// Extension of note files in the filesystem backend
pub const NOTE_EXTENSION: &str = "md";

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-zA-Z0-9.\-_ ]").expect("static regex")
});

/// Turn a title into a filesystem-safe name
///
/// Anything outside `[a-zA-Z0-9.\-_ ]` becomes `_`. A leading dot is also
/// replaced, otherwise the entry would be hidden from listings.
pub fn sanitize_file_name(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return "untitled".to_string();
    }
    let mut name = UNSAFE_CHARS.replace_all(trimmed, "_").into_owned();
    if name.starts_with('.') {
        name.replace_range(0..1, "_");
    }
    name
}

/// Whether `id` names the root folder
pub fn is_root_id(id: &str) -> bool {
    id.is_empty() || id == ROOT_FOLDER_ID
}

/// Forward-slash form without leading, trailing or duplicate separators
pub fn normalize_id(id: &str) -> String {
    id.replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Reject empty ids before any I/O
pub fn require_id<'a>(id: &'a str, what: &str) -> StorageResult<&'a str> {
    if id.trim().is_empty() {
        return Err(StorageError::invalid(format!("{what} id must not be empty")));
    }
    Ok(id)
}

/// Reject empty titles before any I/O
pub fn require_title<'a>(title: &'a str, what: &str) -> StorageResult<&'a str> {
    if title.trim().is_empty() {
        return Err(StorageError::invalid(format!("{what} title must not be empty")));
    }
    Ok(title)
}

/// Parent part of a path id (`a/b/c.md` -> `a/b`), `None` at top level
pub fn parent_of(id: &str) -> Option<&str> {
    id.rsplit_once('/').map(|(parent, _)| parent)
}

/// Last segment of a path id
pub fn last_segment(id: &str) -> &str {
    id.rsplit_once('/').map_or(id, |(_, name)| name)
}

/// Whether `id` is exactly `ancestor` or nested below it
pub fn is_same_or_nested(id: &str, ancestor: &str) -> bool {
    id == ancestor
        || id
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with('/'))
}
