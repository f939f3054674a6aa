//! Frontmatter codec
//!
//! The filesystem backend stores each note as a YAML header between `---`
//! fences followed by the free-form body. The backend only talks to the
//! [`FrontmatterCodec`] trait so a different header format can be injected.
//!
//! ## Recognized keys
//!
//! `title`, `created`, `modified`, `favorite`, `pinned`, `deleted`,
//! `deleted_date`, `tags`, `latitude`, `longitude`, `author`, `source_url`,
//! `source`, `source_application`, `todo`, `todo_due`, `todo_completed`.
//! Unknown keys are ignored.
//!
//! `tags` may be a YAML sequence (`[a, b]` or a block list) or a
//! comma-separated string (`a, b`).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::model::{Note, Tag, TodoState};
use crate::{StorageError, StorageResult};

const FENCE: &str = "---";

/// Converts notes to and from their on-disk text form
pub trait FrontmatterCodec: Send + Sync {
    /// Render header and body
    fn generate(&self, note: &Note) -> StorageResult<String>;

    /// Parse header and body; id and parent are left for the caller to fill in
    fn parse(&self, text: &str) -> StorageResult<Note>;
}

/// YAML frontmatter (`---` fenced)
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFrontmatter;

#[derive(Debug, Default, Serialize, Deserialize)]
struct NoteHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, deserialize_with = "flexible_datetime", skip_serializing_if = "Option::is_none")]
    created: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_datetime", skip_serializing_if = "Option::is_none")]
    modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "is_false")]
    favorite: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pinned: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    deleted: bool,
    #[serde(default, deserialize_with = "flexible_datetime", skip_serializing_if = "Option::is_none")]
    deleted_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "tag_list", skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_application: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    todo: bool,
    #[serde(default, deserialize_with = "flexible_datetime", skip_serializing_if = "Option::is_none")]
    todo_due: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_datetime", skip_serializing_if = "Option::is_none")]
    todo_completed: Option<DateTime<Utc>>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl From<&Note> for NoteHeader {
    fn from(note: &Note) -> Self {
        let todo = note.todo.clone();
        Self {
            title: Some(note.title.clone()),
            created: Some(note.created_date),
            modified: Some(note.modified_date),
            favorite: note.favorite,
            pinned: note.pinned,
            deleted: note.deleted,
            deleted_date: note.deleted_date,
            tags: note.tag_titles(),
            latitude: note.latitude,
            longitude: note.longitude,
            author: note.author.clone(),
            source_url: note.source_url.clone(),
            source: note.source.clone(),
            source_application: note.source_application.clone(),
            todo: todo.is_some(),
            todo_due: todo.as_ref().and_then(|t| t.due),
            todo_completed: todo.and_then(|t| t.completed),
        }
    }
}

impl NoteHeader {
    fn into_note(self, body: &str) -> Note {
        let mut note = Note::new(self.title.unwrap_or_default(), body);
        let created = self.created.unwrap_or(note.created_date);
        note.created_date = created;
        note.modified_date = self.modified.unwrap_or(created);
        note.favorite = self.favorite;
        note.pinned = self.pinned;
        note.deleted = self.deleted;
        note.deleted_date = if self.deleted { self.deleted_date } else { None };
        note.tags = self.tags.into_iter().map(Tag::synthesized).collect();
        note.latitude = self.latitude;
        note.longitude = self.longitude;
        note.author = self.author;
        note.source_url = self.source_url;
        note.source = self.source;
        note.source_application = self.source_application;
        if self.todo || self.todo_due.is_some() || self.todo_completed.is_some() {
            note.todo = Some(TodoState {
                due: self.todo_due,
                completed: self.todo_completed,
            });
        }
        note
    }
}

impl FrontmatterCodec for YamlFrontmatter {
    fn generate(&self, note: &Note) -> StorageResult<String> {
        let yaml = serde_yaml::to_string(&NoteHeader::from(note))?;
        Ok(format!("{FENCE}\n{yaml}{FENCE}\n{}", note.content))
    }

    fn parse(&self, text: &str) -> StorageResult<Note> {
        match split_frontmatter(text) {
            Some((raw, body)) => {
                let header: NoteHeader = if raw.trim().is_empty() {
                    NoteHeader::default()
                } else {
                    serde_yaml::from_str(raw).map_err(|e| {
                        StorageError::serialization(format!("invalid frontmatter: {e}"))
                    })?
                };
                Ok(header.into_note(body))
            }
            None => Ok(NoteHeader::default().into_note(text)),
        }
    }
}

/// Split `---\n<yaml>\n---\n<body>`; `None` when there is no header
pub fn split_frontmatter(text: &str) -> Option<(&str, &str)> {
    let rest = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == FENCE {
            let header = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((header, body));
        }
        offset += line.len();
    }
    None
}

fn tag_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTags {
        List(Vec<serde_yaml::Value>),
        Text(String),
    }

    let tags = match Option::<RawTags>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(RawTags::List(values)) => values
            .into_iter()
            .filter_map(|v| match v {
                serde_yaml::Value::String(s) => Some(s),
                serde_yaml::Value::Number(n) => Some(n.to_string()),
                serde_yaml::Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .collect(),
        Some(RawTags::Text(text)) => split_tag_text(&text),
    };

    let mut cleaned: Vec<String> = tags.iter().filter_map(|t| clean_tag(t)).collect();
    cleaned.dedup();
    Ok(cleaned)
}

/// `"a, b"` or `"[a, b]"` into individual titles
fn split_tag_text(text: &str) -> Vec<String> {
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(text);
    inner.split(',').map(str::to_string).collect()
}

fn clean_tag(raw: &str) -> Option<String> {
    let tag = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim_start_matches('#')
        .trim();
    (!tag.is_empty()).then(|| tag.to_string())
}

fn flexible_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(Some(dt.and_utc()));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()));
    }
    tracing::warn!(value = %raw, "Unrecognized date in frontmatter, ignoring");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generate_then_parse_preserves_fields() {
        let mut note = Note::new("Todo", "buy milk\n\n- eggs\n").with_tags(["urgent", "home"]);
        note.favorite = true;
        note.latitude = Some(52.52);
        note.longitude = Some(13.405);
        note.author = Some("sam".to_string());
        note.source_url = Some("https://example.com".to_string());
        note.todo = Some(TodoState {
            due: Some(Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()),
            completed: None,
        });

        let text = YamlFrontmatter.generate(&note).unwrap();
        assert!(text.starts_with("---\n"));

        let parsed = YamlFrontmatter.parse(&text).unwrap();
        assert_eq!(parsed.content, note.content);
        assert_eq!(parsed.title, "Todo");
        assert_eq!(parsed.tag_titles(), vec!["home", "urgent"]);
        assert!(parsed.favorite);
        assert!(!parsed.pinned);
        assert_eq!(parsed.latitude, Some(52.52));
        assert_eq!(parsed.author.as_deref(), Some("sam"));
        assert_eq!(parsed.todo, note.todo);
        assert_eq!(parsed.created_date, note.created_date);
    }

    #[test]
    fn test_comma_separated_tags() {
        let text = "---\ntags: work, urgent ,later\n---\nbody";
        let note = YamlFrontmatter.parse(text).unwrap();
        assert_eq!(note.tag_titles(), vec!["later", "urgent", "work"]);
        assert_eq!(note.content, "body");
    }

    #[test]
    fn test_bracketed_and_block_tags() {
        let inline = YamlFrontmatter.parse("---\ntags: [a, b]\n---\n").unwrap();
        assert_eq!(inline.tag_titles(), vec!["a", "b"]);

        let quoted = YamlFrontmatter.parse("---\ntags: \"[x, y]\"\n---\n").unwrap();
        assert_eq!(quoted.tag_titles(), vec!["x", "y"]);

        let block = YamlFrontmatter.parse("---\ntags:\n  - one\n  - 2\n---\n").unwrap();
        assert_eq!(block.tag_titles(), vec!["2", "one"]);
    }

    #[test]
    fn test_no_frontmatter_is_body_only() {
        let note = YamlFrontmatter.parse("# Just text\n").unwrap();
        assert_eq!(note.content, "# Just text\n");
        assert!(note.tags.is_empty());
        assert!(!note.deleted);
    }

    #[test]
    fn test_deleted_flags_and_plain_dates() {
        let text = "---\ndeleted: true\ndeleted_date: 2025-03-01\npinned: true\n---\nx";
        let note = YamlFrontmatter.parse(text).unwrap();
        assert!(note.deleted);
        assert!(note.pinned);
        assert_eq!(
            note.deleted_date,
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_invalid_yaml_is_serialization_error() {
        let err = YamlFrontmatter.parse("---\ntags: [unclosed\n---\n").unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn test_split_frontmatter_edge_cases() {
        assert_eq!(split_frontmatter("---\na: 1\n---"), Some(("a: 1\n", "")));
        assert_eq!(split_frontmatter("---\r\na: 1\r\n---\r\nbody"), Some(("a: 1\r\n", "body")));
        assert_eq!(split_frontmatter("---\nnever closed\n"), None);
        assert_eq!(split_frontmatter("no header"), None);
    }
}
