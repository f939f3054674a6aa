//! Id-keyed arena for tree-shaped results
//!
//! Tree queries (`fetch_all_folders_as_tree`, `load_sub_folders`) return a
//! [`Hierarchy`] rather than nested objects. Parent and child links are ids
//! into the same arena. Every traversal carries a visited set, so corrupted
//! (cyclic) input still terminates.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use super::{Component, ComponentRef, Folder, Note};
use crate::{StorageError, StorageResult};

/// One arena slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    Folder(Folder),
    Note(Note),
}

impl Node {
    pub fn id(&self) -> Option<&str> {
        self.as_component().id()
    }

    pub fn title(&self) -> &str {
        self.as_component().title()
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.as_component().parent_id()
    }

    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            Node::Folder(f) => Some(f),
            Node::Note(_) => None,
        }
    }

    pub fn as_note(&self) -> Option<&Note> {
        match self {
            Node::Note(n) => Some(n),
            Node::Folder(_) => None,
        }
    }

    pub fn as_component(&self) -> &dyn Component {
        match self {
            Node::Folder(f) => f,
            Node::Note(n) => n,
        }
    }

    fn as_component_mut(&mut self) -> &mut dyn Component {
        match self {
            Node::Folder(f) => f,
            Node::Note(n) => n,
        }
    }
}

/// Arena of folders and notes linked by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hierarchy {
    nodes: HashMap<String, Node>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a flat folder list, linking each folder to its parent when present
    pub fn from_folders(folders: impl IntoIterator<Item = Folder>) -> StorageResult<Self> {
        let mut hierarchy = Self::new();
        for mut folder in folders {
            folder.children.clear();
            hierarchy.insert_folder(folder)?;
        }

        let links: Vec<(String, String)> = hierarchy
            .nodes
            .iter()
            .filter_map(|(id, node)| Some((node.parent_id()?.to_string(), id.clone())))
            .filter(|(parent, _)| hierarchy.nodes.contains_key(parent))
            .collect();

        for (parent, child) in links {
            if let Some(Node::Folder(folder)) = hierarchy.nodes.get_mut(&parent) {
                folder.children.insert(ComponentRef::Folder(child));
            }
        }
        Ok(hierarchy)
    }

    pub fn insert_folder(&mut self, folder: Folder) -> StorageResult<()> {
        let id = folder
            .id
            .clone()
            .ok_or_else(|| StorageError::invalid("folder must be persisted before use in a hierarchy"))?;
        self.nodes.insert(id, Node::Folder(folder));
        Ok(())
    }

    pub fn insert_note(&mut self, note: Note) -> StorageResult<()> {
        let id = note
            .id
            .clone()
            .ok_or_else(|| StorageError::invalid("note must be persisted before use in a hierarchy"))?;
        self.nodes.insert(id, Node::Note(note));
        Ok(())
    }

    /// Link `child` under folder `parent_id`, updating both sides
    pub fn attach(&mut self, parent_id: &str, child: ComponentRef) -> StorageResult<()> {
        if parent_id == child.id() {
            return Err(StorageError::invalid(format!(
                "'{parent_id}' cannot be its own parent"
            )));
        }
        if !self.nodes.contains_key(child.id()) {
            return Err(StorageError::not_found(child.id().to_string()));
        }
        if child.is_folder() && self.ancestor_ids(parent_id, None).iter().any(|a| a == child.id()) {
            return Err(StorageError::invalid(format!(
                "moving '{}' under '{parent_id}' would create a cycle",
                child.id()
            )));
        }

        let parent = self
            .nodes
            .get_mut(parent_id)
            .ok_or_else(|| StorageError::not_found(parent_id.to_string()))?;
        parent.as_component_mut().add_child(child.clone())?;

        let old_parent = {
            let node = self
                .nodes
                .get_mut(child.id())
                .ok_or_else(|| StorageError::not_found(child.id().to_string()))?;
            let old = node.parent_id().map(str::to_string);
            node.as_component_mut().set_parent_id(Some(parent_id.to_string()));
            old
        };

        if let Some(old) = old_parent.filter(|old| old != parent_id) {
            if let Some(Node::Folder(f)) = self.nodes.get_mut(&old) {
                f.children.remove(&child);
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn folder(&self, id: &str) -> Option<&Folder> {
        self.nodes.get(id).and_then(Node::as_folder)
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.nodes.get(id).and_then(Node::as_note)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn folders(&self) -> impl Iterator<Item = &Folder> {
        self.nodes.values().filter_map(Node::as_folder)
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.nodes.values().filter_map(Node::as_note)
    }

    /// Nodes whose parent is absent from the arena, sorted by title
    pub fn roots(&self) -> Vec<&Node> {
        let mut roots: Vec<&Node> = self
            .nodes
            .values()
            .filter(|n| n.parent_id().map_or(true, |p| !self.nodes.contains_key(p)))
            .collect();
        roots.sort_by(|a, b| a.title().cmp(b.title()).then(a.id().cmp(&b.id())));
        roots
    }

    /// Direct children of `id`, sorted by title
    pub fn children_of(&self, id: &str) -> Vec<&Node> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };
        let mut children: Vec<&Node> = node
            .as_component()
            .children()
            .iter()
            .filter_map(|c| self.nodes.get(c.id()))
            .collect();
        children.sort_by(|a, b| a.title().cmp(b.title()).then(a.id().cmp(&b.id())));
        children
    }

    /// Ancestor folders of `id`, nearest first, up to `max_depth` levels
    pub fn ancestors(&self, id: &str, max_depth: Option<usize>) -> Vec<&Folder> {
        self.ancestor_ids(id, max_depth)
            .iter()
            .filter_map(|a| self.folder(a))
            .collect()
    }

    fn ancestor_ids(&self, id: &str, max_depth: Option<usize>) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::from([id]);
        let mut out = Vec::new();
        let mut current = self.nodes.get(id).and_then(Node::parent_id);

        while let Some(parent) = current {
            if max_depth.is_some_and(|max| out.len() >= max) || !seen.insert(parent) {
                break;
            }
            out.push(parent.to_string());
            current = self.nodes.get(parent).and_then(Node::parent_id);
        }
        out
    }

    /// Breadth-first descendants of `id` (excluding itself), up to `max_depth` levels
    pub fn descendants(&self, id: &str, max_depth: Option<usize>) -> Vec<&Node> {
        let mut seen: HashSet<&str> = HashSet::from([id]);
        let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(id, 0)]);
        let mut out = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if max_depth.is_some_and(|max| depth >= max) {
                continue;
            }
            for child in self.children_of(current) {
                let Some(child_id) = child.id() else { continue };
                if seen.insert(child_id) {
                    out.push(child);
                    queue.push_back((child_id, depth + 1));
                }
            }
        }
        out
    }

    /// `"/a/b/c"` path of a node from its titles, or `None` if unknown.
    /// The root folder contributes no segment, so its own path is `""`.
    pub fn path_of(&self, id: &str) -> Option<String> {
        let node = self.nodes.get(id)?;
        if node.as_folder().is_some_and(Folder::is_root) {
            return Some(String::new());
        }
        let mut segments: Vec<&str> = self
            .ancestors(id, None)
            .into_iter()
            .filter(|f| !f.is_root())
            .map(|f| f.title.as_str())
            .collect();
        segments.reverse();
        segments.push(node.title());
        Some(segments.iter().map(|s| format!("/{s}")).collect())
    }

    /// Ids of every node in the arena
    pub fn ids(&self) -> BTreeSet<&str> {
        self.nodes.keys().map(String::as_str).collect()
    }

    pub fn into_nodes(self) -> impl Iterator<Item = Node> {
        self.nodes.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(id: &str, title: &str, parent: Option<&str>) -> Folder {
        let mut f = Folder::new(title);
        f.id = Some(id.to_string());
        f.parent_id = parent.map(str::to_string);
        f
    }

    fn sample() -> Hierarchy {
        Hierarchy::from_folders(vec![
            folder("a", "Work", None),
            folder("b", "Projects", Some("a")),
            folder("c", "Rust", Some("b")),
            folder("d", "Home", None),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_folders_links_children() {
        let h = sample();
        assert_eq!(h.len(), 4);

        let roots: Vec<&str> = h.roots().iter().map(|n| n.title()).collect();
        assert_eq!(roots, vec!["Home", "Work"]);

        let children: Vec<&str> = h.children_of("a").iter().map(|n| n.title()).collect();
        assert_eq!(children, vec!["Projects"]);
    }

    #[test]
    fn test_path_and_ancestors() {
        let h = sample();
        assert_eq!(h.path_of("c").as_deref(), Some("/Work/Projects/Rust"));
        assert_eq!(h.path_of("a").as_deref(), Some("/Work"));
        assert!(h.path_of("missing").is_none());

        let ancestors: Vec<&str> = h.ancestors("c", None).iter().map(|f| f.title.as_str()).collect();
        assert_eq!(ancestors, vec!["Projects", "Work"]);
        assert_eq!(h.ancestors("c", Some(1)).len(), 1);
    }

    #[test]
    fn test_path_skips_root_folder() {
        let mut h = sample();
        h.insert_folder(folder(crate::ROOT_FOLDER_ID, "ROOT", None)).unwrap();
        h.attach(crate::ROOT_FOLDER_ID, ComponentRef::Folder("a".into())).unwrap();

        assert_eq!(h.path_of("c").as_deref(), Some("/Work/Projects/Rust"));
        assert_eq!(h.path_of("a").as_deref(), Some("/Work"));
        assert_eq!(h.path_of(crate::ROOT_FOLDER_ID).as_deref(), Some(""));
    }

    #[test]
    fn test_descendants_depth_limit() {
        let h = sample();
        assert_eq!(h.descendants("a", None).len(), 2);
        assert_eq!(h.descendants("a", Some(1)).len(), 1);
        assert!(h.descendants("a", Some(0)).is_empty());
    }

    #[test]
    fn test_traversal_terminates_on_cycle() {
        let mut h = Hierarchy::from_folders(vec![
            folder("x", "X", Some("y")),
            folder("y", "Y", Some("x")),
        ])
        .unwrap();

        assert_eq!(h.ancestors("x", None).len(), 1);
        assert!(h.path_of("x").is_some());
        assert_eq!(h.descendants("x", None).len(), 1);

        // attach refuses to make it worse
        h.insert_folder(folder("z", "Z", None)).unwrap();
        assert!(h.attach("x", ComponentRef::Folder("x".into())).is_err());
    }

    #[test]
    fn test_attach_moves_between_parents() {
        let mut h = sample();
        let mut note = Note::new("Todo", "buy milk");
        note.id = Some("n1".to_string());
        h.insert_note(note).unwrap();

        h.attach("a", ComponentRef::Note("n1".into())).unwrap();
        assert_eq!(h.note("n1").unwrap().parent_id.as_deref(), Some("a"));
        assert!(h.folder("a").unwrap().children.contains(&ComponentRef::Note("n1".into())));

        h.attach("d", ComponentRef::Note("n1".into())).unwrap();
        assert!(!h.folder("a").unwrap().children.contains(&ComponentRef::Note("n1".into())));
        assert!(h.folder("d").unwrap().children.contains(&ComponentRef::Note("n1".into())));
    }

    #[test]
    fn test_attach_rejects_cycle_and_leaf_parent() {
        let mut h = sample();
        let err = h.attach("c", ComponentRef::Folder("a".into())).unwrap_err();
        assert!(matches!(err, StorageError::InvalidParameter(_)));

        let mut note = Note::new("leaf", "");
        note.id = Some("n".to_string());
        h.insert_note(note).unwrap();
        let err = h.attach("n", ComponentRef::Folder("d".into())).unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedOperation(_)));
    }

    #[test]
    fn test_insert_requires_id() {
        let mut h = Hierarchy::new();
        assert!(h.insert_folder(Folder::new("unsaved")).is_err());
    }
}
