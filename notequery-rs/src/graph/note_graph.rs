//! The in-memory note graph the search engine reads from.

use super::note::{Attribute, AttributeType, Branch, Note};
use crate::error::{NoteQueryError, Result};
use std::collections::{HashMap, HashSet};

/// Id of the hierarchy root.
pub const ROOT_NOTE_ID: &str = "root";
/// Id of the subtree holding system notes.
pub const HIDDEN_NOTE_ID: &str = "_hidden";

/// Separator between titles in a note path title.
pub const PATH_TITLE_SEPARATOR: &str = " / ";

/// Notes, branches and attributes, indexed for the lookups search needs.
///
/// Notes keep their insertion order; that order is the order of the note
/// universe handed to a query.
#[derive(Debug, Default)]
pub struct NoteGraph {
    notes: Vec<Note>,
    index: HashMap<String, usize>,
    branches: Vec<Branch>,
    /// child note id -> indices into `branches`
    parent_branches: HashMap<String, Vec<usize>>,
    /// parent note id -> indices into `branches`
    child_branches: HashMap<String, Vec<usize>>,
    attributes: Vec<Attribute>,
    /// owner note id -> indices into `attributes`
    owned_attributes: HashMap<String, Vec<usize>>,
    /// relation target id -> indices into `attributes`
    target_relations: HashMap<String, Vec<usize>>,
}

impl NoteGraph {
    /// Create a graph containing only the root note.
    pub fn new() -> Self {
        let mut graph = Self::default();
        graph.ensure_root();
        graph
    }

    /// Add the root note if it is missing.
    pub fn ensure_root(&mut self) {
        if !self.index.contains_key(ROOT_NOTE_ID) {
            self.index.insert(ROOT_NOTE_ID.to_string(), self.notes.len());
            self.notes.push(Note::new(ROOT_NOTE_ID, "root"));
        }
    }

    pub fn add_note(&mut self, note: Note) -> Result<()> {
        if self.index.contains_key(&note.note_id) {
            return Err(NoteQueryError::Other(format!(
                "Duplicate note id '{}'",
                note.note_id
            )));
        }
        self.index.insert(note.note_id.clone(), self.notes.len());
        self.notes.push(note);
        Ok(())
    }

    pub fn add_branch(&mut self, branch: Branch) -> Result<()> {
        self.get_note_or_throw(&branch.note_id)?;
        self.get_note_or_throw(&branch.parent_note_id)?;
        if branch.note_id == branch.parent_note_id {
            return Err(NoteQueryError::Other(format!(
                "Note '{}' cannot be its own parent",
                branch.note_id
            )));
        }

        let idx = self.branches.len();
        self.parent_branches
            .entry(branch.note_id.clone())
            .or_default()
            .push(idx);
        self.child_branches
            .entry(branch.parent_note_id.clone())
            .or_default()
            .push(idx);
        self.branches.push(branch);
        Ok(())
    }

    pub fn add_attribute(&mut self, attribute: Attribute) -> Result<()> {
        self.get_note_or_throw(&attribute.note_id)?;

        let idx = self.attributes.len();
        self.owned_attributes
            .entry(attribute.note_id.clone())
            .or_default()
            .push(idx);
        if attribute.is_relation() {
            self.target_relations
                .entry(attribute.value.clone())
                .or_default()
                .push(idx);
        }
        self.attributes.push(attribute);
        Ok(())
    }

    /// Add `note` as the last child of `parent_id`.
    pub fn insert_child(&mut self, parent_id: &str, note: Note) -> Result<()> {
        self.get_note_or_throw(parent_id)?;
        let position = (self.child_branches.get(parent_id).map_or(0, Vec::len) as i64 + 1) * 10;
        let note_id = note.note_id.clone();
        self.add_note(note)?;
        self.add_branch(Branch {
            note_id,
            parent_note_id: parent_id.to_string(),
            prefix: None,
            note_position: position,
        })
    }

    pub fn add_label(&mut self, note_id: &str, name: &str, value: &str) -> Result<()> {
        self.add_attribute(Attribute::label(note_id, name, value))
    }

    pub fn add_relation(&mut self, note_id: &str, name: &str, target_id: &str) -> Result<()> {
        self.add_attribute(Attribute::relation(note_id, name, target_id))
    }

    pub fn get_note(&self, note_id: &str) -> Option<&Note> {
        self.index.get(note_id).map(|&i| &self.notes[i])
    }

    /// Like [`get_note`](Self::get_note) but a missing note is an error.
    pub fn get_note_or_throw(&self, note_id: &str) -> Result<&Note> {
        self.get_note(note_id)
            .ok_or_else(|| NoteQueryError::NoteNotFound(note_id.to_string()))
    }

    pub fn contains(&self, note_id: &str) -> bool {
        self.index.contains_key(note_id)
    }

    /// All notes in insertion order.
    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn parent_branches(&self, note_id: &str) -> Vec<&Branch> {
        self.parent_branches
            .get(note_id)
            .map(|ids| ids.iter().map(|&i| &self.branches[i]).collect())
            .unwrap_or_default()
    }

    pub fn parent_notes(&self, note_id: &str) -> Vec<&Note> {
        self.parent_branches(note_id)
            .into_iter()
            .filter_map(|b| self.get_note(&b.parent_note_id))
            .collect()
    }

    /// Children ordered by branch position.
    pub fn child_notes(&self, note_id: &str) -> Vec<&Note> {
        let mut branches: Vec<&Branch> = self
            .child_branches
            .get(note_id)
            .map(|ids| ids.iter().map(|&i| &self.branches[i]).collect())
            .unwrap_or_default();
        branches.sort_by_key(|b| b.note_position);
        branches
            .into_iter()
            .filter_map(|b| self.get_note(&b.note_id))
            .collect()
    }

    pub fn owned_attributes(&self, note_id: &str) -> Vec<&Attribute> {
        self.owned_attributes
            .get(note_id)
            .map(|ids| ids.iter().map(|&i| &self.attributes[i]).collect())
            .unwrap_or_default()
    }

    /// Owned attributes plus those inherited from ancestors (inheritable only)
    /// and from `~template` / `~inherit` targets.
    pub fn attributes(&self, note_id: &str) -> Vec<&Attribute> {
        let mut path = Vec::new();
        self.collect_attributes(note_id, &mut path)
            .into_iter()
            .map(|i| &self.attributes[i])
            .collect()
    }

    fn collect_attributes(&self, note_id: &str, path: &mut Vec<String>) -> Vec<usize> {
        if path.iter().any(|p| p == note_id) {
            return Vec::new();
        }

        let mut collected: Vec<usize> = self
            .owned_attributes
            .get(note_id)
            .cloned()
            .unwrap_or_default();
        path.push(note_id.to_string());

        // inheritable attributes on root are not meant for the hidden subtree
        if note_id != ROOT_NOTE_ID && note_id != HIDDEN_NOTE_ID {
            let parent_ids: Vec<String> = self
                .parent_branches(note_id)
                .iter()
                .map(|b| b.parent_note_id.clone())
                .collect();
            for parent_id in parent_ids {
                let inherited = self.collect_attributes(&parent_id, path);
                collected.extend(
                    inherited
                        .into_iter()
                        .filter(|&i| self.attributes[i].is_inheritable),
                );
            }
        }

        let mut templated = Vec::new();
        for &i in &collected {
            let attr = &self.attributes[i];
            if attr.is_relation()
                && (attr.name == "template" || attr.name == "inherit")
                && self.contains(&attr.value)
            {
                templated.extend(
                    self.collect_attributes(&attr.value, path)
                        .into_iter()
                        .filter(|&j| {
                            let t = &self.attributes[j];
                            !(t.is_label()
                                && (t.name == "template" || t.name == "workspaceTemplate"))
                        }),
                );
            }
        }
        path.pop();

        let mut seen = HashSet::new();
        collected
            .into_iter()
            .chain(templated)
            .filter(|i| seen.insert(*i))
            .collect()
    }

    /// Effective attributes of the given type whose name matches case-insensitively.
    pub fn attributes_named(&self, note_id: &str, kind: AttributeType, name: &str) -> Vec<&Attribute> {
        let name = name.to_lowercase();
        self.attributes(note_id)
            .into_iter()
            .filter(|a| a.kind == kind && a.name.to_lowercase() == name)
            .collect()
    }

    pub fn labels(&self, note_id: &str) -> Vec<&Attribute> {
        self.attributes(note_id)
            .into_iter()
            .filter(|a| a.is_label())
            .collect()
    }

    pub fn relations(&self, note_id: &str) -> Vec<&Attribute> {
        self.attributes(note_id)
            .into_iter()
            .filter(|a| a.is_relation())
            .collect()
    }

    /// Relations owned by other notes that point at `note_id`.
    pub fn target_relations(&self, note_id: &str) -> Vec<&Attribute> {
        self.target_relations
            .get(note_id)
            .map(|ids| ids.iter().map(|&i| &self.attributes[i]).collect())
            .unwrap_or_default()
    }

    pub fn label_value(&self, note_id: &str, name: &str) -> Option<&str> {
        self.attributes_named(note_id, AttributeType::Label, name)
            .first()
            .map(|a| a.value.as_str())
    }

    pub fn relation_target(&self, note_id: &str, name: &str) -> Option<&Note> {
        self.attributes_named(note_id, AttributeType::Relation, name)
            .first()
            .and_then(|a| self.get_note(&a.value))
    }

    pub fn has_label(&self, note_id: &str, name: &str) -> bool {
        !self
            .attributes_named(note_id, AttributeType::Label, name)
            .is_empty()
    }

    pub fn is_archived(&self, note_id: &str) -> bool {
        self.has_label(note_id, "archived")
    }

    pub fn is_in_hidden_subtree(&self, note_id: &str) -> bool {
        note_id == HIDDEN_NOTE_ID || self.ancestors(note_id).iter().any(|n| n.note_id == HIDDEN_NOTE_ID)
    }

    /// Title as shown under `parent_id`, including the branch prefix.
    pub fn title_in_parent(&self, note_id: &str, parent_id: &str) -> String {
        let Some(note) = self.get_note(note_id) else {
            return "[error fetching title]".to_string();
        };
        let prefix = self
            .parent_branches(note_id)
            .into_iter()
            .find(|b| b.parent_note_id == parent_id)
            .and_then(|b| b.prefix.as_deref())
            .filter(|p| !p.is_empty());
        match prefix {
            Some(prefix) => format!("{} - {}", prefix, note.title),
            None => note.title.clone(),
        }
    }

    /// Every root-to-note path. Empty for notes not reachable from root.
    pub fn all_note_paths(&self, note_id: &str) -> Vec<Vec<String>> {
        let mut out = Vec::new();
        let mut suffix = Vec::new();
        self.collect_paths(note_id, &mut suffix, &mut out);
        out
    }

    fn collect_paths(&self, note_id: &str, suffix: &mut Vec<String>, out: &mut Vec<Vec<String>>) {
        if suffix.iter().any(|s| s == note_id) {
            return;
        }
        suffix.push(note_id.to_string());
        if note_id == ROOT_NOTE_ID {
            out.push(suffix.iter().rev().cloned().collect());
        } else {
            let parents: Vec<String> = self
                .parent_branches(note_id)
                .iter()
                .map(|b| b.parent_note_id.clone())
                .collect();
            for parent in parents {
                self.collect_paths(&parent, suffix, out);
            }
        }
        suffix.pop();
    }

    /// Preferred path from root: non-archived first, then non-hidden, then shortest.
    pub fn best_note_path(&self, note_id: &str) -> Vec<String> {
        let mut paths: Vec<(bool, bool, Vec<String>)> = self
            .all_note_paths(note_id)
            .into_iter()
            .map(|p| {
                let archived = p.iter().any(|id| self.is_archived(id));
                let hidden = p.iter().any(|id| id == HIDDEN_NOTE_ID);
                (archived, hidden, p)
            })
            .collect();
        paths.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then(a.1.cmp(&b.1))
                .then(a.2.len().cmp(&b.2.len()))
                .then(a.2.cmp(&b.2))
        });
        paths
            .into_iter()
            .next()
            .map(|(_, _, p)| p)
            .unwrap_or_else(|| vec![note_id.to_string()])
    }

    /// Titles along `path` joined with [`PATH_TITLE_SEPARATOR`], root omitted.
    pub fn note_path_title(&self, path: &[String]) -> String {
        match path {
            [] => String::new(),
            [only] => match self.get_note(only) {
                Some(note) => note.title.clone(),
                None => "[error fetching title]".to_string(),
            },
            _ => {
                let mut titles = Vec::new();
                let mut parent_id = path[0].as_str();
                for note_id in &path[1..] {
                    titles.push(self.title_in_parent(note_id, parent_id));
                    parent_id = note_id;
                }
                titles.join(PATH_TITLE_SEPARATOR)
            }
        }
    }

    /// Id, type, mime, branch prefixes, title and effective attributes in one
    /// string. Not normalized.
    pub fn flat_text(&self, note_id: &str) -> String {
        let Some(note) = self.get_note(note_id) else {
            return String::new();
        };
        let mut text = format!("{} {} {} ", note.note_id, note.note_type.as_str(), note.mime);
        for branch in self.parent_branches(note_id) {
            if let Some(prefix) = branch.prefix.as_deref().filter(|p| !p.is_empty()) {
                text.push_str(prefix);
                text.push(' ');
            }
        }
        text.push_str(&note.title);
        text.push(' ');
        for attr in self.attributes(note_id) {
            text.push(attr.kind.sigil());
            text.push_str(&attr.name);
            if !attr.value.is_empty() {
                text.push('=');
                text.push_str(&attr.value);
            }
            text.push(' ');
        }
        text
    }

    /// The note followed by all its descendants, depth first.
    pub fn subtree(&self, note_id: &str) -> Vec<&Note> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![note_id.to_string()];
        while let Some(id) = stack.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            let Some(note) = self.get_note(&id) else {
                continue;
            };
            out.push(note);
            for child in self.child_notes(&id).into_iter().rev() {
                stack.push(child.note_id.clone());
            }
        }
        out
    }

    /// All ancestors of the note, excluding the note itself.
    pub fn ancestors(&self, note_id: &str) -> Vec<&Note> {
        let mut out = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(note_id.to_string());
        let mut queue = vec![note_id.to_string()];
        while let Some(id) = queue.pop() {
            for parent in self.parent_notes(&id) {
                if visited.insert(parent.note_id.clone()) {
                    out.push(parent);
                    queue.push(parent.note_id.clone());
                }
            }
        }
        out
    }

    /// Shortest number of parent hops from the note up to `ancestor_id`.
    pub fn distance_to_ancestor(&self, note_id: &str, ancestor_id: &str) -> Option<usize> {
        let mut visited = HashSet::new();
        let mut frontier = vec![note_id.to_string()];
        let mut distance = 0;
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for id in frontier {
                if id == ancestor_id {
                    return Some(distance);
                }
                if !visited.insert(id.clone()) {
                    continue;
                }
                next.extend(self.parent_notes(&id).into_iter().map(|p| p.note_id.clone()));
            }
            frontier = next;
            distance += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::note::NoteType;

    fn sample() -> NoteGraph {
        let mut g = NoteGraph::new();
        g.insert_child("root", Note::new("books", "Books")).unwrap();
        g.insert_child("books", Note::new("dune", "Dune")).unwrap();
        g.insert_child("root", Note::new("people", "People")).unwrap();
        g.insert_child("people", Note::new("herbert", "Frank Herbert")).unwrap();
        g.add_attribute(Attribute::label("books", "genre", "fiction").inheritable())
            .unwrap();
        g.add_label("dune", "book", "").unwrap();
        g.add_relation("dune", "author", "herbert").unwrap();
        g
    }

    #[test]
    fn test_new_graph_has_root() {
        let g = NoteGraph::new();
        assert!(g.get_note("root").is_some());
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn test_get_note_or_throw() {
        let g = sample();
        assert!(g.get_note_or_throw("dune").is_ok());
        assert!(matches!(
            g.get_note_or_throw("missing"),
            Err(NoteQueryError::NoteNotFound(id)) if id == "missing"
        ));
    }

    #[test]
    fn test_duplicate_note_rejected() {
        let mut g = sample();
        assert!(g.add_note(Note::new("dune", "Again")).is_err());
    }

    #[test]
    fn test_inherited_attributes() {
        let g = sample();
        let names: Vec<&str> = g.attributes("dune").iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["book", "author", "genre"]);
        assert_eq!(g.label_value("dune", "GENRE"), Some("fiction"));
        assert!(!g.has_label("herbert", "genre"));
    }

    #[test]
    fn test_template_attributes() {
        let mut g = sample();
        g.insert_child("root", Note::new("tpl", "Template")).unwrap();
        g.add_label("tpl", "template", "").unwrap();
        g.add_label("tpl", "rating", "5").unwrap();
        g.add_relation("herbert", "template", "tpl").unwrap();

        assert_eq!(g.label_value("herbert", "rating"), Some("5"));
        assert!(!g.has_label("herbert", "template"));
    }

    #[test]
    fn test_relations_and_targets() {
        let g = sample();
        assert_eq!(g.relation_target("dune", "author").map(|n| n.title.as_str()), Some("Frank Herbert"));
        let incoming = g.target_relations("herbert");
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].note_id, "dune");
    }

    #[test]
    fn test_best_path_prefers_non_archived() {
        let mut g = sample();
        g.insert_child("root", Note::new("attic", "Attic")).unwrap();
        g.add_label("attic", "archived", "").unwrap();
        g.add_branch(Branch {
            note_id: "dune".to_string(),
            parent_note_id: "attic".to_string(),
            prefix: None,
            note_position: 10,
        })
        .unwrap();

        assert_eq!(g.all_note_paths("dune").len(), 2);
        assert_eq!(g.best_note_path("dune"), vec!["root", "books", "dune"]);
    }

    #[test]
    fn test_note_path_title_with_prefix() {
        let mut g = sample();
        g.add_branch(Branch {
            note_id: "dune".to_string(),
            parent_note_id: "people".to_string(),
            prefix: Some("Fav".to_string()),
            note_position: 20,
        })
        .unwrap();
        let path: Vec<String> = ["root", "people", "dune"].iter().map(|s| s.to_string()).collect();
        assert_eq!(g.note_path_title(&path), "People / Fav - Dune");
        assert_eq!(g.note_path_title(&["root".to_string()]), "root");
    }

    #[test]
    fn test_flat_text() {
        let g = sample();
        let text = g.flat_text("dune");
        assert!(text.starts_with("dune text text/html Dune "));
        assert!(text.contains("#book "));
        assert!(text.contains("~author=herbert "));
        assert!(text.contains("#genre=fiction "));
    }

    #[test]
    fn test_subtree_and_distance() {
        let g = sample();
        let ids: Vec<&str> = g.subtree("root").iter().map(|n| n.note_id.as_str()).collect();
        assert_eq!(ids, vec!["root", "books", "dune", "people", "herbert"]);
        assert_eq!(g.distance_to_ancestor("dune", "root"), Some(2));
        assert_eq!(g.distance_to_ancestor("dune", "dune"), Some(0));
        assert_eq!(g.distance_to_ancestor("dune", "people"), None);
    }

    #[test]
    fn test_hidden_subtree() {
        let mut g = sample();
        g.insert_child("root", Note::new(HIDDEN_NOTE_ID, "Hidden")).unwrap();
        g.insert_child(HIDDEN_NOTE_ID, Note::new("opts", "Options").with_type(NoteType::Doc, ""))
            .unwrap();
        assert!(g.is_in_hidden_subtree("opts"));
        assert!(!g.is_in_hidden_subtree("dune"));
    }
}
