//! Ordered set of notes that expressions consume and produce.

use crate::graph::{Note, NoteGraph};
use std::collections::HashSet;

/// Notes in insertion order, unique by id.
///
/// `sorted` is set by ordering expressions so the orchestrator keeps their
/// order instead of ranking by score.
#[derive(Debug, Clone, Default)]
pub struct NoteSet<'a> {
    notes: Vec<&'a Note>,
    ids: HashSet<&'a str>,
    pub sorted: bool,
}

impl<'a> NoteSet<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_notes(notes: impl IntoIterator<Item = &'a Note>) -> Self {
        let mut set = Self::new();
        set.add_all(notes);
        set
    }

    /// Add a note unless one with the same id is present.
    pub fn add(&mut self, note: &'a Note) {
        if self.ids.insert(note.note_id.as_str()) {
            self.notes.push(note);
        }
    }

    pub fn add_all(&mut self, notes: impl IntoIterator<Item = &'a Note>) {
        for note in notes {
            self.add(note);
        }
    }

    pub fn has_note_id(&self, note_id: &str) -> bool {
        self.ids.contains(note_id)
    }

    /// Notes of `self` also in `other`, in `self`'s order.
    pub fn intersection(&self, other: &NoteSet<'a>) -> NoteSet<'a> {
        NoteSet::from_notes(
            self.notes
                .iter()
                .copied()
                .filter(|n| other.has_note_id(&n.note_id)),
        )
    }

    /// Notes of `self` not in `other`.
    pub fn minus(&self, other: &NoteSet<'a>) -> NoteSet<'a> {
        NoteSet::from_notes(
            self.notes
                .iter()
                .copied()
                .filter(|n| !other.has_note_id(&n.note_id)),
        )
    }

    /// `self` followed by the notes of `other` not already present.
    pub fn union(&self, other: &NoteSet<'a>) -> NoteSet<'a> {
        let mut out = self.clone();
        out.sorted = false;
        out.add_all(other.notes.iter().copied());
        out
    }

    pub fn truncate(&mut self, len: usize) {
        for note in self.notes.drain(len.min(self.notes.len())..) {
            self.ids.remove(note.note_id.as_str());
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Note> + '_ {
        self.notes.iter().copied()
    }

    pub fn notes(&self) -> &[&'a Note] {
        &self.notes
    }

    /// Replace the notes with a reordered list of the same notes.
    pub(crate) fn set_order(&mut self, notes: Vec<&'a Note>) {
        self.notes = notes;
    }
}

impl NoteGraph {
    /// Every note of the graph, the universe a fresh query starts from.
    pub fn all_note_set(&self) -> NoteSet<'_> {
        NoteSet::from_notes(self.notes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids<'a>(set: &NoteSet<'a>) -> Vec<&'a str> {
        set.iter().map(|n| n.note_id.as_str()).collect()
    }

    #[test]
    fn test_add_dedupes() {
        let a = Note::new("a", "A");
        let mut set = NoteSet::new();
        set.add(&a);
        set.add(&a);
        assert_eq!(set.len(), 1);
        assert!(set.has_note_id("a"));
    }

    #[test]
    fn test_set_operations_keep_order() {
        let (a, b, c) = (Note::new("a", "A"), Note::new("b", "B"), Note::new("c", "C"));
        let left = NoteSet::from_notes([&c, &a, &b]);
        let right = NoteSet::from_notes([&b, &c]);

        assert_eq!(ids(&left.intersection(&right)), vec!["c", "b"]);
        assert_eq!(ids(&left.minus(&right)), vec!["a"]);
        assert_eq!(ids(&right.union(&left)), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_truncate() {
        let (a, b, c) = (Note::new("a", "A"), Note::new("b", "B"), Note::new("c", "C"));
        let mut set = NoteSet::from_notes([&a, &b, &c]);
        set.truncate(2);
        assert_eq!(ids(&set), vec!["a", "b"]);
        assert!(!set.has_note_id("c"));
        set.truncate(10);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_all_note_set() {
        let mut graph = NoteGraph::new();
        graph.insert_child("root", Note::new("x", "X")).unwrap();
        assert_eq!(ids(&graph.all_note_set()), vec!["root", "x"]);
    }
}
