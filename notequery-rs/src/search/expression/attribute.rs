use crate::graph::{Attribute, AttributeType};
use crate::search::comparator::Comparator;
use crate::search::context::ExecutionContext;
use crate::search::note_set::NoteSet;
use std::fmt;

/// `#name` / `~name`: the note has such an attribute, owned or inherited.
#[derive(Debug, Clone)]
pub struct AttributeExists {
    pub kind: AttributeType,
    /// Lowercased.
    pub name: String,
    /// Match attribute names starting with `name` (autocomplete).
    pub prefix_match: bool,
}

impl AttributeExists {
    pub fn new(kind: AttributeType, name: &str, prefix_match: bool) -> Self {
        Self {
            kind,
            name: name.to_lowercase(),
            prefix_match,
        }
    }

    fn accepts(&self, attr: &Attribute) -> bool {
        if attr.kind != self.kind {
            return false;
        }
        let name = attr.name.to_lowercase();
        if self.prefix_match {
            name.starts_with(&self.name)
        } else {
            name == self.name
        }
    }

    pub fn execute<'a>(&self, input: &NoteSet<'a>, exec: &ExecutionContext<'a>) -> NoteSet<'a> {
        NoteSet::from_notes(input.iter().filter(|note| {
            exec.graph
                .attributes(&note.note_id)
                .iter()
                .any(|a| self.accepts(a))
        }))
    }
}

impl fmt::Display for AttributeExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.sigil(), self.name)?;
        if self.prefix_match {
            write!(f, "*")?;
        }
        Ok(())
    }
}

/// `#name <op> value`: some attribute of that name has a matching value.
#[derive(Debug, Clone)]
pub struct AttributeComparison {
    pub kind: AttributeType,
    pub name: String,
    pub comparator: Comparator,
}

impl AttributeComparison {
    pub fn new(kind: AttributeType, name: &str, comparator: Comparator) -> Self {
        Self {
            kind,
            name: name.to_lowercase(),
            comparator,
        }
    }

    pub fn execute<'a>(&self, input: &NoteSet<'a>, exec: &ExecutionContext<'a>) -> NoteSet<'a> {
        NoteSet::from_notes(input.iter().filter(|note| {
            exec.graph
                .attributes_named(&note.note_id, self.kind, &self.name)
                .iter()
                .any(|a| self.comparator.matches(Some(&a.value.to_lowercase())))
        }))
    }
}

impl fmt::Display for AttributeComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} {} '{}'",
            self.kind.sigil(),
            self.name,
            self.comparator.op.as_str(),
            self.comparator.value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Attribute, Note, NoteGraph};
    use crate::search::comparator::CompareOp;
    use crate::search::context::MatchMode;

    fn graph() -> NoteGraph {
        let mut g = NoteGraph::new();
        g.insert_child("root", Note::new("books", "Books")).unwrap();
        g.insert_child("books", Note::new("dune", "Dune")).unwrap();
        g.insert_child("root", Note::new("other", "Other")).unwrap();
        g.add_attribute(Attribute::label("books", "shelf", "Fiction").inheritable())
            .unwrap();
        g.add_label("dune", "year", "1965").unwrap();
        g.add_label("other", "yearly", "").unwrap();
        g
    }

    fn ids(set: &NoteSet<'_>) -> Vec<String> {
        set.iter().map(|n| n.note_id.clone()).collect()
    }

    #[test]
    fn test_exists_includes_inherited() {
        let g = graph();
        let exec = ExecutionContext::new(&g, MatchMode::Exact);
        let exp = AttributeExists::new(AttributeType::Label, "Shelf", false);
        assert_eq!(ids(&exp.execute(&g.all_note_set(), &exec)), vec!["books", "dune"]);
    }

    #[test]
    fn test_exists_prefix_match() {
        let g = graph();
        let exec = ExecutionContext::new(&g, MatchMode::Exact);
        let exact = AttributeExists::new(AttributeType::Label, "year", false);
        let prefix = AttributeExists::new(AttributeType::Label, "year", true);
        assert_eq!(ids(&exact.execute(&g.all_note_set(), &exec)), vec!["dune"]);
        assert_eq!(ids(&prefix.execute(&g.all_note_set(), &exec)), vec!["dune", "other"]);
    }

    #[test]
    fn test_comparison_is_case_insensitive() {
        let g = graph();
        let exec = ExecutionContext::new(&g, MatchMode::Exact);
        let cmp = Comparator::new(CompareOp::Eq, "FICTION").unwrap();
        let exp = AttributeComparison::new(AttributeType::Label, "shelf", cmp);
        assert_eq!(ids(&exp.execute(&g.all_note_set(), &exec)), vec!["books", "dune"]);
    }

    #[test]
    fn test_not_equal_requires_attribute() {
        let g = graph();
        let exec = ExecutionContext::new(&g, MatchMode::Exact);
        let cmp = Comparator::new(CompareOp::NotEq, "2000").unwrap();
        let exp = AttributeComparison::new(AttributeType::Label, "year", cmp);
        assert_eq!(ids(&exp.execute(&g.all_note_set(), &exec)), vec!["dune"]);
    }
}
