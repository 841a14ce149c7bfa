use super::Expression;
use crate::graph::{AttributeType, Note};
use crate::search::context::{ExecutionContext, SearchContext};
use crate::search::note_set::NoteSet;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationDirection {
    /// From the note to the relation target (`~author.…`, `note.relations.author.…`).
    Forward,
    /// From the relation target back to its sources (`note.targetRelations.author.…`).
    Backward,
}

/// Follow relations named `name` and test the notes on the other end.
#[derive(Debug, Clone)]
pub struct Relation {
    pub name: String,
    pub direction: RelationDirection,
    /// Condition on the other end. Without one, any existing other end matches.
    pub sub: Option<Box<Expression>>,
}

impl Relation {
    pub fn new(name: &str, direction: RelationDirection, sub: Option<Expression>) -> Self {
        Self {
            name: name.to_lowercase(),
            direction,
            sub: sub.map(Box::new),
        }
    }

    /// Notes on the other end of the relation, for one input note.
    fn linked<'a>(&self, exec: &ExecutionContext<'a>, note: &Note) -> Vec<&'a Note> {
        let graph = exec.graph;
        match self.direction {
            RelationDirection::Forward => graph
                .attributes_named(&note.note_id, AttributeType::Relation, &self.name)
                .into_iter()
                .filter_map(|rel| graph.get_note(&rel.value))
                .collect(),
            RelationDirection::Backward => graph
                .target_relations(&note.note_id)
                .into_iter()
                .filter(|rel| rel.name.to_lowercase() == self.name)
                .filter_map(|rel| graph.get_note(&rel.note_id))
                .collect(),
        }
    }

    pub fn execute<'a>(
        &self,
        input: &NoteSet<'a>,
        exec: &mut ExecutionContext<'a>,
        ctx: &SearchContext,
    ) -> NoteSet<'a> {
        let mut links: HashMap<&str, Vec<&'a Note>> = HashMap::new();
        let mut others = NoteSet::new();
        for note in input.iter() {
            let linked = self.linked(exec, note);
            others.add_all(linked.iter().copied());
            links.insert(note.note_id.as_str(), linked);
        }

        let accepted = match &self.sub {
            Some(sub) => sub.execute(&others, exec, ctx),
            None => others,
        };

        NoteSet::from_notes(input.iter().filter(|note| {
            links
                .get(note.note_id.as_str())
                .is_some_and(|linked| linked.iter().any(|l| accepted.has_note_id(&l.note_id)))
        }))
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match self.direction {
            RelationDirection::Forward => "",
            RelationDirection::Backward => "<-",
        };
        match &self.sub {
            Some(sub) => write!(f, "{}~{}({})", arrow, self.name, sub),
            None => write!(f, "{}~{}", arrow, self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NoteGraph;
    use crate::search::comparator::{CompareOp, Comparator};
    use crate::search::context::MatchMode;
    use crate::search::expression::AttributeComparison;

    fn graph() -> NoteGraph {
        let mut g = NoteGraph::new();
        g.insert_child("root", Note::new("dune", "Dune")).unwrap();
        g.insert_child("root", Note::new("emma", "Emma")).unwrap();
        g.insert_child("root", Note::new("herbert", "Frank Herbert")).unwrap();
        g.insert_child("root", Note::new("austen", "Jane Austen")).unwrap();
        g.add_relation("dune", "author", "herbert").unwrap();
        g.add_relation("emma", "author", "austen").unwrap();
        g.add_relation("emma", "translator", "ghost").unwrap();
        g.add_label("herbert", "nationality", "American").unwrap();
        g.add_label("austen", "nationality", "English").unwrap();
        g
    }

    fn nationality(value: &str) -> Expression {
        Expression::AttributeComparison(AttributeComparison::new(
            AttributeType::Label,
            "nationality",
            Comparator::new(CompareOp::Eq, value).unwrap(),
        ))
    }

    fn run(g: &NoteGraph, exp: &Relation) -> Vec<String> {
        let ctx = SearchContext::default();
        let mut exec = ExecutionContext::new(g, MatchMode::Exact);
        exp.execute(&g.all_note_set(), &mut exec, &ctx)
            .iter()
            .map(|n| n.note_id.clone())
            .collect()
    }

    #[test]
    fn test_forward_with_condition() {
        let g = graph();
        let exp = Relation::new("author", RelationDirection::Forward, Some(nationality("english")));
        assert_eq!(run(&g, &exp), vec!["emma"]);
    }

    #[test]
    fn test_forward_without_condition_needs_target() {
        let g = graph();
        assert_eq!(run(&g, &Relation::new("AUTHOR", RelationDirection::Forward, None)), vec!["dune", "emma"]);
        // the translator relation points at a missing note
        assert!(run(&g, &Relation::new("translator", RelationDirection::Forward, None)).is_empty());
    }

    #[test]
    fn test_backward() {
        let g = graph();
        let title_is_dune = Expression::PropertyComparison(
            crate::search::expression::PropertyComparison::new("title", CompareOp::Eq, "Dune").unwrap(),
        );
        let exp = Relation::new("author", RelationDirection::Backward, Some(title_is_dune));
        assert_eq!(run(&g, &exp), vec!["herbert"]);
    }

    #[test]
    fn test_display() {
        let exp = Relation::new("author", RelationDirection::Backward, None);
        assert_eq!(exp.to_string(), "<-~author");
    }
}
