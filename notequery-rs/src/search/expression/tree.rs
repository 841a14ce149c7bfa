use super::Expression;
use crate::graph::{Note, NoteGraph};
use crate::search::context::{ExecutionContext, SearchContext};
use crate::search::note_set::NoteSet;
use std::fmt;

/// Run `sub` over the notes related to the input notes by `related`, then
/// keep the input notes with at least one accepted relative.
fn filter_by_relatives<'a>(
    sub: &Expression,
    input: &NoteSet<'a>,
    exec: &mut ExecutionContext<'a>,
    ctx: &SearchContext,
    related: impl Fn(&'a NoteGraph, &str) -> Vec<&'a Note>,
) -> NoteSet<'a> {
    let graph = exec.graph;
    let relatives: Vec<(&'a Note, Vec<&'a Note>)> = input
        .iter()
        .map(|note| (note, related(graph, &note.note_id)))
        .collect();

    let mut candidates = NoteSet::new();
    for (_, rel) in &relatives {
        candidates.add_all(rel.iter().copied());
    }
    let accepted = sub.execute(&candidates, exec, ctx);

    NoteSet::from_notes(
        relatives
            .into_iter()
            .filter(|(_, rel)| rel.iter().any(|r| accepted.has_note_id(&r.note_id)))
            .map(|(note, _)| note),
    )
}

pub(super) fn child_of<'a>(
    sub: &Expression,
    input: &NoteSet<'a>,
    exec: &mut ExecutionContext<'a>,
    ctx: &SearchContext,
) -> NoteSet<'a> {
    filter_by_relatives(sub, input, exec, ctx, |g, id| g.parent_notes(id))
}

pub(super) fn parent_of<'a>(
    sub: &Expression,
    input: &NoteSet<'a>,
    exec: &mut ExecutionContext<'a>,
    ctx: &SearchContext,
) -> NoteSet<'a> {
    filter_by_relatives(sub, input, exec, ctx, |g, id| g.child_notes(id))
}

pub(super) fn descendant_of<'a>(
    sub: &Expression,
    input: &NoteSet<'a>,
    exec: &mut ExecutionContext<'a>,
    ctx: &SearchContext,
) -> NoteSet<'a> {
    filter_by_relatives(sub, input, exec, ctx, |g, id| g.ancestors(id))
}

/// Depth restriction relative to the ancestor: `eqN`, `ltN` or `gtN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthCondition {
    Eq(usize),
    Lt(usize),
    Gt(usize),
}

impl DepthCondition {
    pub fn parse(condition: &str) -> Option<Self> {
        let condition = condition.trim().to_lowercase();
        let (kind, depth) = condition.split_at_checked(2)?;
        let depth: usize = depth.parse().ok()?;
        match kind {
            "eq" => Some(DepthCondition::Eq(depth)),
            "lt" => Some(DepthCondition::Lt(depth)),
            "gt" => Some(DepthCondition::Gt(depth)),
            _ => None,
        }
    }

    pub fn accepts(self, distance: usize) -> bool {
        match self {
            DepthCondition::Eq(d) => distance == d,
            DepthCondition::Lt(d) => distance < d,
            DepthCondition::Gt(d) => distance > d,
        }
    }
}

impl fmt::Display for DepthCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepthCondition::Eq(d) => write!(f, "eq{}", d),
            DepthCondition::Lt(d) => write!(f, "lt{}", d),
            DepthCondition::Gt(d) => write!(f, "gt{}", d),
        }
    }
}

/// Notes in the subtree of `ancestor_id`, the ancestor itself included.
#[derive(Debug, Clone)]
pub struct Ancestor {
    pub ancestor_id: String,
    pub depth: Option<DepthCondition>,
}

impl Ancestor {
    /// An unrecognized depth condition is logged and ignored.
    pub fn new(ancestor_id: &str, depth: Option<&str>) -> Self {
        let depth = depth.filter(|d| !d.trim().is_empty()).and_then(|d| {
            let parsed = DepthCondition::parse(d);
            if parsed.is_none() {
                log::warn!("Unrecognized depth condition value {}", d);
            }
            parsed
        });
        Self {
            ancestor_id: ancestor_id.to_string(),
            depth,
        }
    }

    pub fn execute<'a>(&self, input: &NoteSet<'a>, exec: &ExecutionContext<'a>) -> NoteSet<'a> {
        let graph = exec.graph;
        if !graph.contains(&self.ancestor_id) {
            log::error!("Subtree note '{}' was not found.", self.ancestor_id);
            return NoteSet::new();
        }
        let subtree = NoteSet::from_notes(graph.subtree(&self.ancestor_id));

        NoteSet::from_notes(input.iter().filter(|note| {
            if !subtree.has_note_id(&note.note_id) {
                return false;
            }
            match self.depth {
                None => true,
                Some(condition) => graph
                    .distance_to_ancestor(&note.note_id, &self.ancestor_id)
                    .is_some_and(|d| condition.accepts(d)),
            }
        }))
    }
}

impl fmt::Display for Ancestor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.depth {
            Some(depth) => write!(f, "ANCESTOR({}, {})", self.ancestor_id, depth),
            None => write!(f, "ANCESTOR({})", self.ancestor_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AttributeType;
    use crate::search::context::MatchMode;
    use crate::search::expression::AttributeExists;

    fn graph() -> NoteGraph {
        let mut g = NoteGraph::new();
        g.insert_child("root", Note::new("books", "Books")).unwrap();
        g.insert_child("books", Note::new("scifi", "Sci-fi")).unwrap();
        g.insert_child("scifi", Note::new("dune", "Dune")).unwrap();
        g.insert_child("root", Note::new("people", "People")).unwrap();
        g.add_label("books", "shelf", "").unwrap();
        g
    }

    fn shelf() -> Expression {
        Expression::AttributeExists(AttributeExists::new(AttributeType::Label, "shelf", false))
    }

    fn ids(set: &NoteSet<'_>) -> Vec<String> {
        set.iter().map(|n| n.note_id.clone()).collect()
    }

    #[test]
    fn test_depth_condition_parse() {
        assert_eq!(DepthCondition::parse("eq1"), Some(DepthCondition::Eq(1)));
        assert_eq!(DepthCondition::parse("LT3"), Some(DepthCondition::Lt(3)));
        assert_eq!(DepthCondition::parse("gt0"), Some(DepthCondition::Gt(0)));
        assert_eq!(DepthCondition::parse("ne2"), None);
        assert_eq!(DepthCondition::parse("eq"), None);
    }

    #[test]
    fn test_hierarchy_filters() {
        let g = graph();
        let ctx = SearchContext::default();
        let mut exec = ExecutionContext::new(&g, MatchMode::Exact);
        let all = g.all_note_set();

        assert_eq!(ids(&child_of(&shelf(), &all, &mut exec, &ctx)), vec!["scifi"]);
        assert_eq!(ids(&parent_of(&shelf(), &all, &mut exec, &ctx)), vec!["root"]);
        assert_eq!(ids(&descendant_of(&shelf(), &all, &mut exec, &ctx)), vec!["scifi", "dune"]);
    }

    #[test]
    fn test_ancestor_with_depth() {
        let g = graph();
        let exec = ExecutionContext::new(&g, MatchMode::Exact);
        let all = g.all_note_set();

        assert_eq!(ids(&Ancestor::new("books", None).execute(&all, &exec)), vec!["books", "scifi", "dune"]);
        assert_eq!(ids(&Ancestor::new("books", Some("eq1")).execute(&all, &exec)), vec!["scifi"]);
        assert_eq!(ids(&Ancestor::new("books", Some("gt1")).execute(&all, &exec)), vec!["dune"]);
        assert_eq!(ids(&Ancestor::new("books", Some("lt1")).execute(&all, &exec)), vec!["books"]);
    }

    #[test]
    fn test_ancestor_invalid_depth_is_ignored() {
        let exp = Ancestor::new("books", Some("around5"));
        assert!(exp.depth.is_none());
    }

    #[test]
    fn test_missing_ancestor_matches_nothing() {
        let g = graph();
        let exec = ExecutionContext::new(&g, MatchMode::Exact);
        assert!(Ancestor::new("nope", None).execute(&g.all_note_set(), &exec).is_empty());
    }
}
