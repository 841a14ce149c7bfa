//! Expression tree produced by the parser.
//!
//! Every node consumes the note set produced so far and returns the subset
//! (or, for ordering, the reordering) it accepts. Execution never fails: a
//! reference that cannot be resolved simply matches nothing.

mod attribute;
mod content;
mod fulltext;
mod order;
mod property;
mod relation;
mod tree;

pub use attribute::{AttributeComparison, AttributeExists};
pub use content::{Content, preprocess_content};
pub use fulltext::FlatText;
pub use order::{OrderBy, OrderDefinition, OrderDirection};
pub use property::PropertyComparison;
pub use relation::{Relation, RelationDirection};
pub use tree::{Ancestor, DepthCondition};

use super::context::{ExecutionContext, SearchContext};
use super::note_set::NoteSet;
use std::fmt;

#[derive(Debug, Clone)]
pub enum Expression {
    /// Notes accepted by every sub-expression, evaluated left to right.
    And(Vec<Expression>),
    /// Notes accepted by any sub-expression.
    Or(Vec<Expression>),
    /// Input notes the sub-expression rejects.
    Not(Box<Expression>),
    /// Every input note.
    True,
    AttributeExists(AttributeExists),
    AttributeComparison(AttributeComparison),
    PropertyComparison(PropertyComparison),
    Relation(Relation),
    /// Notes with a parent accepted by the sub-expression (`note.parents.…`).
    ChildOf(Box<Expression>),
    /// Notes with a child accepted by the sub-expression (`note.children.…`).
    ParentOf(Box<Expression>),
    /// Notes with an ancestor accepted by the sub-expression (`note.ancestors.…`).
    DescendantOf(Box<Expression>),
    /// Notes inside the subtree of a given note.
    Ancestor(Ancestor),
    FlatText(FlatText),
    Content(Content),
    OrderBy(OrderBy),
}

impl Expression {
    /// AND of the given expressions. `None`s are skipped, a single
    /// expression is returned as is.
    pub fn and_of(expressions: impl IntoIterator<Item = Option<Expression>>) -> Option<Expression> {
        let mut subs: Vec<Expression> = expressions.into_iter().flatten().collect();
        match subs.len() {
            0 => None,
            1 => subs.pop(),
            _ => Some(Expression::And(subs)),
        }
    }

    pub fn or_of(expressions: impl IntoIterator<Item = Option<Expression>>) -> Option<Expression> {
        let mut subs: Vec<Expression> = expressions.into_iter().flatten().collect();
        match subs.len() {
            0 => None,
            1 => subs.pop(),
            _ => Some(Expression::Or(subs)),
        }
    }

    pub fn execute<'a>(
        &self,
        input: &NoteSet<'a>,
        exec: &mut ExecutionContext<'a>,
        ctx: &SearchContext,
    ) -> NoteSet<'a> {
        match self {
            Expression::And(subs) => {
                let mut current = input.clone();
                for sub in subs {
                    current = sub.execute(&current, exec, ctx);
                    if current.is_empty() {
                        break;
                    }
                }
                current
            }
            Expression::Or(subs) => {
                let mut result = NoteSet::new();
                for sub in subs {
                    let remaining = input.minus(&result);
                    if remaining.is_empty() {
                        break;
                    }
                    let found = sub.execute(&remaining, exec, ctx);
                    result.add_all(found.iter());
                }
                result
            }
            Expression::Not(sub) => {
                let matched = sub.execute(input, exec, ctx);
                input.minus(&matched)
            }
            Expression::True => {
                let mut all = input.clone();
                all.sorted = false;
                all
            }
            Expression::AttributeExists(e) => e.execute(input, exec),
            Expression::AttributeComparison(e) => e.execute(input, exec),
            Expression::PropertyComparison(e) => e.execute(input, exec),
            Expression::Relation(e) => e.execute(input, exec, ctx),
            Expression::ChildOf(sub) => tree::child_of(sub, input, exec, ctx),
            Expression::ParentOf(sub) => tree::parent_of(sub, input, exec, ctx),
            Expression::DescendantOf(sub) => tree::descendant_of(sub, input, exec, ctx),
            Expression::Ancestor(e) => e.execute(input, exec),
            Expression::FlatText(e) => e.execute(input, exec),
            Expression::Content(e) => e.execute(input, exec),
            Expression::OrderBy(e) => e.execute(input, exec, ctx),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, name: &str, subs: &[Expression]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, sub) in subs.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", sub)?;
    }
    write!(f, ")")
}

/// Compact one-line rendering, used by `explain` and debug output.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::And(subs) => write_list(f, "AND", subs),
            Expression::Or(subs) => write_list(f, "OR", subs),
            Expression::Not(sub) => write!(f, "NOT({})", sub),
            Expression::True => write!(f, "TRUE"),
            Expression::AttributeExists(e) => write!(f, "{}", e),
            Expression::AttributeComparison(e) => write!(f, "{}", e),
            Expression::PropertyComparison(e) => write!(f, "{}", e),
            Expression::Relation(e) => write!(f, "{}", e),
            Expression::ChildOf(sub) => write!(f, "note.parents({})", sub),
            Expression::ParentOf(sub) => write!(f, "note.children({})", sub),
            Expression::DescendantOf(sub) => write!(f, "note.ancestors({})", sub),
            Expression::Ancestor(e) => write!(f, "{}", e),
            Expression::FlatText(e) => write!(f, "{}", e),
            Expression::Content(e) => write!(f, "{}", e),
            Expression::OrderBy(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AttributeType, Note, NoteGraph};
    use crate::search::context::MatchMode;

    fn graph() -> NoteGraph {
        let mut g = NoteGraph::new();
        for (id, title) in [("a", "Alpha"), ("b", "Beta"), ("c", "Gamma")] {
            g.insert_child("root", Note::new(id, title)).unwrap();
        }
        g.add_label("a", "x", "").unwrap();
        g.add_label("b", "x", "").unwrap();
        g.add_label("b", "y", "").unwrap();
        g.add_label("c", "y", "").unwrap();
        g
    }

    fn label(name: &str) -> Expression {
        Expression::AttributeExists(AttributeExists::new(AttributeType::Label, name, false))
    }

    fn run(g: &NoteGraph, exp: &Expression) -> Vec<String> {
        let ctx = SearchContext::default();
        let mut exec = ExecutionContext::new(g, MatchMode::Exact);
        exp.execute(&g.all_note_set(), &mut exec, &ctx)
            .iter()
            .map(|n| n.note_id.clone())
            .collect()
    }

    #[test]
    fn test_and_of_unwraps_single() {
        assert!(Expression::and_of([None, None]).is_none());
        assert!(matches!(
            Expression::and_of([None, Some(Expression::True)]),
            Some(Expression::True)
        ));
        assert!(matches!(
            Expression::and_of([Some(Expression::True), Some(Expression::True)]),
            Some(Expression::And(subs)) if subs.len() == 2
        ));
    }

    #[test]
    fn test_boolean_operators() {
        let g = graph();
        assert_eq!(run(&g, &Expression::And(vec![label("x"), label("y")])), vec!["b"]);
        assert_eq!(run(&g, &Expression::Or(vec![label("x"), label("y")])), vec!["a", "b", "c"]);
        assert_eq!(
            run(&g, &Expression::Not(Box::new(label("x")))),
            vec!["root", "c"]
        );
    }

    #[test]
    fn test_not_is_scoped_to_input() {
        let g = graph();
        // y AND NOT x: the complement is taken within the y notes only
        let exp = Expression::And(vec![label("y"), Expression::Not(Box::new(label("x")))]);
        assert_eq!(run(&g, &exp), vec!["c"]);
    }

    #[test]
    fn test_display() {
        let exp = Expression::Or(vec![label("x"), Expression::Not(Box::new(label("y")))]);
        assert_eq!(exp.to_string(), "OR(#x, NOT(#y))");
    }
}
