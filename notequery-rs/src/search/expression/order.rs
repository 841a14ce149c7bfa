use super::Expression;
use crate::graph::Note;
use crate::search::context::{ExecutionContext, SearchContext};
use crate::search::note_set::NoteSet;
use crate::search::value::ValueExtractor;
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    /// `desc` (any case) is descending, anything else ascending.
    pub fn parse(direction: &str) -> Self {
        if direction.trim().eq_ignore_ascii_case("desc") {
            OrderDirection::Desc
        } else {
            OrderDirection::Asc
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderDirection::Asc => "asc",
            OrderDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderDefinition {
    pub extractor: ValueExtractor,
    pub direction: OrderDirection,
}

/// Sort the notes accepted by `sub`, then cut them to `limit`.
///
/// The result is marked sorted so relevance scoring does not reorder it.
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub sub: Box<Expression>,
    pub definitions: Vec<OrderDefinition>,
    pub limit: Option<usize>,
}

impl OrderBy {
    pub fn new(sub: Expression, definitions: Vec<OrderDefinition>, limit: Option<usize>) -> Self {
        Self {
            sub: Box::new(sub),
            definitions,
            limit,
        }
    }

    pub fn execute<'a>(
        &self,
        input: &NoteSet<'a>,
        exec: &mut ExecutionContext<'a>,
        ctx: &SearchContext,
    ) -> NoteSet<'a> {
        let found = self.sub.execute(input, exec, ctx);

        let mut keyed: Vec<(&'a Note, Vec<Option<String>>)> = found
            .iter()
            .map(|note| {
                let values = self
                    .definitions
                    .iter()
                    .map(|def| def.extractor.extract(exec.graph, note, exec.stats))
                    .collect();
                (note, values)
            })
            .collect();

        if !self.definitions.is_empty() {
            keyed.sort_by(|(_, a), (_, b)| self.compare(a, b));
        }

        let mut notes: Vec<&'a Note> = keyed.into_iter().map(|(note, _)| note).collect();
        if let Some(limit) = self.limit {
            notes.truncate(limit);
        }

        let mut result = NoteSet::new();
        result.set_order(notes);
        result.sorted = true;
        result
    }

    fn compare(&self, a: &[Option<String>], b: &[Option<String>]) -> Ordering {
        for (i, def) in self.definitions.iter().enumerate() {
            let a = a[i].as_deref().filter(|v| !v.is_empty());
            let b = b[i].as_deref().filter(|v| !v.is_empty());

            let (smaller, larger) = match def.direction {
                OrderDirection::Asc => (Ordering::Less, Ordering::Greater),
                OrderDirection::Desc => (Ordering::Greater, Ordering::Less),
            };

            let ordering = match (a, b) {
                (None, None) => continue,
                // a missing value sorts as the largest
                (Some(_), None) => smaller,
                (None, Some(_)) => larger,
                (Some(a), Some(b)) => match compare_values(a, b) {
                    Ordering::Less => smaller,
                    Ordering::Greater => larger,
                    Ordering::Equal => continue,
                },
            };
            return ordering;
        }
        Ordering::Equal
    }
}

/// Numbers compare numerically, anything else as text.
fn compare_values(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(a), Ok(b)) => a.total_cmp(&b),
        _ => a.cmp(b),
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ORDERBY({}", self.sub)?;
        for def in &self.definitions {
            write!(f, "; {} {}", def.extractor.path().join("."), def.direction.as_str())?;
        }
        if let Some(limit) = self.limit {
            write!(f, "; limit {}", limit)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NoteGraph;
    use crate::search::context::MatchMode;

    fn graph() -> NoteGraph {
        let mut g = NoteGraph::new();
        for (id, title, year) in [("a", "Banana", "10"), ("b", "apple", "9"), ("c", "Cherry", "")] {
            g.insert_child("root", Note::new(id, title)).unwrap();
            if !year.is_empty() {
                g.add_label(id, "year", year).unwrap();
            }
        }
        g
    }

    fn definition(path: &[&str], direction: OrderDirection) -> OrderDefinition {
        let path: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        OrderDefinition {
            extractor: ValueExtractor::new(&path),
            direction,
        }
    }

    fn run(g: &NoteGraph, exp: &OrderBy) -> (Vec<String>, bool) {
        let ctx = SearchContext::default();
        let mut exec = ExecutionContext::new(g, MatchMode::Exact);
        let input = NoteSet::from_notes(["a", "b", "c"].iter().filter_map(|id| g.get_note(id)));
        let result = exp.execute(&input, &mut exec, &ctx);
        (result.iter().map(|n| n.note_id.clone()).collect(), result.sorted)
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(OrderDirection::parse("DESC"), OrderDirection::Desc);
        assert_eq!(OrderDirection::parse("asc"), OrderDirection::Asc);
        assert_eq!(OrderDirection::parse("sideways"), OrderDirection::Asc);
    }

    #[test]
    fn test_title_is_case_insensitive() {
        let g = graph();
        let exp = OrderBy::new(Expression::True, vec![definition(&["note", "title"], OrderDirection::Asc)], None);
        assert_eq!(run(&g, &exp), (vec!["b".into(), "a".into(), "c".into()], true));
    }

    #[test]
    fn test_numeric_values_and_missing_last() {
        let g = graph();
        let exp = OrderBy::new(Expression::True, vec![definition(&["#year"], OrderDirection::Asc)], None);
        assert_eq!(run(&g, &exp).0, vec!["b", "a", "c"]);

        let exp = OrderBy::new(Expression::True, vec![definition(&["#year"], OrderDirection::Desc)], None);
        // descending flips the missing value placement as well
        assert_eq!(run(&g, &exp).0, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_second_definition_breaks_ties() {
        let mut g = graph();
        g.add_label("c", "year", "9").unwrap();
        let exp = OrderBy::new(
            Expression::True,
            vec![
                definition(&["#year"], OrderDirection::Asc),
                definition(&["note", "title"], OrderDirection::Desc),
            ],
            None,
        );
        assert_eq!(run(&g, &exp).0, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_limit_without_definitions() {
        let g = graph();
        let exp = OrderBy::new(Expression::True, Vec::new(), Some(2));
        assert_eq!(run(&g, &exp), (vec!["a".into(), "b".into()], true));
        assert_eq!(exp.to_string(), "ORDERBY(TRUE; limit 2)");
    }
}
