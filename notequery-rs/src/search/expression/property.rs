use crate::search::comparator::{CompareOp, Comparator};
use crate::search::context::ExecutionContext;
use crate::search::note_set::NoteSet;
use crate::search::value::{property_name, property_value};
use std::fmt;

/// `note.<property> <op> value`.
#[derive(Debug, Clone)]
pub struct PropertyComparison {
    pub property: &'static str,
    pub comparator: Comparator,
}

impl PropertyComparison {
    pub fn new(property: &str, op: CompareOp, value: &str) -> Result<Self, String> {
        let property = property_name(property)
            .ok_or_else(|| format!("Unrecognized property '{}'", property))?;
        Ok(Self {
            property,
            comparator: Comparator::new(op, value)?,
        })
    }

    /// The implicit `note.isArchived = false` filter.
    pub fn not_archived() -> Self {
        Self {
            property: "isArchived",
            comparator: Comparator::equals("false"),
        }
    }

    pub fn execute<'a>(&self, input: &NoteSet<'a>, exec: &ExecutionContext<'a>) -> NoteSet<'a> {
        NoteSet::from_notes(input.iter().filter(|note| {
            let value = property_value(exec.graph, note, self.property, exec.stats);
            self.comparator.matches(value.as_deref())
        }))
    }
}

impl fmt::Display for PropertyComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "note.{} {} '{}'",
            self.property,
            self.comparator.op.as_str(),
            self.comparator.value
        )
    }
}
