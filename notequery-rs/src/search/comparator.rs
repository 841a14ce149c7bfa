//! Value comparators used by attribute and property comparisons.

use super::text::{MAX_EDIT_DISTANCE, edit_distance, fuzzy_match_word};
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;

/// Comparison operator of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// `*=`
    EndsWith,
    /// `=*`
    StartsWith,
    /// `*=*`
    Contains,
    /// `%=`
    Regex,
    /// `~=`
    FuzzyEq,
    /// `~*`
    FuzzyContains,
}

impl CompareOp {
    pub fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "=" => CompareOp::Eq,
            "!=" => CompareOp::NotEq,
            ">" => CompareOp::Gt,
            ">=" => CompareOp::Gte,
            "<" => CompareOp::Lt,
            "<=" => CompareOp::Lte,
            "*=" => CompareOp::EndsWith,
            "=*" => CompareOp::StartsWith,
            "*=*" => CompareOp::Contains,
            "%=" => CompareOp::Regex,
            "~=" => CompareOp::FuzzyEq,
            "~*" => CompareOp::FuzzyContains,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::EndsWith => "*=",
            CompareOp::StartsWith => "=*",
            CompareOp::Contains => "*=*",
            CompareOp::Regex => "%=",
            CompareOp::FuzzyEq => "~=",
            CompareOp::FuzzyContains => "~*",
        }
    }

    fn is_ordering(self) -> bool {
        matches!(self, CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte)
    }

    pub fn is_fuzzy(self) -> bool {
        matches!(self, CompareOp::FuzzyEq | CompareOp::FuzzyContains)
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Gte => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
            _ => false,
        }
    }
}

/// A compiled `<op> <value>` test against lowercased candidate values.
#[derive(Debug, Clone)]
pub struct Comparator {
    pub op: CompareOp,
    pub value: String,
    number: Option<f64>,
    regex: Option<Regex>,
}

impl Comparator {
    /// Build a comparator. The value is lowercased. Fails on an invalid regex.
    pub fn new(op: CompareOp, value: &str) -> Result<Self, String> {
        let value = value.to_lowercase();
        let number = if op.is_ordering() {
            value.trim().parse::<f64>().ok().filter(|n| !n.is_nan())
        } else {
            None
        };
        let regex = if op == CompareOp::Regex {
            Some(
                Regex::new(&format!("(?ms){}", value))
                    .map_err(|e| format!("Invalid regular expression \"{}\": {}", value, e))?,
            )
        } else {
            None
        };
        Ok(Self {
            op,
            value,
            number,
            regex,
        })
    }

    /// `= value`, which cannot fail to build.
    pub fn equals(value: &str) -> Self {
        Self {
            op: CompareOp::Eq,
            value: value.to_lowercase(),
            number: None,
            regex: None,
        }
    }

    /// Test a candidate value. A missing value only satisfies `!=`.
    pub fn matches(&self, candidate: Option<&str>) -> bool {
        if let Some(number) = self.number {
            return candidate
                .and_then(|c| c.trim().parse::<f64>().ok())
                .and_then(|c| c.partial_cmp(&number))
                .is_some_and(|ord| self.op.accepts(ord));
        }

        let Some(candidate) = candidate else {
            return self.op == CompareOp::NotEq;
        };
        match self.op {
            CompareOp::Eq => candidate == self.value,
            CompareOp::NotEq => candidate != self.value,
            CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte => {
                self.op.accepts(candidate.cmp(self.value.as_str()))
            }
            CompareOp::EndsWith => !candidate.is_empty() && candidate.ends_with(&self.value),
            CompareOp::StartsWith => !candidate.is_empty() && candidate.starts_with(&self.value),
            CompareOp::Contains => !candidate.is_empty() && candidate.contains(&self.value),
            CompareOp::Regex => self.regex.as_ref().is_some_and(|re| re.is_match(candidate)),
            CompareOp::FuzzyEq => {
                !candidate.is_empty()
                    && edit_distance(candidate, &self.value, MAX_EDIT_DISTANCE) <= MAX_EDIT_DISTANCE
            }
            CompareOp::FuzzyContains => {
                !candidate.is_empty() && fuzzy_match_word(&self.value, candidate, MAX_EDIT_DISTANCE)
            }
        }
    }
}
