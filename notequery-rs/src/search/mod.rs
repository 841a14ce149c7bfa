//! The search engine: query language, expression evaluation and ranking.
//!
//! A query flows through [`lexer`], [`parens`] and [`parser`] into an
//! [`Expression`] tree, which [`SearchService`] executes against the note
//! graph in an exact and, when needed, a fuzzy phase.

pub mod comparator;
pub mod context;
pub mod expression;
pub mod highlight;
pub mod lexer;
pub mod note_set;
pub mod parens;
pub mod parser;
pub mod result;
pub mod service;
pub mod snippet;
pub mod text;
pub mod value;

pub use context::{DebugInfo, ExecutionContext, MatchMode, SearchContext, SearchParams};
pub use expression::Expression;
pub use highlight::highlight_search_results;
pub use lexer::{LexResult, Token, TokenKind, lex};
pub use note_set::NoteSet;
pub use parens::{TokenNode, handle_parens};
pub use parser::parse;
pub use result::SearchResult;
pub use service::{AutocompleteItem, SearchNoteResult, SearchService};
pub use snippet::{extract_attribute_snippet, extract_content_snippet};
