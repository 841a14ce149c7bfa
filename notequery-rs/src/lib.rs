//! notequery - a query language and ranked search engine for hierarchical
//! note graphs.
//!
//! # Overview
//!
//! notequery searches an in-memory graph of notes, where notes carry titles,
//! content, labels and relations and live under one or more parents:
//! - Fulltext search over titles, paths, attributes and content
//! - Label and relation filters (`#book`, `~author.#nationality=French`)
//! - Note properties and hierarchy (`note.parents.title = Books`)
//! - Boolean logic, parentheses, `orderBy` and `limit`
//! - Exact matching first, fuzzy matching as a fallback
//! - Snippets and highlighting for quick search UIs
//!
//! # Example
//!
//! ```no_run
//! use notequery::{Note, NoteGraph, SearchContext, SearchService};
//!
//! let mut graph = NoteGraph::new();
//! graph.insert_child("root", Note::new("dune", "Dune")).unwrap();
//! graph.add_label("dune", "book", "").unwrap();
//!
//! let service = SearchService::new(&graph);
//! let mut ctx = SearchContext::default();
//! for result in service.find_results_with_query("#book dune", &mut ctx) {
//!     println!("{} {}", result.note_path_title, result.score);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod search;

// Re-export main types at crate root
pub use config::{Config, SearchConfig};
pub use error::{NoteQueryError, Result};
pub use graph::{Attribute, AttributeType, Branch, Note, NoteGraph, NoteType};
pub use search::{SearchContext, SearchParams, SearchResult, SearchService};
