//! Per-query configuration and diagnostics.

use super::lexer::Token;
use super::parens::TokenNode;
use crate::graph::{NoProtectedSession, NoteGraph, NoteSizeStats, ProtectedSession};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How fulltext tokens are compared within one execution phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Exact,
    Fuzzy,
}

/// Caller-facing search options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchParams {
    /// Skip content search, match titles, paths and attributes only.
    pub fast_search: bool,
    pub include_archived_notes: bool,
    pub include_hidden_notes: bool,
    /// Skip attributes whose names start with `_` or are internal links.
    pub ignore_internal_attributes: bool,
    pub ancestor_note_id: Option<String>,
    /// `eqN`, `ltN` or `gtN`.
    pub ancestor_depth: Option<String>,
    pub order_by: Option<String>,
    pub order_direction: Option<String>,
    pub limit: Option<usize>,
    pub debug: bool,
    pub fuzzy_attribute_search: bool,
    pub enable_fuzzy_matching: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            fast_search: false,
            include_archived_notes: false,
            include_hidden_notes: false,
            ignore_internal_attributes: false,
            ancestor_note_id: None,
            ancestor_depth: None,
            order_by: None,
            order_direction: None,
            limit: None,
            debug: false,
            fuzzy_attribute_search: false,
            enable_fuzzy_matching: true,
        }
    }
}

/// Parser internals kept when a query runs in debug mode.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub fulltext_tokens: Vec<Token>,
    pub structured_expression_tokens: Vec<TokenNode>,
    pub expression: String,
}

/// Configuration and accumulated state of one query.
///
/// Query errors are soft: they are collected here and never abort the search.
#[derive(Debug, Clone)]
pub struct SearchContext {
    pub fast_search: bool,
    pub include_archived_notes: bool,
    pub include_hidden_notes: bool,
    pub ignore_internal_attributes: bool,
    pub ancestor_note_id: Option<String>,
    pub ancestor_depth: Option<String>,
    pub order_by: Option<String>,
    pub order_direction: Option<String>,
    pub limit: Option<usize>,
    pub debug: bool,
    pub debug_info: Option<DebugInfo>,
    pub fuzzy_attribute_search: bool,
    pub enable_fuzzy_matching: bool,
    /// Terms to emphasize in titles and snippets.
    pub highlighted_tokens: Vec<String>,
    pub original_query: String,
    pub fulltext_query: String,
    /// Set when a property needs blob size statistics.
    pub db_load_needed: bool,
    /// The query itself carries an `orderBy` clause.
    pub has_explicit_ordering: bool,
    errors: Vec<String>,
    executed_phases: Vec<MatchMode>,
}

impl Default for SearchContext {
    fn default() -> Self {
        Self::new(SearchParams::default())
    }
}

impl SearchContext {
    pub fn new(params: SearchParams) -> Self {
        Self {
            fast_search: params.fast_search,
            include_archived_notes: params.include_archived_notes,
            include_hidden_notes: params.include_hidden_notes,
            ignore_internal_attributes: params.ignore_internal_attributes,
            ancestor_note_id: params.ancestor_note_id,
            ancestor_depth: params.ancestor_depth,
            order_by: params.order_by,
            order_direction: params.order_direction,
            limit: params.limit,
            debug: params.debug,
            debug_info: None,
            fuzzy_attribute_search: params.fuzzy_attribute_search,
            enable_fuzzy_matching: params.enable_fuzzy_matching,
            highlighted_tokens: Vec::new(),
            original_query: String::new(),
            fulltext_query: String::new(),
            db_load_needed: false,
            has_explicit_ordering: false,
            errors: Vec::new(),
            executed_phases: Vec::new(),
        }
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    /// First recorded error.
    pub fn error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn add_highlighted_token(&mut self, token: impl Into<String>) {
        let token = token.into();
        if !self.highlighted_tokens.contains(&token) {
            self.highlighted_tokens.push(token);
        }
    }

    pub(crate) fn record_phase(&mut self, mode: MatchMode) {
        self.executed_phases.push(mode);
    }

    /// Phases run by the last search with this context, in order.
    pub fn executed_phases(&self) -> &[MatchMode] {
        &self.executed_phases
    }

    /// Clear per-run state so the context can be reused for another query.
    pub(crate) fn reset(&mut self) {
        self.highlighted_tokens.clear();
        self.errors.clear();
        self.executed_phases.clear();
        self.debug_info = None;
        self.db_load_needed = false;
        self.has_explicit_ordering = false;
        self.fulltext_query.clear();
    }
}

/// State threaded through one execution of an expression tree.
pub struct ExecutionContext<'a> {
    pub graph: &'a NoteGraph,
    pub mode: MatchMode,
    /// Path through which a fulltext match was found, by note id.
    pub note_id_to_note_path: HashMap<String, Vec<String>>,
    pub stats: Option<&'a NoteSizeStats>,
    pub protected: &'a dyn ProtectedSession,
    /// Words found by fuzzy matching, to be highlighted.
    pub fuzzy_matched_words: Vec<String>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(graph: &'a NoteGraph, mode: MatchMode) -> Self {
        Self {
            graph,
            mode,
            note_id_to_note_path: HashMap::new(),
            stats: None,
            protected: &NoProtectedSession,
            fuzzy_matched_words: Vec::new(),
        }
    }

    pub fn with_stats(mut self, stats: Option<&'a NoteSizeStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_protected(mut self, protected: &'a dyn ProtectedSession) -> Self {
        self.protected = protected;
        self
    }

    pub fn is_fuzzy(&self) -> bool {
        self.mode == MatchMode::Fuzzy
    }

    pub(crate) fn record_fuzzy_word(&mut self, word: &str) {
        if !self.fuzzy_matched_words.iter().any(|w| w == word) {
            self.fuzzy_matched_words.push(word.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ctx = SearchContext::default();
        assert!(ctx.enable_fuzzy_matching);
        assert!(!ctx.fast_search);
        assert!(ctx.error().is_none());
        assert!(ctx.executed_phases().is_empty());
    }

    #[test]
    fn test_errors_accumulate() {
        let mut ctx = SearchContext::default();
        ctx.add_error("first");
        ctx.add_error("second");
        assert!(ctx.has_error());
        assert_eq!(ctx.error(), Some("first"));
        assert_eq!(ctx.errors().len(), 2);
    }

    #[test]
    fn test_highlighted_tokens_unique() {
        let mut ctx = SearchContext::default();
        ctx.add_highlighted_token("dune");
        ctx.add_highlighted_token("dune");
        assert_eq!(ctx.highlighted_tokens, vec!["dune"]);
    }

    #[test]
    fn test_params_deserialize_camel_case() {
        let params: SearchParams =
            serde_json::from_str(r#"{"fastSearch": true, "ancestorNoteId": "books"}"#).unwrap();
        assert!(params.fast_search);
        assert!(params.enable_fuzzy_matching);
        assert_eq!(params.ancestor_note_id.as_deref(), Some("books"));
    }
}
