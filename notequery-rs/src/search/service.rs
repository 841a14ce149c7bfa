//! Query entry points: parsing, the exact/fuzzy phases, ranking and the
//! autocomplete and saved-search wrappers.

use super::context::{ExecutionContext, MatchMode, SearchContext, SearchParams};
use super::expression::Expression;
use super::highlight::highlight_search_results;
use super::lexer::lex;
use super::parens::handle_parens;
use super::parser::parse;
use super::result::{SearchResult, sort_results};
use super::snippet::{extract_attribute_snippet, extract_content_snippet};
use crate::config::SearchConfig;
use crate::error::Result;
use crate::graph::{
    AttributeType, BlobStatsSource, NoProtectedSession, Note, NoteGraph, NoteSizeStats, NoteType,
    ProtectedSession, ROOT_NOTE_ID,
};
use serde::Serialize;
use std::collections::HashSet;

const FOLDER_ICON: &str = "bx bx-folder";
const FALLBACK_ICON: &str = "bx bx-note";

/// Outcome of running a saved search note.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchNoteResult {
    pub search_result_note_ids: Vec<String>,
    pub highlighted_tokens: Vec<String>,
    pub error: Option<String>,
}

/// One row of the autocomplete dropdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutocompleteItem {
    pub note_path: String,
    pub note_title: String,
    pub note_path_title: String,
    pub highlighted_note_path_title: Option<String>,
    pub content_snippet: Option<String>,
    pub highlighted_content_snippet: Option<String>,
    pub attribute_snippet: Option<String>,
    pub highlighted_attribute_snippet: Option<String>,
    pub icon: String,
}

/// Search over one note graph.
///
/// The graph is read-only for the lifetime of the service; every query gets
/// its own [`SearchContext`].
pub struct SearchService<'g> {
    graph: &'g NoteGraph,
    config: SearchConfig,
    blob_stats: Option<&'g dyn BlobStatsSource>,
    protected: &'g dyn ProtectedSession,
}

impl<'g> SearchService<'g> {
    pub fn new(graph: &'g NoteGraph) -> Self {
        Self {
            graph,
            config: SearchConfig::default(),
            blob_stats: None,
            protected: &NoProtectedSession,
        }
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Source of blob rows for the size properties.
    pub fn with_blob_stats(mut self, source: &'g dyn BlobStatsSource) -> Self {
        self.blob_stats = Some(source);
        self
    }

    pub fn with_protected_session(mut self, session: &'g dyn ProtectedSession) -> Self {
        self.protected = session;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    /// Lex, structure and parse `query`.
    ///
    /// `None` when the parentheses do not balance; the reason is recorded on
    /// the context.
    pub fn parse_query_to_expression(&self, query: &str, ctx: &mut SearchContext) -> Option<Expression> {
        let lexed = lex(query);
        ctx.fulltext_query = lexed.fulltext_query;

        let structured = match handle_parens(lexed.expression_tokens) {
            Ok(structured) => structured,
            Err(e) => {
                ctx.add_error(e.to_string());
                return None;
            }
        };

        let expression = parse(&lexed.fulltext_tokens, &structured, ctx);

        if let Some(info) = &ctx.debug_info {
            match serde_json::to_string_pretty(info) {
                Ok(json) => log::info!("Search debug: {}", json),
                Err(e) => log::warn!("Cannot serialize search debug info: {}", e),
            }
        }

        Some(expression)
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Ranked results for `query`, without snippets or highlighting.
    ///
    /// Query errors never fail the call: they are left on `ctx` and the
    /// results are whatever could still be computed.
    pub fn find_results_with_query(&self, query: &str, ctx: &mut SearchContext) -> Vec<SearchResult> {
        ctx.reset();
        ctx.original_query = query.to_string();

        let Some(expression) = self.parse_query_to_expression(query, ctx) else {
            return Vec::new();
        };

        let stats = self.load_stats(ctx);
        let stats = stats.as_ref();

        // pure expression queries and explicit orderings keep a single pass,
        // a second phase would interfere with their order
        let single_phase = query.trim_start().starts_with('#') || ctx.order_by.is_some() || ctx.has_explicit_ordering;
        if single_phase || !ctx.enable_fuzzy_matching {
            return self.perform_search(&expression, ctx, MatchMode::Exact, stats);
        }

        let exact = self.perform_search(&expression, ctx, MatchMode::Exact, stats);
        let high_quality = exact
            .iter()
            .filter(|r| r.score >= self.config.min_score_for_quality)
            .count();
        if high_quality >= self.config.min_result_threshold {
            log::debug!(
                "{} high quality exact results for '{}', skipping fuzzy phase",
                high_quality,
                query
            );
            return exact;
        }

        let fuzzy = self.perform_search(&expression, ctx, MatchMode::Fuzzy, stats);
        log::debug!(
            "'{}': {} exact and {} fuzzy results",
            query,
            exact.len(),
            fuzzy.len()
        );
        merge_exact_and_fuzzy(exact, fuzzy)
    }

    fn load_stats(&self, ctx: &SearchContext) -> Option<NoteSizeStats> {
        if !ctx.db_load_needed {
            return None;
        }
        match self.blob_stats {
            Some(source) => Some(NoteSizeStats::load(self.graph, source)),
            None => {
                log::debug!("size properties requested but no blob statistics are available");
                None
            }
        }
    }

    fn perform_search<'s>(
        &'s self,
        expression: &Expression,
        ctx: &mut SearchContext,
        mode: MatchMode,
        stats: Option<&'s NoteSizeStats>,
    ) -> Vec<SearchResult> {
        ctx.record_phase(mode);

        let graph: &'s NoteGraph = self.graph;
        let mut exec = ExecutionContext::new(graph, mode)
            .with_stats(stats)
            .with_protected(self.protected);
        let found = expression.execute(&graph.all_note_set(), &mut exec, ctx);

        for word in &exec.fuzzy_matched_words {
            ctx.add_highlighted_token(word.clone());
        }

        let mut results: Vec<SearchResult> = found
            .iter()
            .map(|note| {
                let path = exec
                    .note_id_to_note_path
                    .get(&note.note_id)
                    .cloned()
                    .unwrap_or_else(|| graph.best_note_path(&note.note_id));
                SearchResult::new(graph, path)
            })
            .collect();

        for result in &mut results {
            result.compute_score(
                graph,
                self.protected,
                &ctx.fulltext_query,
                &ctx.highlighted_tokens,
                mode == MatchMode::Fuzzy,
            );
        }

        if !found.sorted {
            sort_results(&mut results);
        }
        results
    }

    // ========================================================================
    // Wrappers
    // ========================================================================

    /// Matching notes, best first.
    pub fn search_notes(&self, query: &str, params: SearchParams) -> Vec<&'g Note> {
        let mut ctx = SearchContext::new(params);
        self.find_results_with_query(query, &mut ctx)
            .iter()
            .filter_map(|r| self.graph.get_note(&r.note_id))
            .collect()
    }

    pub fn find_first_note_with_query(&self, query: &str, ctx: &mut SearchContext) -> Option<&'g Note> {
        self.find_results_with_query(query, ctx)
            .first()
            .and_then(|r| self.graph.get_note(&r.note_id))
    }

    /// Highlighted results with snippets for the quick search dropdown.
    ///
    /// Searches under `hoisted_note_id` unless it lies in the hidden subtree.
    pub fn search_notes_for_autocomplete(
        &self,
        query: &str,
        fast_search: bool,
        hoisted_note_id: Option<&str>,
    ) -> Vec<AutocompleteItem> {
        let ancestor = hoisted_note_id
            .filter(|id| !self.graph.is_in_hidden_subtree(id))
            .unwrap_or(ROOT_NOTE_ID);
        let mut ctx = SearchContext::new(SearchParams {
            fast_search,
            include_archived_notes: false,
            include_hidden_notes: true,
            fuzzy_attribute_search: true,
            ignore_internal_attributes: true,
            ancestor_note_id: Some(ancestor.to_string()),
            ..SearchParams::default()
        });

        let mut results = self.find_results_with_query(query, &mut ctx);
        results.truncate(self.config.autocomplete_limit);

        let max_length = self.config.snippet_max_length;
        for result in &mut results {
            result.content_snippet = Some(extract_content_snippet(
                self.graph,
                self.protected,
                &result.note_id,
                &ctx.highlighted_tokens,
                max_length,
            ));
            result.attribute_snippet = Some(extract_attribute_snippet(
                self.graph,
                &result.note_id,
                &ctx.highlighted_tokens,
                ctx.ignore_internal_attributes,
                max_length,
            ));
        }

        highlight_search_results(&mut results, &ctx.highlighted_tokens);

        results
            .into_iter()
            .map(|result| {
                let note_title = self
                    .graph
                    .get_note(&result.note_id)
                    .map(|n| n.title.clone())
                    .unwrap_or_default();
                AutocompleteItem {
                    note_path: result.note_path(),
                    icon: self.note_icon(&result.note_id),
                    note_title,
                    note_path_title: result.note_path_title,
                    highlighted_note_path_title: result.highlighted_note_path_title,
                    content_snippet: result.content_snippet,
                    highlighted_content_snippet: result.highlighted_content_snippet,
                    attribute_snippet: result.attribute_snippet,
                    highlighted_attribute_snippet: result.highlighted_attribute_snippet,
                }
            })
            .collect()
    }

    fn note_icon(&self, note_id: &str) -> String {
        if let Some(icon) = self.graph.label_value(note_id, "iconClass").filter(|v| !v.trim().is_empty()) {
            return icon.to_string();
        }
        match self.graph.get_note(note_id) {
            Some(note) if note.note_type == NoteType::Text && !self.graph.child_notes(note_id).is_empty() => {
                FOLDER_ICON.to_string()
            }
            Some(note) => note.note_type.default_icon().to_string(),
            None => FALLBACK_ICON.to_string(),
        }
    }

    /// Run the search stored on a saved search note.
    ///
    /// Fails only when the note does not exist. The root note and the search
    /// note itself are never part of the result.
    pub fn search_from_note(&self, note_id: &str) -> Result<SearchNoteResult> {
        let note = self.graph.get_note_or_throw(note_id)?;
        let graph = self.graph;

        if !graph
            .attributes_named(note_id, AttributeType::Relation, "searchScript")
            .is_empty()
        {
            log::info!("Search note {} uses a search script, which is not supported", note_id);
            return Ok(SearchNoteResult {
                error: Some("Script-driven saved searches are not supported".to_string()),
                ..SearchNoteResult::default()
            });
        }

        let label = |name: &str| graph.label_value(note_id, name).filter(|v| !v.is_empty()).map(str::to_string);
        let mut ctx = SearchContext::new(SearchParams {
            fast_search: graph.has_label(note_id, "fastSearch"),
            ancestor_note_id: graph
                .attributes_named(note_id, AttributeType::Relation, "ancestor")
                .first()
                .map(|a| a.value.clone())
                .filter(|v| !v.is_empty()),
            ancestor_depth: label("ancestorDepth"),
            include_archived_notes: graph.has_label(note_id, "includeArchivedNotes"),
            order_by: label("orderBy"),
            order_direction: label("orderDirection"),
            limit: label("limit")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|&limit| limit > 0),
            debug: graph.has_label(note_id, "debug"),
            fuzzy_attribute_search: false,
            ..SearchParams::default()
        });

        let search_string = label("searchString").unwrap_or_default();
        let results = self.find_results_with_query(&search_string, &mut ctx);

        let mut seen = HashSet::new();
        let search_result_note_ids = results
            .into_iter()
            .map(|r| r.note_id)
            .filter(|id| id != ROOT_NOTE_ID && *id != note.note_id)
            .filter(|id| seen.insert(id.clone()))
            .collect();

        Ok(SearchNoteResult {
            search_result_note_ids,
            highlighted_tokens: ctx.highlighted_tokens.clone(),
            error: ctx.error().map(str::to_string),
        })
    }
}

/// Exact results first, then fuzzy-only results, each sorted on its own.
fn merge_exact_and_fuzzy(mut exact: Vec<SearchResult>, fuzzy: Vec<SearchResult>) -> Vec<SearchResult> {
    let exact_ids: HashSet<String> = exact.iter().map(|r| r.note_id.clone()).collect();
    let mut additional: Vec<SearchResult> = fuzzy
        .into_iter()
        .filter(|r| !exact_ids.contains(&r.note_id))
        .collect();

    sort_results(&mut exact);
    sort_results(&mut additional);
    exact.extend(additional);
    exact
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::InMemoryBlobStats;
    use crate::graph::stats::BlobRow;
    use pretty_assertions::assert_eq;

    fn library() -> NoteGraph {
        let mut g = NoteGraph::new();
        g.insert_child("root", Note::new("books", "Books")).unwrap();
        g.insert_child("books", Note::new("dune", "Dune").with_content("<p>Desert planet Arrakis</p>"))
            .unwrap();
        g.insert_child("books", Note::new("emma", "Emma").with_content("<p>A novel of manners</p>"))
            .unwrap();
        g.insert_child("root", Note::new("saved", "Saved search").with_type(NoteType::Search, "application/json"))
            .unwrap();
        g.add_label("dune", "book", "").unwrap();
        g.add_label("emma", "book", "").unwrap();
        g.add_label("dune", "year", "1965").unwrap();
        g.add_label("emma", "year", "1815").unwrap();
        g
    }

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.note_id.as_str()).collect()
    }

    #[test]
    fn test_parse_records_fulltext_query() {
        let g = library();
        let service = SearchService::new(&g);
        let mut ctx = SearchContext::default();
        let expression = service.parse_query_to_expression("dune #book", &mut ctx);
        assert!(expression.is_some());
        assert_eq!(ctx.fulltext_query, "dune");
    }

    #[test]
    fn test_unbalanced_parens() {
        let g = library();
        let service = SearchService::new(&g);
        let mut ctx = SearchContext::default();
        let results = service.find_results_with_query("(#book and #year", &mut ctx);
        assert!(results.is_empty());
        assert_eq!(ctx.error(), Some("Did not find matching right parenthesis."));
    }

    #[test]
    fn test_pure_expression_query_single_phase() {
        let g = library();
        let service = SearchService::new(&g);
        let mut ctx = SearchContext::default();
        let results = service.find_results_with_query("#book", &mut ctx);
        assert_eq!(results.len(), 2);
        assert_eq!(ctx.executed_phases(), &[MatchMode::Exact]);
    }

    #[test]
    fn test_fuzzy_phase_runs_when_exact_is_thin() {
        let g = library();
        let service = SearchService::new(&g);
        let mut ctx = SearchContext::default();
        let results = service.find_results_with_query("arrakis", &mut ctx);
        assert_eq!(ids(&results), vec!["dune"]);
        assert_eq!(ctx.executed_phases(), &[MatchMode::Exact, MatchMode::Fuzzy]);
    }

    fn titled_copies(title: &str, count: usize) -> NoteGraph {
        let mut g = NoteGraph::new();
        for i in 0..count {
            g.insert_child("root", Note::new(format!("n{}", i), title)).unwrap();
        }
        g
    }

    #[test]
    fn test_high_quality_exact_results_skip_fuzzy() {
        let g = titled_copies("Dune", 6);
        let service = SearchService::new(&g);
        let mut ctx = SearchContext::default();
        let results = service.find_results_with_query("dune", &mut ctx);

        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| r.score >= service.config().min_score_for_quality));
        assert_eq!(ctx.executed_phases(), &[MatchMode::Exact]);
    }

    #[test]
    fn test_quality_threshold_is_inclusive() {
        let threshold = SearchConfig::default().min_result_threshold;

        let g = titled_copies("Dune", threshold);
        let service = SearchService::new(&g);
        let mut ctx = SearchContext::default();
        service.find_results_with_query("dune", &mut ctx);
        assert_eq!(ctx.executed_phases(), &[MatchMode::Exact]);

        let g = titled_copies("Dune", threshold - 1);
        let service = SearchService::new(&g);
        let mut ctx = SearchContext::default();
        let results = service.find_results_with_query("dune", &mut ctx);
        assert_eq!(results.len(), threshold - 1);
        assert_eq!(ctx.executed_phases(), &[MatchMode::Exact, MatchMode::Fuzzy]);
    }

    #[test]
    fn test_fuzzy_disabled() {
        let g = library();
        let service = SearchService::new(&g);
        let mut ctx = SearchContext::new(SearchParams {
            enable_fuzzy_matching: false,
            ..SearchParams::default()
        });
        assert!(service.find_results_with_query("arrakiss", &mut ctx).is_empty());
        assert_eq!(ctx.executed_phases(), &[MatchMode::Exact]);
    }

    #[test]
    fn test_order_by_keeps_order() {
        let g = library();
        let service = SearchService::new(&g);
        let mut ctx = SearchContext::default();
        let results = service.find_results_with_query("#book orderBy #year", &mut ctx);
        assert_eq!(ids(&results), vec!["emma", "dune"]);
        assert_eq!(ctx.executed_phases().len(), 1);
    }

    #[test]
    fn test_merge_puts_exact_first() {
        let g = library();
        let mut exact = SearchResult::new(&g, vec!["root".into(), "books".into(), "emma".into()]);
        exact.score = 1.0;
        let mut fuzzy = SearchResult::new(&g, vec!["root".into(), "books".into(), "dune".into()]);
        fuzzy.score = 100.0;
        let duplicate = exact.clone();

        let merged = merge_exact_and_fuzzy(vec![exact], vec![fuzzy, duplicate]);
        assert_eq!(ids(&merged), vec!["emma", "dune"]);
    }

    #[test]
    fn test_size_properties_use_blob_stats() {
        let g = library();
        let blobs = InMemoryBlobStats {
            notes: vec![BlobRow::new("dune", "b1", 5000), BlobRow::new("emma", "b2", 10)],
            ..InMemoryBlobStats::default()
        };
        let service = SearchService::new(&g).with_blob_stats(&blobs);
        let mut ctx = SearchContext::default();
        let results = service.find_results_with_query("#book and note.contentSize > 1000", &mut ctx);
        assert_eq!(ids(&results), vec!["dune"]);
        assert!(ctx.db_load_needed);
    }

    #[test]
    fn test_autocomplete_items() {
        let mut g = library();
        g.add_label("dune", "iconClass", "bx bx-planet").unwrap();
        let service = SearchService::new(&g);
        let items = service.search_notes_for_autocomplete("arrakis", false, None);

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.note_path, "root/books/dune");
        assert_eq!(item.note_title, "Dune");
        assert_eq!(item.icon, "bx bx-planet");
        assert_eq!(item.content_snippet.as_deref(), Some("Desert planet Arrakis"));
        assert_eq!(
            item.highlighted_content_snippet.as_deref(),
            Some("Desert planet <b>Arrakis</b>")
        );
    }

    #[test]
    fn test_autocomplete_icons() {
        let g = library();
        let service = SearchService::new(&g);
        assert_eq!(service.note_icon("books"), "bx bx-folder");
        assert_eq!(service.note_icon("emma"), "bx bx-note");
        assert_eq!(service.note_icon("saved"), "bx bx-file-find");
        assert_eq!(service.note_icon("missing"), "bx bx-note");
    }

    #[test]
    fn test_autocomplete_respects_hoisting() {
        let mut g = library();
        g.insert_child("root", Note::new("films", "Films")).unwrap();
        g.insert_child("films", Note::new("dunefilm", "Dune")).unwrap();
        let service = SearchService::new(&g);

        let all = service.search_notes_for_autocomplete("dune", true, None);
        assert_eq!(all.len(), 2);
        let hoisted = service.search_notes_for_autocomplete("dune", true, Some("films"));
        assert_eq!(hoisted.len(), 1);
        assert_eq!(hoisted[0].note_path, "root/films/dunefilm");
    }

    #[test]
    fn test_search_from_note() {
        let mut g = library();
        g.add_label("saved", "searchString", "#book").unwrap();
        g.add_label("saved", "orderBy", "title").unwrap();
        g.add_label("saved", "limit", "1").unwrap();
        let service = SearchService::new(&g);

        let result = service.search_from_note("saved").unwrap();
        assert_eq!(result.search_result_note_ids, vec!["dune"]);
        assert_eq!(result.error, None);
    }

    #[test]
    fn test_search_from_note_never_returns_itself() {
        let mut g = library();
        g.add_label("saved", "searchString", "search").unwrap();
        let service = SearchService::new(&g);
        let result = service.search_from_note("saved").unwrap();
        assert!(!result.search_result_note_ids.contains(&"saved".to_string()));
        assert!(!result.search_result_note_ids.contains(&"root".to_string()));
    }

    #[test]
    fn test_search_from_note_script_unsupported() {
        let mut g = library();
        g.add_relation("saved", "searchScript", "dune").unwrap();
        let service = SearchService::new(&g);
        let result = service.search_from_note("saved").unwrap();
        assert!(result.search_result_note_ids.is_empty());
        assert!(result.error.is_some());
    }

    #[test]
    fn test_search_from_missing_note() {
        let g = library();
        let service = SearchService::new(&g);
        assert!(service.search_from_note("nope").is_err());
    }
}
