//! A ranked search hit and its relevance score.

use super::expression::preprocess_content;
use super::text::{MAX_EDIT_DISTANCE, MIN_FUZZY_TOKEN_LENGTH, edit_distance, normalize};
use crate::graph::protected::readable_content;
use crate::graph::{NoteGraph, ProtectedSession};
use serde::Serialize;
use std::cmp::Ordering;

const NOTE_ID_MATCH: f64 = 1000.0;
const EXACT_TITLE_MATCH: f64 = 2000.0;
const TITLE_PREFIX_MATCH: f64 = 500.0;
const TITLE_WORD_MATCH: f64 = 300.0;
/// Ceiling for the fuzzy title bonus so it never competes with exact matches.
const MAX_FUZZY_TITLE_SCORE: f64 = 60.0;
/// Max relative edit distance accepted for a fuzzy title match.
const FUZZY_TITLE_RATIO: f64 = 0.3;

const TITLE_FACTOR: f64 = 2.0;
const PATH_FACTOR: f64 = 0.3;
const CONTENT_FACTOR: f64 = 0.5;

const EXACT_CHUNK_WEIGHT: f64 = 4.0;
const PREFIX_CHUNK_WEIGHT: f64 = 2.0;
const CONTAINS_CHUNK_WEIGHT: f64 = 1.0;
const FUZZY_CHUNK_WEIGHT: f64 = 0.5;
const MAX_FUZZY_CHUNK_SCORE: f64 = 3.0;
/// Fuzzy chunk matches stop adding once their total reaches this.
const MAX_TOTAL_FUZZY_SCORE: f64 = 200.0;

/// Hidden notes rank below everything comparable.
const HIDDEN_PENALTY: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub note_id: String,
    pub note_path_array: Vec<String>,
    /// Titles along the path, root omitted.
    pub note_path_title: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted_note_path_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted_content_snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted_attribute_snippet: Option<String>,
    #[serde(skip)]
    fuzzy_score: f64,
}

impl SearchResult {
    /// A result for the note at the end of `note_path_array`.
    pub fn new(graph: &NoteGraph, note_path_array: Vec<String>) -> Self {
        let note_id = note_path_array.last().cloned().unwrap_or_default();
        let note_path_title = graph.note_path_title(&note_path_array);
        Self {
            note_id,
            note_path_array,
            note_path_title,
            score: 0.0,
            content_snippet: None,
            attribute_snippet: None,
            highlighted_note_path_title: None,
            highlighted_content_snippet: None,
            highlighted_attribute_snippet: None,
            fuzzy_score: 0.0,
        }
    }

    /// Path ids joined with `/`.
    pub fn note_path(&self) -> String {
        self.note_path_array.join("/")
    }

    /// Score the result against the fulltext query and the highlighted
    /// tokens. Title matches dominate, then path, then content.
    pub fn compute_score(
        &mut self,
        graph: &NoteGraph,
        protected: &dyn ProtectedSession,
        fulltext_query: &str,
        tokens: &[String],
        fuzzy: bool,
    ) {
        self.score = 0.0;
        self.fuzzy_score = 0.0;

        let Some(note) = graph.get_note(&self.note_id) else {
            return;
        };
        let query = normalize(fulltext_query.trim());
        let title = normalize(&note.title);

        if !query.is_empty() {
            if note.note_id.to_lowercase() == query {
                self.score += NOTE_ID_MATCH;
            }

            if title == query {
                self.score += EXACT_TITLE_MATCH;
            } else if title.starts_with(&query) {
                self.score += TITLE_PREFIX_MATCH;
            } else if title.split_whitespace().any(|word| word == query) {
                self.score += TITLE_WORD_MATCH;
            } else if fuzzy {
                self.score += fuzzy_title_score(&title, &query);
            }
        }

        let tokens: Vec<String> = tokens.iter().map(|t| normalize(t)).filter(|t| !t.is_empty()).collect();
        self.add_score_for_strings(&tokens, &title, TITLE_FACTOR, fuzzy);
        let path_title = normalize(&self.note_path_title);
        self.add_score_for_strings(&tokens, &path_title, PATH_FACTOR, fuzzy);

        if let Some(content) = note
            .content
            .as_deref()
            .filter(|_| note.note_type.has_searchable_content())
            .and_then(|c| readable_content(protected, c, note.is_protected))
        {
            let content = preprocess_content(&content, note.note_type, &note.mime, false);
            for token in &tokens {
                if content.contains(token.as_str()) {
                    self.score += token.chars().count() as f64 * CONTENT_FACTOR;
                }
            }
        }

        if graph.is_in_hidden_subtree(&self.note_id) {
            self.score /= HIDDEN_PENALTY;
        }
    }

    fn add_score_for_strings(&mut self, tokens: &[String], text: &str, factor: f64, fuzzy: bool) {
        for chunk in text.split(' ').filter(|c| !c.is_empty()) {
            for token in tokens {
                let len = token.chars().count() as f64;
                if chunk == token {
                    self.score += EXACT_CHUNK_WEIGHT * len * factor;
                } else if chunk.starts_with(token.as_str()) {
                    self.score += PREFIX_CHUNK_WEIGHT * len * factor;
                } else if chunk.contains(token.as_str()) {
                    self.score += CONTAINS_CHUNK_WEIGHT * len * factor;
                } else if fuzzy
                    && token.chars().count() >= MIN_FUZZY_TOKEN_LENGTH
                    && self.fuzzy_score < MAX_TOTAL_FUZZY_SCORE
                {
                    let distance = edit_distance(token, chunk, MAX_EDIT_DISTANCE);
                    if (1..=MAX_EDIT_DISTANCE).contains(&distance) {
                        let similarity = 1.0 - distance as f64 / (MAX_EDIT_DISTANCE + 1) as f64;
                        let weight =
                            (FUZZY_CHUNK_WEIGHT * similarity * len.min(3.0) * factor).min(MAX_FUZZY_CHUNK_SCORE);
                        self.score += weight;
                        self.fuzzy_score += weight;
                    }
                }
            }
        }
    }
}

fn fuzzy_title_score(title: &str, query: &str) -> f64 {
    let longest = title.chars().count().max(query.chars().count());
    if longest == 0 {
        return 0.0;
    }
    let distance = edit_distance(title, query, MAX_EDIT_DISTANCE);
    let ratio = distance as f64 / longest as f64;
    if distance > MAX_EDIT_DISTANCE || ratio > FUZZY_TITLE_RATIO {
        return 0.0;
    }
    (TITLE_WORD_MATCH * (1.0 - ratio) * 0.7).min(MAX_FUZZY_TITLE_SCORE)
}

/// Best first: score, then shallower path, then path title.
pub fn compare_results(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.note_path_array.len().cmp(&b.note_path_array.len()))
        .then_with(|| a.note_path_title.cmp(&b.note_path_title))
}

pub fn sort_results(results: &mut [SearchResult]) {
    results.sort_by(compare_results);
}
