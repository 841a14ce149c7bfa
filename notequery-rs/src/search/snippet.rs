//! Excerpts of note content and attributes shown next to results.

use super::text::{char_find, collapse_whitespace, normalize, strip_all_tags};
use super::value::is_link;
use crate::graph::protected::readable_content;
use crate::graph::{Attribute, AttributeType, NoteGraph, NoteType, ProtectedSession};
use regex::Regex;
use std::sync::LazyLock;

static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

pub const DEFAULT_SNIPPET_LENGTH: usize = 200;
const MAX_SNIPPET_LINES: usize = 4;
const MAX_SNIPPET_ATTRIBUTES: usize = 4;
/// How far into the window a word boundary may be looked for.
const BOUNDARY_SLACK: usize = 20;

/// Window of `max_length` chars around the first token found in the note's
/// content.
///
/// Empty for non-text types, empty content and protected notes that cannot be
/// decrypted.
pub fn extract_content_snippet(
    graph: &NoteGraph,
    protected: &dyn ProtectedSession,
    note_id: &str,
    tokens: &[String],
    max_length: usize,
) -> String {
    let Some(note) = graph.get_note(note_id) else {
        return String::new();
    };
    if !note.note_type.has_searchable_content() {
        return String::new();
    }
    let Some(stored) = note.content.as_deref().filter(|c| !c.is_empty()) else {
        return String::new();
    };
    let Some(mut content) = readable_content(protected, stored, note.is_protected) else {
        return String::new();
    };

    if note.note_type == NoteType::Text {
        content = strip_all_tags(&content);
    }
    let content = normalize_lines(&content);
    if content.is_empty() {
        return String::new();
    }

    let chars: Vec<char> = content.chars().collect();
    let normalized = normalize(&content);
    let start = tokens
        .iter()
        .map(|t| normalize(t))
        .filter(|t| !t.is_empty())
        .find_map(|t| char_find(&normalized, &t))
        .map(|idx| idx.saturating_sub(max_length / 2))
        .unwrap_or(0);

    let end = (start + max_length).min(chars.len());
    let mut snippet: String = chars[start..end].iter().collect();

    let line_count = snippet.split('\n').count();
    if line_count > MAX_SNIPPET_LINES {
        let lines: Vec<&str> = snippet.split('\n').take(MAX_SNIPPET_LINES).collect();
        snippet = format!("{}...", lines.join("\n"));
    } else if line_count == 1 {
        if start > 0 {
            if let Some(first_space) = snippet.chars().position(char::is_whitespace) {
                if first_space > 0 && first_space < BOUNDARY_SLACK {
                    snippet = snippet.chars().skip(first_space + 1).collect();
                }
            }
            snippet = format!("...{}", snippet);
        }
        if start + max_length < chars.len() {
            let snippet_chars: Vec<char> = snippet.chars().collect();
            if let Some(last_space) = snippet_chars.iter().rposition(|c| c.is_whitespace()) {
                if last_space > 0 && last_space + BOUNDARY_SLACK > snippet_chars.len() {
                    snippet = snippet_chars[..last_space].iter().collect();
                }
            }
            snippet.push_str("...");
        }
    }

    snippet
}

/// Paragraph breaks survive, other whitespace runs collapse.
fn normalize_lines(content: &str) -> String {
    let content = BLANK_LINES.replace_all(content, "\n\n");
    content
        .split('\n')
        .map(|line| collapse_whitespace(line).trim().to_string())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Up to four attributes whose name or value contains a token, one per line.
pub fn extract_attribute_snippet(
    graph: &NoteGraph,
    note_id: &str,
    tokens: &[String],
    ignore_internal_attributes: bool,
    max_length: usize,
) -> String {
    if graph.get_note(note_id).is_none() {
        return String::new();
    }
    let tokens: Vec<String> = tokens.iter().map(|t| normalize(t)).filter(|t| !t.is_empty()).collect();

    let lines: Vec<String> = graph
        .attributes(note_id)
        .into_iter()
        .filter(|attr| !(ignore_internal_attributes && is_internal(attr)))
        .filter(|attr| {
            let name = normalize(&attr.name);
            let value = normalize(&attr.value);
            tokens
                .iter()
                .any(|t| name.contains(t.as_str()) || value.contains(t.as_str()))
        })
        .take(MAX_SNIPPET_ATTRIBUTES)
        .map(|attr| format_attribute(graph, attr))
        .collect();

    truncate_attribute_snippet(lines.join("\n"), max_length)
}

fn is_internal(attr: &Attribute) -> bool {
    attr.name.starts_with('_') || is_link(attr)
}

fn format_attribute(graph: &NoteGraph, attr: &Attribute) -> String {
    match attr.kind {
        AttributeType::Label if attr.value.is_empty() => format!("#{}", attr.name),
        AttributeType::Label => format!("#{}=\"{}\"", attr.name, attr.value),
        AttributeType::Relation => {
            let target = graph
                .get_note(&attr.value)
                .map(|n| n.title.as_str())
                .unwrap_or(attr.value.as_str());
            format!("~{}=\"{}\"", attr.name, target)
        }
    }
}

fn truncate_attribute_snippet(snippet: String, max_length: usize) -> String {
    let chars: Vec<char> = snippet.chars().collect();
    if chars.len() <= max_length {
        return snippet;
    }
    let truncated = &chars[..max_length];
    let half = max_length / 2;

    if let Some(newline) = truncated.iter().rposition(|&c| c == '\n') {
        if newline > half {
            return truncated[..newline].iter().collect();
        }
    }
    let cut = match truncated.iter().rposition(|&c| c == ' ') {
        Some(space) if space > half => space,
        _ => max_length.saturating_sub(3),
    };
    let mut out: String = truncated[..cut].iter().collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NoProtectedSession, Note};
    use pretty_assertions::assert_eq;

    fn graph_with(note: Note) -> NoteGraph {
        let mut g = NoteGraph::new();
        g.insert_child("root", note).unwrap();
        g
    }

    fn tokens(t: &[&str]) -> Vec<String> {
        t.iter().map(|s| s.to_string()).collect()
    }

    fn content_snippet(g: &NoteGraph, t: &[&str]) -> String {
        extract_content_snippet(g, &NoProtectedSession, "n", &tokens(t), DEFAULT_SNIPPET_LENGTH)
    }

    #[test]
    fn test_short_content_is_whole() {
        let g = graph_with(Note::new("n", "N").with_content("<p>Hello   <b>world</b></p>"));
        assert_eq!(content_snippet(&g, &["world"]), "Hello world");
    }

    #[test]
    fn test_window_centered_on_match() {
        let content = format!("{}needle{}", "word ".repeat(60), " word".repeat(40));
        let g = graph_with(Note::new("n", "N").with_type(NoteType::Code, "text/plain").with_content(content));

        let snippet = content_snippet(&g, &["NEEDLE"]);
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
        assert!(snippet.contains("needle"));
        assert!(snippet.chars().count() <= DEFAULT_SNIPPET_LENGTH + 6);

        // roughly centered: the match sits near the middle of the window
        let pos = snippet.find("needle").unwrap();
        assert!(pos > 80 && pos < 120, "match at {}", pos);
    }

    #[test]
    fn test_no_match_starts_at_beginning() {
        let content = "alpha ".repeat(60);
        let g = graph_with(Note::new("n", "N").with_content(content));
        let snippet = content_snippet(&g, &["zzz"]);
        assert!(snippet.starts_with("alpha"));
        assert!(snippet.ends_with("..."));
    }

    #[test]
    fn test_many_lines_cut_to_four() {
        let g = graph_with(
            Note::new("n", "N")
                .with_type(NoteType::Code, "text/plain")
                .with_content("one\ntwo\nthree\nfour\nfive\nsix"),
        );
        assert_eq!(content_snippet(&g, &["one"]), "one\ntwo\nthree\nfour...");
    }

    #[test]
    fn test_paragraphs_preserved() {
        let g = graph_with(
            Note::new("n", "N")
                .with_type(NoteType::Code, "text/plain")
                .with_content("first  line\n\n\n   second line  "),
        );
        assert_eq!(content_snippet(&g, &["second"]), "first line\n\nsecond line");
    }

    #[test]
    fn test_diacritics_insensitive_match() {
        let content = format!("{}Café{}", "x ".repeat(150), " y".repeat(150));
        let g = graph_with(Note::new("n", "N").with_type(NoteType::Code, "text/plain").with_content(content));
        assert!(content_snippet(&g, &["cafe"]).contains("Café"));
    }

    #[test]
    fn test_protected_without_session_is_empty() {
        let g = graph_with(Note::new("n", "Secret").with_content("encrypted").protected());
        assert_eq!(content_snippet(&g, &["secret"]), "");
    }

    #[test]
    fn test_non_text_types_have_no_snippet() {
        let g = graph_with(Note::new("n", "Pic").with_type(NoteType::Image, "image/png").with_content("bytes"));
        assert_eq!(content_snippet(&g, &["bytes"]), "");
    }

    #[test]
    fn test_attribute_snippet() {
        let mut g = NoteGraph::new();
        g.insert_child("root", Note::new("n", "Dune")).unwrap();
        g.insert_child("root", Note::new("frank", "Frank Herbert")).unwrap();
        g.add_label("n", "genre", "science fiction").unwrap();
        g.add_label("n", "sciFi", "").unwrap();
        g.add_label("n", "year", "1965").unwrap();
        g.add_relation("n", "author", "frank").unwrap();

        let snippet = extract_attribute_snippet(&g, "n", &tokens(&["sci", "author"]), false, DEFAULT_SNIPPET_LENGTH);
        assert_eq!(snippet, "#genre=\"science fiction\"\n#sciFi\n~author=\"Frank Herbert\"");
    }

    #[test]
    fn test_attribute_snippet_skips_internal() {
        let mut g = NoteGraph::new();
        g.insert_child("root", Note::new("n", "Dune")).unwrap();
        g.add_label("n", "_internalTag", "dune").unwrap();
        g.add_relation("n", "internalLink", "root").unwrap();
        g.add_label("n", "tag", "dune").unwrap();

        let all = extract_attribute_snippet(&g, "n", &tokens(&["dune", "internal"]), false, 200);
        assert_eq!(all.lines().count(), 3);
        let filtered = extract_attribute_snippet(&g, "n", &tokens(&["dune", "internal"]), true, 200);
        assert_eq!(filtered, "#tag=\"dune\"");
    }

    #[test]
    fn test_attribute_snippet_truncation() {
        assert_eq!(truncate_attribute_snippet("short".to_string(), 20), "short");
        assert_eq!(
            truncate_attribute_snippet("#first=\"value\"\n#second=\"longer value\"".to_string(), 20),
            "#first=\"value\""
        );
        assert_eq!(
            truncate_attribute_snippet("#name=\"a long label value here\"".to_string(), 20),
            "#name=\"a long label...".to_string()
        );
    }
}
