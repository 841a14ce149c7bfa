use crate::graph::{Note, NoteType};
use crate::graph::protected::readable_content;
use crate::search::comparator::CompareOp;
use crate::search::context::ExecutionContext;
use crate::search::note_set::NoteSet;
use crate::search::text::{
    MAX_EDIT_DISTANCE, MAX_PHRASE_PROXIMITY, MIN_FUZZY_TOKEN_LENGTH, MIN_IMPLICIT_FUZZY_TOKEN_LENGTH,
    fuzzy_match_word, fuzzy_match_word_with_result, normalize, strip_tags, validate_fuzzy_tokens,
};
use regex::Regex;
use serde_json::Value;
use std::fmt;

/// Operators usable against note content.
const CONTENT_OPERATORS: &[CompareOp] = &[
    CompareOp::Eq,
    CompareOp::NotEq,
    CompareOp::Contains,
    CompareOp::EndsWith,
    CompareOp::StartsWith,
    CompareOp::Regex,
    CompareOp::FuzzyEq,
    CompareOp::FuzzyContains,
];

/// Content larger than this is not searched.
pub const MAX_SEARCH_CONTENT_SIZE: usize = 2 * 1024 * 1024;

/// Match against the (decrypted, tag-stripped, normalized) note content.
#[derive(Debug, Clone)]
pub struct Content {
    pub op: CompareOp,
    pub tokens: Vec<String>,
    /// Search the raw HTML instead of the text.
    pub raw: bool,
    /// Tokens not found in the content may still be found in the flat text.
    /// Set for the implicit fulltext search.
    pub flat_text: bool,
    regex: Option<Regex>,
}

impl Content {
    pub fn new(op: CompareOp, tokens: Vec<String>, raw: bool, flat_text: bool) -> Result<Self, String> {
        if !CONTENT_OPERATORS.contains(&op) {
            return Err(format!(
                "Note content can be searched only with operators: {}, operator {} given.",
                CONTENT_OPERATORS
                    .iter()
                    .map(|o| o.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                op.as_str()
            ));
        }
        if op.is_fuzzy() {
            validate_fuzzy_tokens(&tokens)?;
        }
        let regex = match (op, tokens.as_slice()) {
            (CompareOp::Regex, [pattern]) => Some(
                Regex::new(&format!("(?ms){}", pattern))
                    .map_err(|e| format!("Invalid regular expression \"{}\": {}", pattern, e))?,
            ),
            _ => None,
        };
        Ok(Self {
            op,
            tokens,
            raw,
            flat_text,
            regex,
        })
    }

    pub fn execute<'a>(&self, input: &NoteSet<'a>, exec: &mut ExecutionContext<'a>) -> NoteSet<'a> {
        let mut result = NoteSet::new();
        for note in input.iter() {
            let Some(content) = self.searchable(exec, note) else {
                continue;
            };
            if self.matches(exec, note, &content) {
                result.add(note);
            }
        }
        result
    }

    fn searchable(&self, exec: &ExecutionContext<'_>, note: &Note) -> Option<String> {
        if !note.note_type.has_searchable_content() {
            return None;
        }
        let stored = note.content.as_deref().filter(|c| c.len() < MAX_SEARCH_CONTENT_SIZE)?;
        let content = match readable_content(exec.protected, stored, note.is_protected) {
            Some(content) => content,
            None => {
                log::info!("Cannot decrypt content of note {}", note.note_id);
                return None;
            }
        };
        if content.is_empty() {
            return None;
        }
        let content = preprocess_content(&content, note.note_type, &note.mime, self.raw);
        (!content.is_empty()).then_some(content)
    }

    fn matches(&self, exec: &mut ExecutionContext<'_>, note: &Note, content: &str) -> bool {
        if let [token] = self.tokens.as_slice() {
            return match self.op {
                CompareOp::Eq => token == content,
                CompareOp::NotEq => token != content,
                CompareOp::EndsWith => content.ends_with(token.as_str()),
                CompareOp::StartsWith => content.starts_with(token.as_str()),
                CompareOp::Contains => self.token_in_content(exec, note, token, content),
                CompareOp::Regex => self.regex.as_ref().is_some_and(|re| re.is_match(content)),
                CompareOp::FuzzyEq => self.fuzzy_matches(exec, note, content),
                CompareOp::FuzzyContains => fuzzy_match_token(&normalize(token), &normalize(content)),
                _ => false,
            };
        }

        match self.op {
            CompareOp::FuzzyEq | CompareOp::FuzzyContains => self.fuzzy_matches(exec, note, content),
            _ => self
                .tokens
                .iter()
                .all(|token| self.token_in_content(exec, note, token, content)),
        }
    }

    /// Token found in the content, or (for fulltext search) in the flat text.
    /// In fuzzy mode the implicit fulltext search also accepts near matches.
    fn token_in_content(&self, exec: &mut ExecutionContext<'_>, note: &Note, token: &str, content: &str) -> bool {
        let token = normalize(token);
        let content = normalize(content);
        if content.contains(&token) {
            return true;
        }
        if self.flat_text
            && exec.is_fuzzy()
            && token.chars().count() >= MIN_IMPLICIT_FUZZY_TOKEN_LENGTH
        {
            if let Some(word) = fuzzy_match_word_with_result(&token, &content, MAX_EDIT_DISTANCE) {
                exec.record_fuzzy_word(&word);
                return true;
            }
        }
        self.flat_text && normalize(&exec.graph.flat_text(&note.note_id)).contains(&token)
    }

    fn fuzzy_matches(&self, exec: &ExecutionContext<'_>, note: &Note, content: &str) -> bool {
        let content = normalize(content);
        let flat_text = if self.flat_text {
            normalize(&exec.graph.flat_text(&note.note_id))
        } else {
            String::new()
        };

        if self.tokens.len() > 1 {
            return self.matches_phrase(&content, &flat_text);
        }
        let token = normalize(&self.tokens[0]);
        fuzzy_match_token(&token, &content) || (self.flat_text && fuzzy_match_token(&token, &flat_text))
    }

    /// All tokens fuzzily present, each within [`MAX_PHRASE_PROXIMITY`] words
    /// of the previous one.
    fn matches_phrase(&self, content: &str, flat_text: &str) -> bool {
        let text = if self.flat_text {
            format!("{} {}", content, flat_text)
        } else {
            content.to_string()
        };
        let words: Vec<&str> = text.split_whitespace().collect();

        let positions: Vec<Vec<usize>> = self
            .tokens
            .iter()
            .map(|token| {
                let token = normalize(token);
                words
                    .iter()
                    .enumerate()
                    .filter(|(_, word)| fuzzy_match_word(&token, word, MAX_EDIT_DISTANCE))
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();

        if positions.iter().any(Vec::is_empty) {
            return false;
        }
        has_proximity_match(&positions, MAX_PHRASE_PROXIMITY)
    }
}

fn has_proximity_match(positions: &[Vec<usize>], max_distance: usize) -> bool {
    fn sequence(rest: &[Vec<usize>], current: usize, max_distance: usize) -> bool {
        match rest.split_first() {
            None => true,
            Some((next, rest)) => next
                .iter()
                .any(|&p| p.abs_diff(current) <= max_distance && sequence(rest, p, max_distance)),
        }
    }

    match positions.split_first() {
        Some((first, rest)) => first.iter().any(|&start| sequence(rest, start, max_distance)),
        None => false,
    }
}

fn fuzzy_match_token(token: &str, content: &str) -> bool {
    if token.chars().count() < MIN_FUZZY_TOKEN_LENGTH {
        return content.contains(token);
    }
    content
        .split_whitespace()
        .any(|word| fuzzy_match_word(token, word, MAX_EDIT_DISTANCE))
}

/// Turn stored content into searchable text: normalized, tags stripped
/// (unless `raw`), canvas and mind map JSON reduced to their texts.
pub fn preprocess_content(content: &str, note_type: NoteType, mime: &str, raw: bool) -> String {
    let mut content = normalize(content);

    match (note_type, mime) {
        (NoteType::Text, "text/html") => {
            if !raw {
                content = strip_tags(&content);
            }
            content = content.replace("&nbsp;", " ");
        }
        (NoteType::MindMap, "application/json") => content = mind_map_text(&content),
        (NoteType::Canvas, "application/json") => content = canvas_text(&content),
        _ => {}
    }

    content.trim().to_string()
}

fn canvas_text(content: &str) -> String {
    let parsed: Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Cannot parse canvas content: {}", e);
            return String::new();
        }
    };
    let texts: Vec<&str> = parsed
        .get("elements")
        .and_then(Value::as_array)
        .map(|elements| {
            elements
                .iter()
                .filter(|e| e.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|e| e.get("text").and_then(Value::as_str))
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();
    normalize(&texts.join(","))
}

fn mind_map_text(content: &str) -> String {
    let parsed: Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Cannot parse mind map content: {}", e);
            return String::new();
        }
    };

    fn collect<'v>(node: &'v Value, topics: &mut Vec<&'v str>) {
        if let Some(topic) = node.get("topic").and_then(Value::as_str) {
            topics.push(topic);
        }
        if let Some(children) = node.get("children").and_then(Value::as_array) {
            for child in children {
                collect(child, topics);
            }
        }
    }

    let mut topics = Vec::new();
    if let Some(root) = parsed.get("nodedata") {
        collect(root, &mut topics);
    }
    normalize(&topics.join(", "))
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.raw { "RAWCONTENT" } else { "CONTENT" };
        write!(f, "{}({} {}", name, self.op.as_str(), self.tokens.join(" "))?;
        if self.flat_text {
            write!(f, " +flattext")?;
        }
        write!(f, ")")
    }
}
