use crate::graph::{Note, ROOT_NOTE_ID};
use crate::search::context::ExecutionContext;
use crate::search::note_set::NoteSet;
use crate::search::text::{
    MAX_EDIT_DISTANCE, MIN_IMPLICIT_FUZZY_TOKEN_LENGTH, fuzzy_match_word_with_result, normalize,
};
use std::fmt;

/// Fulltext match over titles, attributes, type and mime.
///
/// Every token has to be found somewhere on the path from the note towards
/// the root, so `books dune` finds the note "Dune" under "Books". The path
/// through which a note was found is recorded for the result.
#[derive(Debug, Clone)]
pub struct FlatText {
    /// Normalized.
    pub tokens: Vec<String>,
}

impl FlatText {
    pub fn new(tokens: &[String]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| normalize(t)).collect(),
        }
    }

    pub fn execute<'a>(&self, input: &NoteSet<'a>, exec: &mut ExecutionContext<'a>) -> NoteSet<'a> {
        let mut result = NoteSet::new();
        let graph = exec.graph;

        for note in self.candidates(input, exec) {
            if self.tokens.len() == 1 && note.note_id.to_lowercase() == self.tokens[0] {
                self.search_towards_root(note, &[], vec![note.note_id.clone()], exec, &mut result);
                continue;
            }

            let found_attr_tokens = self.attribute_tokens(exec, note, &self.tokens);

            for parent in graph.parent_notes(&note.note_id) {
                let title = normalize(&graph.title_in_parent(&note.note_id, &parent.note_id));
                let mut found = found_attr_tokens.clone();
                for token in &self.tokens {
                    if smart_match(exec, &title, token) {
                        found.push(token.clone());
                    }
                }

                if !found.is_empty() {
                    let remaining: Vec<String> = self
                        .tokens
                        .iter()
                        .filter(|t| !found.contains(t))
                        .cloned()
                        .collect();
                    self.search_towards_root(parent, &remaining, vec![note.note_id.clone()], exec, &mut result);
                }
            }
        }

        result
    }

    /// Input notes whose flat text contains at least one token.
    fn candidates<'a>(&self, input: &NoteSet<'a>, exec: &mut ExecutionContext<'a>) -> Vec<&'a Note> {
        let graph = exec.graph;
        input
            .iter()
            .filter(|note| {
                let flat_text = normalize(&graph.flat_text(&note.note_id));
                self.tokens.iter().any(|t| smart_match(exec, &flat_text, t))
            })
            .collect()
    }

    /// Tokens found in type, mime or owned attributes of `note`.
    fn attribute_tokens(&self, exec: &ExecutionContext<'_>, note: &Note, tokens: &[String]) -> Vec<String> {
        let mut found = Vec::new();
        for token in tokens {
            if note.note_type.as_str().to_lowercase().contains(token.as_str()) || note.mime.contains(token.as_str()) {
                found.push(token.clone());
            }
        }
        for attr in exec.graph.owned_attributes(&note.note_id) {
            let name = normalize(&attr.name);
            let value = normalize(&attr.value);
            for token in tokens {
                if name.contains(token.as_str()) || value.contains(token.as_str()) {
                    found.push(token.clone());
                }
            }
        }
        found
    }

    /// `taken_path` is the path fragment from the child of `note` down to the
    /// candidate note.
    fn search_towards_root<'a>(
        &self,
        note: &'a Note,
        remaining: &[String],
        taken_path: Vec<String>,
        exec: &mut ExecutionContext<'a>,
        result: &mut NoteSet<'a>,
    ) {
        let graph = exec.graph;

        if remaining.is_empty() {
            let path = self.note_path(exec, note, &taken_path);
            let Some(note_id) = path.last() else {
                return;
            };
            if !result.has_note_id(note_id) {
                if let Some(found) = graph.get_note(note_id) {
                    // first path wins, paths are visited in order of importance
                    exec.note_id_to_note_path.insert(note_id.clone(), path.clone());
                    result.add(found);
                }
            }
            return;
        }

        let parents = graph.parent_notes(&note.note_id);
        if parents.is_empty() || note.note_id == ROOT_NOTE_ID {
            return;
        }

        let found_attr_tokens = self.attribute_tokens(exec, note, remaining);

        for parent in parents {
            let title = normalize(&graph.title_in_parent(&note.note_id, &parent.note_id));
            let mut found = found_attr_tokens.clone();
            for token in remaining {
                if smart_match(exec, &title, token) {
                    found.push(token.clone());
                }
            }

            let mut path = Vec::with_capacity(taken_path.len() + 1);
            path.push(note.note_id.clone());
            path.extend(taken_path.iter().cloned());

            if found.is_empty() {
                self.search_towards_root(parent, remaining, path, exec, result);
            } else {
                let still_remaining: Vec<String> = remaining
                    .iter()
                    .filter(|t| !found.contains(t))
                    .cloned()
                    .collect();
                self.search_towards_root(parent, &still_remaining, path, exec, result);
            }
        }
    }

    fn note_path(&self, exec: &ExecutionContext<'_>, note: &Note, taken_path: &[String]) -> Vec<String> {
        let graph = exec.graph;
        match taken_path {
            [only] if *only == note.note_id => graph.best_note_path(&note.note_id),
            [first, rest @ ..] => {
                let mut path = graph.best_note_path(first);
                path.extend(rest.iter().cloned());
                path
            }
            [] => graph.best_note_path(&note.note_id),
        }
    }
}

/// Exact substring match, or in fuzzy mode a word within edit distance for
/// tokens long enough. Fuzzy matches are remembered for highlighting.
fn smart_match(exec: &mut ExecutionContext<'_>, text: &str, token: &str) -> bool {
    if text.contains(token) {
        return true;
    }
    if exec.is_fuzzy() && token.chars().count() >= MIN_IMPLICIT_FUZZY_TOKEN_LENGTH {
        if let Some(word) = fuzzy_match_word_with_result(token, text, MAX_EDIT_DISTANCE) {
            exec.record_fuzzy_word(&word);
            return true;
        }
    }
    false
}

impl fmt::Display for FlatText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FLATTEXT({})", self.tokens.join(" "))
    }
}
