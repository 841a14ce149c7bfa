//! Bold markup for matched tokens in result titles and snippets.

use super::result::SearchResult;
use super::text::{escape_html, fold_char};

/// Chars that would clash with the `{`/`}` placeholders or with markup.
const RESERVED: &[char] = &['<', '{', '}'];

/// Fill the `highlighted_*` fields of every result.
///
/// Matches are wrapped in `{`/`}` placeholders first and turned into `<b>`
/// tags at the end, so a token like `b` never matches inside inserted markup.
/// Longer tokens go first and text already inside placeholders is not matched
/// again, so `cat` cannot split a highlighted `category`. Snippets are matched
/// as plain text and escaped afterwards, so tokens never match inside entities.
pub fn highlight_search_results(results: &mut [SearchResult], highlighted_tokens: &[String]) {
    let tokens = prepare_tokens(highlighted_tokens);

    for result in results.iter_mut() {
        result.highlighted_note_path_title = Some(strip_reserved(&result.note_path_title));
        result.highlighted_content_snippet = result
            .content_snippet
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(strip_placeholders);
        result.highlighted_attribute_snippet = result
            .attribute_snippet
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(strip_placeholders);
    }

    for token in &tokens {
        for result in results.iter_mut() {
            for field in [
                &mut result.highlighted_note_path_title,
                &mut result.highlighted_content_snippet,
                &mut result.highlighted_attribute_snippet,
            ] {
                if let Some(text) = field {
                    *text = wrap_matches(text, token);
                }
            }
        }
    }

    for result in results.iter_mut() {
        if let Some(title) = &mut result.highlighted_note_path_title {
            *title = to_markup(title);
        }
        for snippet in [
            &mut result.highlighted_content_snippet,
            &mut result.highlighted_attribute_snippet,
        ] {
            if let Some(text) = snippet {
                *text = to_markup(&escape_html(text)).replace('\n', "<br>");
            }
        }
    }
}

/// Unique, non-blank, longest first.
fn prepare_tokens(tokens: &[String]) -> Vec<Vec<char>> {
    let mut prepared: Vec<Vec<char>> = Vec::new();
    for token in tokens {
        let folded: Vec<char> = strip_reserved(token).chars().map(fold_char).collect();
        if folded.iter().all(|c| c.is_whitespace()) || prepared.contains(&folded) {
            continue;
        }
        prepared.push(folded);
    }
    prepared.sort_by(|a, b| b.len().cmp(&a.len()));
    prepared
}

fn strip_reserved(text: &str) -> String {
    text.chars().filter(|c| !RESERVED.contains(c)).collect()
}

fn strip_placeholders(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '{' | '}')).collect()
}

/// Wrap every case and diacritic insensitive occurrence of `token` outside
/// existing placeholders.
fn wrap_matches(text: &str, token: &[char]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let folded: Vec<char> = chars.iter().map(|&c| fold_char(c)).collect();
    let mut out = String::with_capacity(text.len() + 2);
    let mut depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        if depth == 0 && folded[i..].starts_with(token) {
            out.push('{');
            out.extend(&chars[i..i + token.len()]);
            out.push('}');
            i += token.len();
            continue;
        }
        match chars[i] {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn to_markup(text: &str) -> String {
    text.replace('{', "<b>").replace('}', "</b>")
}
