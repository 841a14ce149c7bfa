//! Text normalization, edit distance and tag stripping shared by the matchers.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Tokens shorter than this are never fuzzy matched by the fuzzy operators.
pub const MIN_FUZZY_TOKEN_LENGTH: usize = 3;
/// Implicit fuzzy matching of fulltext tokens starts at this length.
pub const MIN_IMPLICIT_FUZZY_TOKEN_LENGTH: usize = 4;
pub const MAX_EDIT_DISTANCE: usize = 2;
/// Max distance in words between tokens of a fuzzy phrase.
pub const MAX_PHRASE_PROXIMITY: usize = 10;
/// Longer tokens are rejected by the fuzzy operators.
pub const MAX_FUZZY_TOKEN_LENGTH: usize = 100;
/// Beyond this length edit distance falls back to comparing lengths.
const MAX_EDIT_DISTANCE_INPUT: usize = 1000;

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|<(/?)([a-zA-Z][a-zA-Z0-9]*)\b[^>]*>|<[^>]*>").unwrap());

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Inline formatting tags that can occur in the middle of a word.
const INLINE_TAGS: &[&str] = &[
    "b", "strong", "em", "i", "span", "big", "small", "font", "sub", "sup",
];

/// Lowercase `c` and drop its diacritics, always yielding exactly one char.
pub fn fold_char(c: char) -> char {
    if c.is_ascii() {
        return c.to_ascii_lowercase();
    }
    let base = std::iter::once(c)
        .nfd()
        .find(|d| !is_combining_mark(*d))
        .unwrap_or(c);
    base.to_lowercase().next().unwrap_or(base)
}

/// Case and diacritic insensitive form of `text`.
///
/// Folding is per char, so char offsets in the result line up with the input.
pub fn normalize(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

/// Char index of the first occurrence of `needle` in `haystack`.
pub fn char_find(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .find(needle)
        .map(|byte_idx| haystack[..byte_idx].chars().count())
}

/// Levenshtein distance capped at `max_distance + 1`.
pub fn edit_distance(a: &str, b: &str, max_distance: usize) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (len1, len2) = (a.len(), b.len());
    let diff = len1.abs_diff(len2);

    if len1 > MAX_EDIT_DISTANCE_INPUT || len2 > MAX_EDIT_DISTANCE_INPUT {
        return if diff <= max_distance { diff } else { max_distance + 1 };
    }
    if diff > max_distance {
        return max_distance + 1;
    }
    if len1 == 0 || len2 == 0 {
        let d = len1.max(len2);
        return if d <= max_distance { d } else { max_distance + 1 };
    }

    let mut previous: Vec<usize> = (0..=len2).collect();
    let mut current = vec![0; len2 + 1];

    for i in 1..=len1 {
        current[0] = i;
        let mut row_min = i;
        for j in 1..=len2 {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            current[j] = (previous[j] + 1)
                .min(current[j - 1] + 1)
                .min(previous[j - 1] + cost);
            row_min = row_min.min(current[j]);
        }
        if row_min > max_distance {
            return max_distance + 1;
        }
        std::mem::swap(&mut previous, &mut current);
    }

    let result = previous[len2];
    if result <= max_distance {
        result
    } else {
        max_distance + 1
    }
}

/// Find `token` in `text`, exactly or as a word within `max_distance` edits.
/// Returns the matched text.
pub fn fuzzy_match_word_with_result(token: &str, text: &str, max_distance: usize) -> Option<String> {
    if token.is_empty() || text.is_empty() {
        return None;
    }
    let token_lower = token.to_lowercase();
    let text_lower = text.to_lowercase();

    if let Some(pos) = text_lower.find(&token_lower) {
        let matched = if text_lower.len() == text.len() {
            text.get(pos..pos + token_lower.len())
        } else {
            None
        };
        return Some(matched.unwrap_or(token).to_string());
    }

    let token_len = token_lower.chars().count();
    if token_len < MIN_IMPLICIT_FUZZY_TOKEN_LENGTH {
        return None;
    }

    for (word, original) in text_lower.split_whitespace().zip(text.split_whitespace()) {
        if word.chars().count().abs_diff(token_len) > max_distance {
            continue;
        }
        if edit_distance(&token_lower, word, max_distance) <= max_distance {
            return Some(original.to_string());
        }
    }
    None
}

pub fn fuzzy_match_word(token: &str, text: &str, max_distance: usize) -> bool {
    fuzzy_match_word_with_result(token, text, max_distance).is_some()
}

/// Check tokens given to the `~=` / `~*` operators.
pub fn validate_fuzzy_tokens(tokens: &[String]) -> Result<(), String> {
    if tokens.iter().any(|t| t.trim().is_empty()) {
        return Err(
            "Invalid tokens: empty or whitespace-only tokens are not allowed".to_string(),
        );
    }
    let short: Vec<&str> = tokens
        .iter()
        .filter(|t| t.chars().count() < MIN_FUZZY_TOKEN_LENGTH)
        .map(String::as_str)
        .collect();
    if !short.is_empty() {
        return Err(format!(
            "Fuzzy search operators (~=, ~*) require tokens of at least {} characters. Invalid tokens: {}",
            MIN_FUZZY_TOKEN_LENGTH,
            short.join(", ")
        ));
    }
    let long: Vec<String> = tokens
        .iter()
        .filter(|t| t.chars().count() > MAX_FUZZY_TOKEN_LENGTH)
        .map(|t| format!("{}...", t.chars().take(20).collect::<String>()))
        .collect();
    if !long.is_empty() {
        return Err(format!(
            "Tokens are too long (max {} characters). Long tokens: {}",
            MAX_FUZZY_TOKEN_LENGTH,
            long.join(", ")
        ));
    }
    Ok(())
}

/// Remove HTML tags. Block tags become a space, inline formatting tags
/// vanish, opening `<a>` tags are kept so their URLs stay searchable.
pub fn strip_tags(html: &str) -> String {
    let stripped = TAG.replace_all(html, |caps: &regex::Captures| {
        let Some(name) = caps.get(2) else {
            return " ".to_string();
        };
        let name = name.as_str().to_ascii_lowercase();
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        if name == "a" {
            if closing { String::new() } else { caps[0].to_string() }
        } else if INLINE_TAGS.contains(&name.as_str()) {
            String::new()
        } else {
            " ".to_string()
        }
    });
    stripped.replace("&nbsp;", " ")
}

/// Remove every tag, including links.
pub fn strip_all_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

/// Collapse runs of whitespace into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").into_owned()
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
