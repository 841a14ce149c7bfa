//! Query tokenizer.
//!
//! A query starts in fulltext mode: whitespace separated words (or quoted
//! phrases) that are matched against titles, paths and content. The first
//! word that starts with `#`, `~`, `(`, `note.` or is `orderby` switches the
//! rest of the query into expression mode, where attribute references,
//! operators, parentheses and values are recognized.

use serde::Serialize;

/// Kind of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenKind {
    /// Plain search word or quoted phrase before any expression.
    Fulltext,
    /// Comparison operator, `,`, or one of the keywords `and`, `or`, `not`.
    Operator,
    /// `#label`, `#!label`, `~relation`, `~!relation`.
    AttributeRef,
    /// Unquoted word in expression mode (property names, values).
    Word,
    /// Property path separator.
    Dot,
    ParenOpen,
    ParenClose,
    /// Quoted value in expression mode.
    QuotedString,
}

/// A lexed token. `position` is the char index of its first char in the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: usize,
    pub in_quotes: bool,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
            in_quotes: false,
        }
    }

    /// Char index of the last char of the token.
    pub fn end(&self) -> usize {
        self.position + self.text.chars().count().saturating_sub(1)
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }

    /// Unquoted word equal to `word`.
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Word && !self.in_quotes && self.text == word
    }
}

/// Output of [`lex`].
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LexResult {
    /// Fulltext tokens joined by single spaces.
    pub fulltext_query: String,
    pub fulltext_tokens: Vec<Token>,
    pub expression_tokens: Vec<Token>,
}

const OPERATOR_CHARS: &[char] = &['=', '!', '*', '<', '>', '%', '~'];
const QUOTES: &[char] = &['"', '\'', '`'];
const KEYWORDS: &[&str] = &["and", "or", "not"];

fn is_operator_char(c: char) -> bool {
    OPERATOR_CHARS.contains(&c)
}

/// Chars that end an expression-mode word or attribute name.
fn is_word_break(c: char) -> bool {
    c.is_whitespace() || is_operator_char(c) || QUOTES.contains(&c) || matches!(c, '(' | ')' | ',' | '.')
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    expression_mode: bool,
    fulltext: Vec<Token>,
    expression: Vec<Token>,
}

impl Lexer {
    fn new(query: &str) -> Self {
        Self {
            chars: query
                .chars()
                .map(|c| c.to_lowercase().next().unwrap_or(c))
                .collect(),
            pos: 0,
            expression_mode: false,
            fulltext: Vec::new(),
            expression: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn run(mut self) -> LexResult {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else if self.expression_mode {
                self.lex_expression_token(c);
            } else if c == '#' || c == '~' || c == '(' || self.starts_with("note.") {
                self.expression_mode = true;
            } else {
                self.lex_fulltext_token(c);
            }
        }

        let fulltext_query = self
            .fulltext
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        LexResult {
            fulltext_query,
            fulltext_tokens: self.fulltext,
            expression_tokens: self.expression,
        }
    }

    fn lex_fulltext_token(&mut self, c: char) {
        if QUOTES.contains(&c) {
            let (text, position) = self.read_quoted(c);
            if !text.is_empty() {
                self.fulltext.push(Token {
                    in_quotes: true,
                    ..Token::new(TokenKind::Fulltext, text, position)
                });
            }
            return;
        }

        let start = self.pos;
        let text = self.read_while(|c| !c.is_whitespace());
        if text == "orderby" {
            self.expression_mode = true;
            self.expression.push(Token::new(TokenKind::Word, text, start));
        } else {
            self.fulltext.push(Token::new(TokenKind::Fulltext, text, start));
        }
    }

    fn lex_expression_token(&mut self, c: char) {
        let start = self.pos;
        match c {
            '(' => {
                self.pos += 1;
                self.expression.push(Token::new(TokenKind::ParenOpen, "(", start));
            }
            ')' => {
                self.pos += 1;
                self.expression.push(Token::new(TokenKind::ParenClose, ")", start));
            }
            '.' => {
                self.pos += 1;
                self.expression.push(Token::new(TokenKind::Dot, ".", start));
            }
            ',' => {
                self.pos += 1;
                self.expression.push(Token::new(TokenKind::Operator, ",", start));
            }
            _ if QUOTES.contains(&c) => {
                let (text, position) = self.read_quoted(c);
                self.expression.push(Token {
                    in_quotes: true,
                    ..Token::new(TokenKind::QuotedString, text, position)
                });
            }
            '~' if matches!(self.peek_at(1), Some('=') | Some('*')) => {
                let text = self.read_while(is_operator_char);
                self.expression.push(Token::new(TokenKind::Operator, text, start));
            }
            '#' | '~' => {
                let mut text = String::from(c);
                self.pos += 1;
                if self.peek() == Some('!') {
                    text.push('!');
                    self.pos += 1;
                }
                text.push_str(&self.read_while(|c| !is_word_break(c)));
                self.expression.push(Token::new(TokenKind::AttributeRef, text, start));
            }
            _ if is_operator_char(c) => {
                let text = self.read_while(is_operator_char);
                self.expression.push(Token::new(TokenKind::Operator, text, start));
            }
            _ => {
                let text = self.read_word();
                let kind = if KEYWORDS.contains(&text.as_str()) {
                    TokenKind::Operator
                } else {
                    TokenKind::Word
                };
                self.expression.push(Token::new(kind, text, start));
            }
        }
    }

    /// Read chars while `pred` holds, honouring `\` escapes.
    fn read_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                match self.peek_at(1) {
                    Some(escaped) => {
                        text.push(escaped);
                        self.pos += 2;
                    }
                    None => {
                        text.push(c);
                        self.pos += 1;
                    }
                }
                continue;
            }
            if !pred(c) {
                break;
            }
            text.push(c);
            self.pos += 1;
        }
        text
    }

    /// Expression-mode word. A `.` between digits stays part of the word.
    fn read_word(&mut self) -> String {
        let mut text = String::new();
        loop {
            text.push_str(&self.read_while(|c| !is_word_break(c)));
            let numeric_dot = self.peek() == Some('.')
                && !text.is_empty()
                && text.chars().all(|c| c.is_ascii_digit() || c == '-' || c == '+')
                && self.peek_at(1).is_some_and(|c| c.is_ascii_digit());
            if !numeric_dot {
                break;
            }
            text.push('.');
            self.pos += 1;
        }
        text
    }

    /// Read a quoted segment opened by `quote`. Other quote kinds inside are
    /// literal. Returns the content and the char index where it starts.
    fn read_quoted(&mut self, quote: char) -> (String, usize) {
        self.pos += 1;
        let position = self.pos;
        let text = self.read_while(|c| c != quote);
        if self.peek() == Some(quote) {
            self.pos += 1;
        }
        (text, position)
    }
}

/// Tokenize a query. The query is lowercased first.
pub fn lex(query: &str) -> LexResult {
    Lexer::new(query).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty_query() {
        let result = lex("");
        assert!(result.fulltext_tokens.is_empty());
        assert!(result.expression_tokens.is_empty());
        assert_eq!(result.fulltext_query, "");
    }

    #[test]
    fn test_fulltext_only() {
        let result = lex("Hello  World");
        assert_eq!(texts(&result.fulltext_tokens), vec!["hello", "world"]);
        assert_eq!(result.fulltext_query, "hello world");
        assert!(result.expression_tokens.is_empty());
    }

    #[test]
    fn test_quoted_fulltext_keeps_spaces() {
        let result = lex(r#"'hello world' "it's here""#);
        assert_eq!(texts(&result.fulltext_tokens), vec!["hello world", "it's here"]);
        assert!(result.fulltext_tokens.iter().all(|t| t.in_quotes));
        assert_eq!(result.fulltext_query, "hello world it's here");
    }

    #[test]
    fn test_label_comparison() {
        let result = lex("#book=Dune");
        assert_eq!(texts(&result.expression_tokens), vec!["#book", "=", "dune"]);
        assert_eq!(
            kinds(&result.expression_tokens),
            vec![TokenKind::AttributeRef, TokenKind::Operator, TokenKind::Word]
        );
    }

    #[test]
    fn test_fulltext_then_expression() {
        let result = lex("dune #book and #year >= 1965");
        assert_eq!(texts(&result.fulltext_tokens), vec!["dune"]);
        assert_eq!(
            texts(&result.expression_tokens),
            vec!["#book", "and", "#year", ">=", "1965"]
        );
        assert_eq!(result.expression_tokens[1].kind, TokenKind::Operator);
        assert_eq!(result.expression_tokens[0].position, 5);
    }

    #[test]
    fn test_operators() {
        let result = lex("#a *=* x #b =* y #c *= z #d != w #e %= 'a.*' #f ~= fuzzy");
        let ops: Vec<&str> = result
            .expression_tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Operator)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(ops, vec!["*=*", "=*", "*=", "!=", "%=", "~="]);
    }

    #[test]
    fn test_relation_chain() {
        let result = lex("#book AND ~author.#nationality=French");
        assert_eq!(
            texts(&result.expression_tokens),
            vec!["#book", "and", "~author", ".", "#nationality", "=", "french"]
        );
        assert_eq!(result.expression_tokens[3].kind, TokenKind::Dot);
    }

    #[test]
    fn test_negated_attributes() {
        let result = lex("#!draft ~!author");
        assert_eq!(texts(&result.expression_tokens), vec!["#!draft", "~!author"]);
        assert!(result.expression_tokens.iter().all(|t| t.kind == TokenKind::AttributeRef));
    }

    #[test]
    fn test_note_property_path() {
        let result = lex("note.relations.author.title = 'Frank Herbert'");
        assert_eq!(
            texts(&result.expression_tokens),
            vec!["note", ".", "relations", ".", "author", ".", "title", "=", "frank herbert"]
        );
        let last = result.expression_tokens.last().unwrap();
        assert_eq!(last.kind, TokenKind::QuotedString);
        assert!(last.in_quotes);
    }

    #[test]
    fn test_parens_and_not() {
        let result = lex("(#a or #b) not(#c)");
        assert_eq!(
            kinds(&result.expression_tokens),
            vec![
                TokenKind::ParenOpen,
                TokenKind::AttributeRef,
                TokenKind::Operator,
                TokenKind::AttributeRef,
                TokenKind::ParenClose,
                TokenKind::Operator,
                TokenKind::ParenOpen,
                TokenKind::AttributeRef,
                TokenKind::ParenClose,
            ]
        );
    }

    #[test]
    fn test_decimal_value_keeps_dot() {
        let result = lex("#rating > 3.5");
        assert_eq!(texts(&result.expression_tokens), vec!["#rating", ">", "3.5"]);
    }

    #[test]
    fn test_escape() {
        let result = lex(r"#title = a\ b");
        assert_eq!(texts(&result.expression_tokens), vec!["#title", "=", "a b"]);
    }

    #[test]
    fn test_order_by_switches_mode() {
        let result = lex("dune orderBy note.title desc limit 3");
        assert_eq!(texts(&result.fulltext_tokens), vec!["dune"]);
        assert_eq!(
            texts(&result.expression_tokens),
            vec!["orderby", "note", ".", "title", "desc", "limit", "3"]
        );
    }

    #[test]
    fn test_hash_inside_word_is_fulltext() {
        let result = lex("c# tutorial");
        assert_eq!(texts(&result.fulltext_tokens), vec!["c#", "tutorial"]);
    }
}
