//! Recursive descent parser turning lexed tokens into an [`Expression`].
//!
//! Grammar (one level of the paren structure; groups recurse):
//! ```text
//! query      = or_expr [order_by]
//! or_expr    = and_expr ("or" and_expr)*
//! and_expr   = unary ("and"? unary)*
//! unary      = "not" GROUP | atom
//! atom       = GROUP | attribute | "note" property
//! attribute  = "#" ["!"] NAME [OP value]
//!            | "~" ["!"] NAME ["." property]
//! property   = "." ( "parents" property | "children" property | "ancestors" property
//!                  | "labels" "." NAME [OP value]
//!                  | ("relations" | "targetrelations") "." NAME ["." property]
//!                  | ("content" | "rawcontent" | "text") OP value
//!                  | attribute
//!                  | PROPERTY OP value )
//! order_by   = "orderby" path [dir] ("," path [dir])* ["limit" N] | "limit" N
//! ```
//!
//! Errors are recorded on the [`SearchContext`]. Parsing stops at the first
//! error and keeps what was built before it.

use super::comparator::{CompareOp, Comparator};
use super::context::{DebugInfo, SearchContext};
use super::expression::{
    Ancestor, AttributeComparison, AttributeExists, Content, Expression, FlatText, OrderBy, OrderDefinition,
    OrderDirection, PropertyComparison, Relation, RelationDirection,
};
use super::lexer::{Token, TokenKind};
use super::parens::TokenNode;
use super::text::{normalize, validate_fuzzy_tokens};
use super::value::{ValueExtractor, needs_db_load, property_name};
use crate::graph::{AttributeType, HIDDEN_NOTE_ID, ROOT_NOTE_ID};
use chrono::{Datelike, Local, Months, TimeDelta};
use regex::Regex;
use std::sync::LazyLock;

static SMART_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(now|today|month|year)\s*(?:([+-])\s*(\d+))?$").unwrap());

/// Chars of query context shown on either side of an offending token.
const ERROR_CONTEXT_CHARS: usize = 20;

// ============================================================================
// Entry point
// ============================================================================

/// Build the full expression for a query: the parsed expression wrapped with
/// the archived/hidden/ancestor filters, the fulltext match and the ordering
/// requested by the context.
pub fn parse(fulltext_tokens: &[Token], expression_tokens: &[TokenNode], ctx: &mut SearchContext) -> Expression {
    let expression = Parser::new(expression_tokens, 0, ctx).parse();

    let archived = (!ctx.include_archived_notes).then(|| Expression::PropertyComparison(PropertyComparison::not_archived()));
    let ancestor = ancestor_expression(ctx);
    let fulltext = fulltext_expression(fulltext_tokens, ctx);

    let mut root = Expression::and_of([archived, ancestor, fulltext, expression]).unwrap_or(Expression::True);

    let order_by = ctx.order_by.clone();
    match (order_by.as_deref(), ctx.limit) {
        (Some(order_by), limit) if order_by != "relevancy" => {
            let extractor = ValueExtractor::new(&["note".to_string(), order_by.to_string()]);
            if let Some(message) = extractor.validate() {
                ctx.add_error(message);
            }
            if extractor.needs_db_load() {
                ctx.db_load_needed = true;
            }
            let direction = ctx.order_direction.as_deref().map(OrderDirection::parse).unwrap_or_default();
            root = Expression::OrderBy(OrderBy::new(root, vec![OrderDefinition { extractor, direction }], limit));
        }
        (_, Some(limit)) => {
            root = Expression::OrderBy(OrderBy::new(root, Vec::new(), Some(limit)));
        }
        _ => {}
    }

    if ctx.debug {
        ctx.debug_info = Some(DebugInfo {
            fulltext_tokens: fulltext_tokens.to_vec(),
            structured_expression_tokens: expression_tokens.to_vec(),
            expression: root.to_string(),
        });
    }

    root
}

fn ancestor_expression(ctx: &SearchContext) -> Option<Expression> {
    let depth = ctx.ancestor_depth.as_deref().filter(|d| !d.trim().is_empty());
    match ctx.ancestor_note_id.as_deref() {
        Some(id) if id != ROOT_NOTE_ID => Some(Expression::Ancestor(Ancestor::new(id, depth))),
        _ => {
            let hidden = (!ctx.include_hidden_notes)
                .then(|| Expression::Not(Box::new(Expression::Ancestor(Ancestor::new(HIDDEN_NOTE_ID, None)))));
            let depth = depth.map(|d| Expression::Ancestor(Ancestor::new(ROOT_NOTE_ID, Some(d))));
            Expression::and_of([depth, hidden])
        }
    }
}

fn fulltext_expression(tokens: &[Token], ctx: &mut SearchContext) -> Option<Expression> {
    let tokens: Vec<String> = tokens.iter().map(|t| normalize(&t.text)).collect();
    for token in &tokens {
        ctx.add_highlighted_token(token.clone());
    }
    if tokens.is_empty() {
        return None;
    }

    let flat_text = Expression::FlatText(FlatText::new(&tokens));
    if ctx.fast_search {
        return Some(flat_text);
    }
    match Content::new(CompareOp::Contains, tokens, false, true) {
        Ok(content) => Some(Expression::Or(vec![flat_text, Expression::Content(content)])),
        Err(message) => {
            ctx.add_error(message);
            Some(flat_text)
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'t, 'c> {
    nodes: &'t [TokenNode],
    pos: usize,
    /// Paren nesting depth, 0 for the top level.
    level: usize,
    ctx: &'c mut SearchContext,
}

impl<'t, 'c> Parser<'t, 'c> {
    fn new(nodes: &'t [TokenNode], level: usize, ctx: &'c mut SearchContext) -> Self {
        Self {
            nodes,
            pos: 0,
            level,
            ctx,
        }
    }

    fn peek(&self) -> Option<&'t TokenNode> {
        self.nodes.get(self.pos)
    }

    fn token_at(&self, pos: usize) -> Option<&'t Token> {
        self.nodes.get(pos).and_then(TokenNode::as_token)
    }

    fn peek_token(&self) -> Option<&'t Token> {
        self.token_at(self.pos)
    }

    fn advance(&mut self) -> Option<&'t TokenNode> {
        let node = self.nodes.get(self.pos);
        if node.is_some() {
            self.pos += 1;
        }
        node
    }

    fn failed(&self) -> bool {
        self.ctx.has_error()
    }

    fn error<T>(&mut self, message: String) -> Option<T> {
        self.ctx.add_error(message);
        None
    }

    /// The stretch of the original query around `token`, quoted.
    fn context(&self, token: &Token) -> String {
        let query: Vec<char> = self.ctx.original_query.chars().collect();
        let end = query.len().min(token.end() + ERROR_CONTEXT_CHARS);
        let start = token.position.saturating_sub(ERROR_CONTEXT_CHARS).min(end);
        format!(
            "\"{}{}{}\"",
            if start != 0 { "..." } else { "" },
            query[start..end].iter().collect::<String>(),
            if end != query.len() { "..." } else { "" }
        )
    }

    fn parse(mut self) -> Option<Expression> {
        let mut or_groups: Vec<Option<Expression>> = Vec::new();
        let mut and_group: Vec<Option<Expression>> = Vec::new();

        while let Some(node) = self.peek() {
            if self.failed() {
                break;
            }
            let token = match node {
                TokenNode::Group(group) => {
                    self.pos += 1;
                    and_group.push(Parser::new(group, self.level + 1, &mut *self.ctx).parse());
                    continue;
                }
                TokenNode::Token(token) => token,
            };

            match token.kind {
                TokenKind::AttributeRef => {
                    self.pos += 1;
                    and_group.push(self.parse_attribute(token));
                }
                TokenKind::Operator if token.text == "and" => self.pos += 1,
                TokenKind::Operator if token.text == "or" => {
                    self.pos += 1;
                    or_groups.push(Expression::and_of(std::mem::take(&mut and_group)));
                }
                TokenKind::Operator if token.text == "not" => {
                    self.pos += 1;
                    and_group.push(self.parse_not());
                }
                TokenKind::Operator => {
                    self.error::<()>(format!("Misplaced or incomplete expression \"{}\"", token.text));
                }
                _ if token.is_word("note") => {
                    self.pos += 1;
                    and_group.push(self.parse_note_property());
                }
                _ if token.is_word("orderby") || token.is_word("limit") => {
                    or_groups.push(Expression::and_of(std::mem::take(&mut and_group)));
                    let filter = Expression::or_of(or_groups).unwrap_or(Expression::True);
                    return self.parse_order_by(filter);
                }
                _ => {
                    self.error::<()>(format!("Unrecognized expression \"{}\"", token.text));
                }
            }
        }

        or_groups.push(Expression::and_of(and_group));
        Expression::or_of(or_groups)
    }

    fn parse_not(&mut self) -> Option<Expression> {
        match self.advance() {
            Some(TokenNode::Group(group)) => {
                let sub = Parser::new(group, self.level + 1, &mut *self.ctx).parse()?;
                Some(Expression::Not(Box::new(sub)))
            }
            Some(TokenNode::Token(token)) => self.error(format!(
                "not keyword should be followed by sub-expression in parenthesis, got {} instead",
                token.text
            )),
            None => self.error(
                "not keyword should be followed by sub-expression in parenthesis, got nothing instead".to_string(),
            ),
        }
    }

    // ------------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------------

    fn parse_attribute(&mut self, token: &'t Token) -> Option<Expression> {
        let (kind, rest) = match token.text.split_at_checked(1) {
            Some(("#", rest)) => (AttributeType::Label, rest),
            Some(("~", rest)) => (AttributeType::Relation, rest),
            _ => return self.error(format!("Unrecognized expression \"{}\"", token.text)),
        };
        let (negated, name) = match rest.strip_prefix('!') {
            Some(name) => (true, name),
            None => (false, rest),
        };
        if name.is_empty() {
            return self.error(format!("Attribute name is missing in {}", self.context(token)));
        }

        let expression = match kind {
            AttributeType::Label => self.parse_label(name, token)?,
            AttributeType::Relation => self.parse_relation(name, token)?,
        };
        Some(if negated {
            Expression::Not(Box::new(expression))
        } else {
            expression
        })
    }

    /// `#name` or `#name OP value`. The current position is just after the name.
    fn parse_label(&mut self, name: &str, name_token: &Token) -> Option<Expression> {
        self.ctx.add_highlighted_token(name);

        let Some(op_token) = self.comparison_ahead() else {
            return Some(Expression::AttributeExists(AttributeExists::new(
                AttributeType::Label,
                name,
                self.ctx.fuzzy_attribute_search,
            )));
        };
        let Some(op) = CompareOp::parse(&op_token.text) else {
            return self.error(format!("Can't find operator '{}' in {}", op_token.text, self.context(op_token)));
        };
        self.pos += 1;
        let value = self.constant_operand(op_token)?;

        let op = if self.ctx.fuzzy_attribute_search && op == CompareOp::Eq {
            CompareOp::Contains
        } else {
            op
        };
        if op.is_fuzzy() {
            if let Err(message) = validate_fuzzy_tokens(std::slice::from_ref(&value)) {
                return self.error(message);
            }
        }
        self.ctx.add_highlighted_token(value.clone());

        match Comparator::new(op, &value) {
            Ok(comparator) => Some(Expression::AttributeComparison(AttributeComparison::new(
                AttributeType::Label,
                name,
                comparator,
            ))),
            Err(message) => self.error(format!("{} in {}", message, self.context(name_token))),
        }
    }

    /// `~name`, or `~name.<property>` following the relation to its target.
    fn parse_relation(&mut self, name: &str, name_token: &Token) -> Option<Expression> {
        self.ctx.add_highlighted_token(name);

        if self.peek_token().is_some_and(|t| t.kind == TokenKind::Dot) {
            let sub = self.parse_note_property()?;
            return Some(Expression::Relation(Relation::new(name, RelationDirection::Forward, Some(sub))));
        }
        if self.comparison_ahead().is_some() {
            return self.error(format!(
                "Relation can be compared only with property, e.g. ~relation.title=hello in {}",
                self.context(name_token)
            ));
        }
        Some(Expression::AttributeExists(AttributeExists::new(
            AttributeType::Relation,
            name,
            self.ctx.fuzzy_attribute_search,
        )))
    }

    /// The operator token at the current position, if something follows it.
    fn comparison_ahead(&self) -> Option<&'t Token> {
        let op_token = self.peek_token().filter(|t| t.kind == TokenKind::Operator && !is_keyword(t))?;
        self.nodes.get(self.pos + 1)?;
        Some(op_token)
    }

    /// The value after `op_token`, consumed. Attribute references and
    /// property paths are rejected, smart date values resolved.
    fn constant_operand(&mut self, op_token: &Token) -> Option<String> {
        let node = self.advance();
        let operand = match node {
            Some(TokenNode::Token(token)) => token,
            _ => {
                return self.error(format!("Misplaced or incomplete expression \"{}\"", op_token.text));
            }
        };

        if !operand.in_quotes
            && (operand.kind == TokenKind::AttributeRef || operand.text == "note" || operand.kind == TokenKind::Dot)
        {
            return self.error(format!(
                "Error near token \"{}\" in {}, it's possible to compare with constant only.",
                operand.text,
                self.context(operand)
            ));
        }
        if operand.in_quotes {
            return Some(operand.text.clone());
        }
        if matches!(operand.kind, TokenKind::ParenOpen | TokenKind::ParenClose) {
            return self.error(format!("Misplaced or incomplete expression \"{}\"", op_token.text));
        }
        Some(resolve_smart_value(&operand.text).unwrap_or_else(|| operand.text.clone()))
    }

    // ------------------------------------------------------------------------
    // note.<property>
    // ------------------------------------------------------------------------

    /// Parse `.<property…>`. The current token must be the dot.
    fn parse_note_property(&mut self) -> Option<Expression> {
        match self.advance() {
            Some(TokenNode::Token(t)) if t.kind == TokenKind::Dot => {}
            Some(TokenNode::Token(t)) => {
                return self.error(format!(
                    "Expected \".\" to separate field path, got \"{}\" in {}",
                    t.text,
                    self.context(t)
                ));
            }
            _ => return self.error("Expected \".\" to separate field path".to_string()),
        }

        let Some(token) = self.advance().and_then(TokenNode::as_token) else {
            return self.error("Expected property name after \".\"".to_string());
        };

        if token.kind == TokenKind::AttributeRef {
            return self.parse_attribute(token);
        }

        match token.text.as_str() {
            "parents" => Some(Expression::ChildOf(Box::new(self.parse_note_property()?))),
            "children" => Some(Expression::ParentOf(Box::new(self.parse_note_property()?))),
            "ancestors" => Some(Expression::DescendantOf(Box::new(self.parse_note_property()?))),
            "labels" => {
                let name = self.path_name(token)?;
                self.parse_label(&name.text, name)
            }
            "relations" | "targetrelations" => {
                let direction = if token.text == "relations" {
                    RelationDirection::Forward
                } else {
                    RelationDirection::Backward
                };
                let name = self.path_name(token)?;
                self.ctx.add_highlighted_token(name.text.clone());
                if self.peek_token().is_some_and(|t| t.kind == TokenKind::Dot) {
                    let sub = self.parse_note_property()?;
                    return Some(Expression::Relation(Relation::new(&name.text, direction, Some(sub))));
                }
                match direction {
                    RelationDirection::Forward => Some(Expression::AttributeExists(AttributeExists::new(
                        AttributeType::Relation,
                        &name.text,
                        self.ctx.fuzzy_attribute_search,
                    ))),
                    RelationDirection::Backward => {
                        Some(Expression::Relation(Relation::new(&name.text, direction, None)))
                    }
                }
            }
            "content" | "rawcontent" | "text" => self.parse_content(token),
            _ => self.parse_property(token),
        }
    }

    /// After `labels` / `relations`: `. NAME`, returning the name token.
    fn path_name(&mut self, after: &Token) -> Option<&'t Token> {
        match (self.token_at(self.pos), self.token_at(self.pos + 1)) {
            (Some(dot), Some(name)) if dot.kind == TokenKind::Dot => {
                self.pos += 2;
                Some(name)
            }
            (Some(other), _) => self.error(format!(
                "Expected \".\" to separate field path, got \"{}\" in {}",
                other.text,
                self.context(other)
            )),
            _ => self.error(format!("Expected \".\" after \"{}\" in {}", after.text, self.context(after))),
        }
    }

    fn parse_content(&mut self, token: &'t Token) -> Option<Expression> {
        let Some(op_token) = self.peek_token().filter(|t| t.kind == TokenKind::Operator) else {
            return self.error(format!(
                "After content expected operator, but got \"{}\" in {}",
                self.peek_token().map(|t| t.text.as_str()).unwrap_or(""),
                self.context(token)
            ));
        };
        let Some(op) = CompareOp::parse(&op_token.text) else {
            return self.error(format!("Can't find operator '{}' in {}", op_token.text, self.context(op_token)));
        };
        if token.text == "text" && op != CompareOp::Contains {
            return self.error(format!(
                "Virtual attribute \"note.text\" supports only *=* operator, instead given \"{}\" in {}",
                op_token.text,
                self.context(op_token)
            ));
        }
        self.pos += 1;
        let value = self.constant_operand(op_token)?;
        self.ctx.add_highlighted_token(value.clone());

        let raw = token.text == "rawcontent";
        let flat_text = token.text == "text";
        match Content::new(op, vec![value], raw, flat_text) {
            Ok(content) => Some(Expression::Content(content)),
            Err(message) => self.error(message),
        }
    }

    fn parse_property(&mut self, token: &'t Token) -> Option<Expression> {
        let Some(property) = property_name(&token.text) else {
            return self.error(format!("Unrecognized note property \"{}\" in {}", token.text, self.context(token)));
        };
        let Some(op_token) = self.peek_token().filter(|t| t.kind == TokenKind::Operator && !is_keyword(t)) else {
            return self.error(format!(
                "Property \"{}\" must be compared with a value in {}",
                token.text,
                self.context(token)
            ));
        };
        let Some(op) = CompareOp::parse(&op_token.text) else {
            return self.error(format!("Can't find operator '{}' in {}", op_token.text, self.context(op_token)));
        };
        self.pos += 1;
        let value = self.constant_operand(op_token)?;

        if needs_db_load(property) {
            self.ctx.db_load_needed = true;
        }
        match PropertyComparison::new(property, op, &value) {
            Ok(comparison) => Some(Expression::PropertyComparison(comparison)),
            Err(message) => self.error(message),
        }
    }

    // ------------------------------------------------------------------------
    // orderBy / limit
    // ------------------------------------------------------------------------

    fn parse_order_by(&mut self, filter: Expression) -> Option<Expression> {
        if self.level != 0 {
            return self.error("orderBy can appear only on the top expression level".to_string());
        }

        let mut definitions = Vec::new();
        if self.peek_token().is_some_and(|t| t.is_word("orderby")) {
            self.pos += 1;
            loop {
                let mut path = Vec::new();
                loop {
                    match self.advance().and_then(TokenNode::as_token) {
                        Some(t) if matches!(t.kind, TokenKind::Word | TokenKind::AttributeRef) => {
                            path.push(t.text.clone())
                        }
                        Some(t) => return self.error(format!("Unexpected \"{}\" in orderBy {}", t.text, self.context(t))),
                        None => return self.error("orderBy is missing a property".to_string()),
                    }
                    if !self.peek_token().is_some_and(|t| t.kind == TokenKind::Dot) {
                        break;
                    }
                    self.pos += 1;
                }

                let mut direction = OrderDirection::Asc;
                if let Some(t) = self.peek_token().filter(|t| t.is_word("asc") || t.is_word("desc")) {
                    direction = OrderDirection::parse(&t.text);
                    self.pos += 1;
                }

                let extractor = ValueExtractor::new(&path);
                if let Some(message) = extractor.validate() {
                    return self.error(message);
                }
                if extractor.needs_db_load() {
                    self.ctx.db_load_needed = true;
                }
                definitions.push(OrderDefinition { extractor, direction });

                if self.peek_token().is_some_and(|t| t.is_operator(",")) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }

        let mut limit = None;
        if self.peek_token().is_some_and(|t| t.is_word("limit")) {
            self.pos += 1;
            match self.advance().and_then(TokenNode::as_token) {
                Some(t) => match t.text.parse::<usize>() {
                    Ok(n) => limit = Some(n),
                    Err(_) => return self.error(format!("Invalid limit \"{}\" in {}", t.text, self.context(t))),
                },
                None => return self.error("limit must be followed by a number".to_string()),
            }
        }

        if let Some(node) = self.peek() {
            let text = match node {
                TokenNode::Token(t) => t.text.as_str(),
                TokenNode::Group(_) => "(",
            };
            return self.error(format!("Unrecognized expression \"{}\"", text));
        }

        self.ctx.has_explicit_ordering = true;
        Some(Expression::OrderBy(OrderBy::new(filter, definitions, limit)))
    }
}

fn is_keyword(token: &Token) -> bool {
    matches!(token.text.as_str(), "and" | "or" | "not" | ",")
}

/// `now`, `today`, `month`, `year` with an optional `+N`/`-N` offset in
/// seconds, days, months or years.
///
/// `None` when the value is not a smart value or the offset leaves the
/// representable date range.
fn resolve_smart_value(value: &str) -> Option<String> {
    let caps = SMART_VALUE.captures(value)?;
    let unit = caps.get(1)?.as_str();
    let mut delta: i64 = match caps.get(3) {
        Some(n) => n.as_str().parse().ok()?,
        None => 0,
    };
    if caps.get(2).is_some_and(|s| s.as_str() == "-") {
        delta = -delta;
    }

    let now = Local::now();
    let resolved = match unit {
        "now" => now
            .checked_add_signed(TimeDelta::try_seconds(delta)?)?
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        "today" => now
            .checked_add_signed(TimeDelta::try_days(delta)?)?
            .format("%Y-%m-%d")
            .to_string(),
        "month" => {
            let months = Months::new(u32::try_from(delta.unsigned_abs()).ok()?);
            let shifted = if delta >= 0 {
                now.checked_add_months(months)?
            } else {
                now.checked_sub_months(months)?
            };
            shifted.format("%Y-%m").to_string()
        }
        _ => i64::from(now.year()).checked_add(delta)?.to_string(),
    };
    Some(resolved)
}
