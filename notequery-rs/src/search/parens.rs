//! Nesting of expression tokens by parentheses.

use super::lexer::{Token, TokenKind};
use crate::error::{NoteQueryError, Result};
use serde::Serialize;

/// A token, or a parenthesized group of nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TokenNode {
    Token(Token),
    Group(Vec<TokenNode>),
}

impl TokenNode {
    pub fn as_token(&self) -> Option<&Token> {
        match self {
            TokenNode::Token(t) => Some(t),
            TokenNode::Group(_) => None,
        }
    }
}

/// Turn the flat token stream into a tree following parentheses.
///
/// Fails on unbalanced parentheses. Quoted parens are values and do not count.
pub fn handle_parens(tokens: Vec<Token>) -> Result<Vec<TokenNode>> {
    let mut stack: Vec<Vec<TokenNode>> = vec![Vec::new()];

    for token in tokens {
        match token.kind {
            TokenKind::ParenOpen => stack.push(Vec::new()),
            TokenKind::ParenClose => {
                if stack.len() == 1 {
                    return Err(NoteQueryError::UnbalancedParens(format!(
                        "Found unmatched right parenthesis at position {}.",
                        token.position
                    )));
                }
                let group = stack.pop().unwrap_or_default();
                if let Some(parent) = stack.last_mut() {
                    parent.push(TokenNode::Group(group));
                }
            }
            _ => {
                if let Some(current) = stack.last_mut() {
                    current.push(TokenNode::Token(token));
                }
            }
        }
    }

    if stack.len() > 1 {
        return Err(NoteQueryError::UnbalancedParens(
            "Did not find matching right parenthesis.".to_string(),
        ));
    }
    Ok(stack.pop().unwrap_or_default())
}
