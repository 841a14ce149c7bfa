//! Explain command: show the tokens and expression a query compiles to.

use crate::cli::args::ExplainArgs;
use crate::cli::output::Output;
use crate::error::{ExitCode, Result};
use crate::search::{SearchContext, SearchParams, Token, TokenNode, handle_parens, lex, parse};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainOutput {
    pub query: String,
    pub fulltext_query: String,
    pub fulltext_tokens: Vec<Token>,
    pub structured_expression_tokens: Vec<TokenNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    pub highlighted_tokens: Vec<String>,
    pub errors: Vec<String>,
}

pub fn explain(query: &str, fast_search: bool) -> ExplainOutput {
    let mut ctx = SearchContext::new(SearchParams {
        fast_search,
        ..SearchParams::default()
    });
    ctx.original_query = query.to_string();

    let lexed = lex(query);
    ctx.fulltext_query = lexed.fulltext_query.clone();

    let (structured, expression) = match handle_parens(lexed.expression_tokens) {
        Ok(structured) => {
            let expression = parse(&lexed.fulltext_tokens, &structured, &mut ctx);
            (structured, Some(expression.to_string()))
        }
        Err(e) => {
            ctx.add_error(e.to_string());
            (Vec::new(), None)
        }
    };

    ExplainOutput {
        query: query.to_string(),
        fulltext_query: lexed.fulltext_query,
        fulltext_tokens: lexed.fulltext_tokens,
        structured_expression_tokens: structured,
        expression,
        highlighted_tokens: ctx.highlighted_tokens.clone(),
        errors: ctx.errors().to_vec(),
    }
}

pub fn run(args: &ExplainArgs, output: &Output) -> Result<ExitCode> {
    let explained = explain(&args.query, args.fast);
    output.print(&explained)?;
    Ok(ExitCode::Success)
}
