//! Search command implementation.

use crate::cli::args::SearchArgs;
use crate::cli::output::Output;
use crate::error::{ExitCode, Result};
use crate::search::{SearchContext, SearchParams, SearchResult, SearchService};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total: usize,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchArgs {
    pub fn to_params(&self) -> SearchParams {
        SearchParams {
            fast_search: self.fast,
            include_archived_notes: self.include_archived,
            include_hidden_notes: self.include_hidden,
            ancestor_note_id: self.ancestor.clone(),
            ancestor_depth: self.ancestor_depth.clone(),
            order_by: self.order_by.clone(),
            order_direction: self.order_direction.map(|d| d.as_str().to_string()),
            limit: self.limit,
            debug: self.debug,
            enable_fuzzy_matching: !self.no_fuzzy,
            ..SearchParams::default()
        }
    }
}

pub fn run(service: &SearchService<'_>, args: &SearchArgs, output: &Output) -> Result<ExitCode> {
    let mut ctx = SearchContext::new(args.to_params());
    let results = service.find_results_with_query(&args.query, &mut ctx);

    for message in ctx.errors().iter().skip(1) {
        output.warn(message);
    }

    let response = SearchResponse {
        total: results.len(),
        results,
        query: args.query.clone(),
        error: ctx.error().map(str::to_string),
    };
    output.print(&response)?;

    if args.strict && ctx.has_error() {
        return Ok(ExitCode::QueryErrors);
    }
    Ok(ExitCode::Success)
}
