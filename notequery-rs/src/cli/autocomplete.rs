//! Autocomplete command implementation.

use crate::cli::args::AutocompleteArgs;
use crate::cli::output::Output;
use crate::error::{ExitCode, Result};
use crate::search::{AutocompleteItem, SearchService};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AutocompleteResponse {
    pub items: Vec<AutocompleteItem>,
    pub total: usize,
    pub query: String,
}

pub fn run(service: &SearchService<'_>, args: &AutocompleteArgs, output: &Output) -> Result<ExitCode> {
    let items = service.search_notes_for_autocomplete(&args.query, !args.no_fast, args.hoisted.as_deref());
    let response = AutocompleteResponse {
        total: items.len(),
        items,
        query: args.query.clone(),
    };
    output.print(&response)?;
    Ok(ExitCode::Success)
}
