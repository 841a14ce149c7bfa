//! Saved search command implementation.

use crate::cli::args::SavedArgs;
use crate::cli::output::Output;
use crate::error::{ExitCode, Result};
use crate::search::SearchService;

pub fn run(service: &SearchService<'_>, args: &SavedArgs, output: &Output) -> Result<ExitCode> {
    let result = service.search_from_note(&args.note_id)?;
    output.print(&result)?;
    Ok(ExitCode::Success)
}
