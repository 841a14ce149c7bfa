//! notequery CLI entry point.

use clap::Parser;
use notequery::cli::args::{Cli, Commands};
use notequery::cli::output::Output;
use notequery::cli::{autocomplete, explain, saved, search};
use notequery::config::Config;
use notequery::error::{ExitCode as QueryExitCode, NoteQueryError};
use notequery::graph::{BlobStatsSource, load_snapshot};
use notequery::search::SearchService;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level())).init();

    match run(&cli) {
        Ok(code) => ExitCode::from(code.code() as u8),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {}", e);
            }
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<QueryExitCode, NoteQueryError> {
    let output = Output::new(cli.output_format(), cli.quiet);

    // explain needs no graph
    if let Commands::Explain(args) = &cli.command {
        return explain::run(args, &output);
    }

    let config = Config::load()?;
    let graph_path = config.resolve_graph_path(cli.graph.as_deref())?;
    let snapshot = load_snapshot(&graph_path)?;

    let mut service = SearchService::new(&snapshot.graph).with_config(config.search.clone());
    if let Some(blobs) = &snapshot.blob_stats {
        service = service.with_blob_stats(blobs as &dyn BlobStatsSource);
    }

    match &cli.command {
        Commands::Search(args) => search::run(&service, args, &output),
        Commands::Autocomplete(args) => autocomplete::run(&service, args, &output),
        Commands::Saved(args) => saved::run(&service, args, &output),
        Commands::Explain(args) => explain::run(args, &output),
    }
}
