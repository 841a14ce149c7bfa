//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "notequery")]
#[command(author, version, about = "Query and rank notes in a note graph snapshot", long_about = None)]
pub struct Cli {
    /// Path to the graph snapshot (overrides config default)
    #[arg(long, global = true)]
    pub graph: Option<PathBuf>,

    /// Output as JSON (default)
    #[arg(long, global = true, conflicts_with_all = ["yaml", "toml"])]
    pub json: bool,

    /// Output as YAML
    #[arg(long, global = true, conflicts_with_all = ["json", "toml"])]
    pub yaml: bool,

    /// Output as TOML
    #[arg(long, global = true, conflicts_with_all = ["json", "yaml"])]
    pub toml: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (can be repeated)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        if self.yaml {
            OutputFormat::Yaml
        } else if self.toml {
            OutputFormat::Toml
        } else {
            OutputFormat::Json
        }
    }

    /// Default log filter for the `-v` count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Toml,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a query and print ranked results
    Search(SearchArgs),

    /// Quick search with snippets and highlighting
    Autocomplete(AutocompleteArgs),

    /// Run the search stored on a saved search note
    Saved(SavedArgs),

    /// Show how a query is tokenized and parsed
    Explain(ExplainArgs),
}

// === Search ===

#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Match titles, paths and attributes only, skip content
    #[arg(long)]
    pub fast: bool,

    /// Only search under this note
    #[arg(long)]
    pub ancestor: Option<String>,

    /// Depth below the ancestor: eqN, ltN or gtN
    #[arg(long)]
    pub ancestor_depth: Option<String>,

    /// Include notes labeled #archived
    #[arg(long)]
    pub include_archived: bool,

    /// Include notes in the hidden subtree
    #[arg(long)]
    pub include_hidden: bool,

    /// Order by a note property instead of relevance
    #[arg(long)]
    pub order_by: Option<String>,

    /// Direction for --order-by
    #[arg(long, value_enum)]
    pub order_direction: Option<Direction>,

    /// Maximum number of results
    #[arg(long)]
    pub limit: Option<usize>,

    /// Disable the fuzzy fallback phase
    #[arg(long)]
    pub no_fuzzy: bool,

    /// Log parser internals
    #[arg(long)]
    pub debug: bool,

    /// Exit with a non-zero code when the query reports errors
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

// === Autocomplete ===

#[derive(Parser, Debug)]
pub struct AutocompleteArgs {
    /// Search query
    pub query: String,

    /// Also search note content
    #[arg(long)]
    pub no_fast: bool,

    /// Hoisted note to search under
    #[arg(long)]
    pub hoisted: Option<String>,
}

// === Saved ===

#[derive(Parser, Debug)]
pub struct SavedArgs {
    /// Id of the saved search note
    pub note_id: String,
}

// === Explain ===

#[derive(Parser, Debug)]
pub struct ExplainArgs {
    /// Query to explain
    pub query: String,

    /// Parse as a fast search
    #[arg(long)]
    pub fast: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_flags() {
        let cli = Cli::parse_from([
            "notequery",
            "--yaml",
            "search",
            "#book",
            "--order-by",
            "title",
            "--order-direction",
            "desc",
            "--limit",
            "3",
            "--strict",
        ]);
        assert_eq!(cli.output_format(), OutputFormat::Yaml);
        let Commands::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.query, "#book");
        assert_eq!(args.order_by.as_deref(), Some("title"));
        assert_eq!(args.order_direction, Some(Direction::Desc));
        assert_eq!(args.limit, Some(3));
        assert!(args.strict);
    }

    #[test]
    fn test_verbosity_levels() {
        let cli = Cli::parse_from(["notequery", "explain", "x"]);
        assert_eq!(cli.log_level(), "warn");
        let cli = Cli::parse_from(["notequery", "-vv", "explain", "x"]);
        assert_eq!(cli.log_level(), "debug");
    }

    #[test]
    fn test_global_graph_after_subcommand() {
        let cli = Cli::parse_from(["notequery", "saved", "s1", "--graph", "lib.json"]);
        assert_eq!(cli.graph, Some(PathBuf::from("lib.json")));
    }
}
