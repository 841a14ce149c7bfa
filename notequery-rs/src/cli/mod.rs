//! CLI command implementations.

pub mod args;
pub mod output;

pub mod autocomplete;
pub mod explain;
pub mod saved;
pub mod search;

pub use args::{Cli, Commands};
pub use output::Output;
