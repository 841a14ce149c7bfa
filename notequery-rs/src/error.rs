//! Error types and exit codes for notequery.
//!
//! Query-level problems (bad syntax, unknown properties) are not errors in
//! this sense: they are collected on the `SearchContext` and the search still
//! produces (possibly empty) results. `NoteQueryError` covers contract
//! violations and I/O around the engine.

use std::path::PathBuf;
use thiserror::Error;

/// Process exit codes used by the CLI.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOTE_NOT_FOUND: i32 = 2;
    pub const INVALID_SNAPSHOT: i32 = 3;
    pub const QUERY_ERRORS: i32 = 4;
}

/// Main error type for notequery operations.
#[derive(Error, Debug)]
pub enum NoteQueryError {
    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("Snapshot not found at: {0}")]
    SnapshotNotFound(PathBuf),

    #[error("Invalid snapshot {path}: {message}")]
    InvalidSnapshot { path: PathBuf, message: String },

    #[error("{0}")]
    UnbalancedParens(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("{0}")]
    Other(String),
}

impl NoteQueryError {
    /// Returns the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            NoteQueryError::NoteNotFound(_) => exit_code::NOTE_NOT_FOUND,
            NoteQueryError::SnapshotNotFound(_) | NoteQueryError::InvalidSnapshot { .. } => {
                exit_code::INVALID_SNAPSHOT
            }
            _ => exit_code::GENERAL_ERROR,
        }
    }
}

/// Result type alias for notequery operations.
pub type Result<T> = std::result::Result<T, NoteQueryError>;

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    GeneralError,
    NoteNotFound,
    InvalidSnapshot,
    QueryErrors,
}

impl ExitCode {
    /// Convert to exit code integer.
    pub fn code(self) -> i32 {
        match self {
            ExitCode::Success => exit_code::SUCCESS,
            ExitCode::GeneralError => exit_code::GENERAL_ERROR,
            ExitCode::NoteNotFound => exit_code::NOTE_NOT_FOUND,
            ExitCode::InvalidSnapshot => exit_code::INVALID_SNAPSHOT,
            ExitCode::QueryErrors => exit_code::QUERY_ERRORS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_not_found_exit_code() {
        let err = NoteQueryError::NoteNotFound("abc".to_string());
        assert_eq!(err.exit_code(), exit_code::NOTE_NOT_FOUND);
        assert_eq!(err.to_string(), "Note not found: abc");
    }

    #[test]
    fn test_snapshot_errors_share_exit_code() {
        let missing = NoteQueryError::SnapshotNotFound(PathBuf::from("/nope.json"));
        let invalid = NoteQueryError::InvalidSnapshot {
            path: PathBuf::from("bad.json"),
            message: "duplicate note".to_string(),
        };
        assert_eq!(missing.exit_code(), exit_code::INVALID_SNAPSHOT);
        assert_eq!(invalid.exit_code(), exit_code::INVALID_SNAPSHOT);
    }

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.code(), 0);
        assert_eq!(ExitCode::QueryErrors.code(), 4);
    }
}
