//! Configuration for notequery.
//!
//! Loaded from `$NOTEQUERY_CONFIG` or `<config dir>/notequery/config.toml`.
//! A missing file yields the defaults.

use crate::error::{NoteQueryError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "NOTEQUERY_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default snapshot to search when `--graph` is not given.
    pub graph: Option<PathBuf>,
    pub search: SearchConfig,
}

/// Tuning knobs of the search orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of high-quality exact results that make the fuzzy phase unnecessary.
    pub min_result_threshold: usize,
    /// Score a result needs to count as high quality.
    pub min_score_for_quality: f64,
    /// Cap on autocomplete results.
    pub autocomplete_limit: usize,
    /// Window size for content snippets.
    pub snippet_max_length: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_result_threshold: 5,
            min_score_for_quality: 10.0,
            autocomplete_limit: 200,
            snippet_max_length: 200,
        }
    }
}

impl Config {
    /// Load config from the default location.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from an explicit path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text)?;
        Ok(config)
    }

    /// Resolved config file location.
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(p));
        }
        dirs::config_dir().map(|d| d.join("notequery").join("config.toml"))
    }

    /// CLI flag wins over the configured default.
    pub fn resolve_graph_path(&self, cli_override: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = cli_override {
            return Ok(path.to_path_buf());
        }
        self.graph.clone().ok_or_else(|| {
            NoteQueryError::Config(
                "No graph snapshot specified. Use --graph or set `graph` in the config file"
                    .to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.search.min_result_threshold, 5);
        assert_eq!(config.search.min_score_for_quality, 10.0);
        assert_eq!(config.search.autocomplete_limit, 200);
        assert!(config.graph.is_none());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.search, SearchConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "graph = \"/tmp/lib.json\"\n[search]\nmin_result_threshold = 2").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.graph, Some(PathBuf::from("/tmp/lib.json")));
        assert_eq!(config.search.min_result_threshold, 2);
        assert_eq!(config.search.snippet_max_length, 200);
    }

    #[test]
    fn test_resolve_graph_path() {
        let config = Config::default();
        assert!(config.resolve_graph_path(None).is_err());
        let p = config.resolve_graph_path(Some(Path::new("x.json"))).unwrap();
        assert_eq!(p, PathBuf::from("x.json"));
    }
}
