//! Loading a note graph from a JSON, YAML or TOML snapshot file.

use super::note::{Attribute, Branch, Note};
use super::note_graph::NoteGraph;
use super::stats::InMemoryBlobStats;
use crate::error::{NoteQueryError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// On-disk shape of a snapshot.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub notes: Vec<Note>,
    pub branches: Vec<Branch>,
    pub attributes: Vec<Attribute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blobs: Option<InMemoryBlobStats>,
}

/// Serialization format of a snapshot file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Yaml,
    Toml,
}

impl SnapshotFormat {
    /// Guess from the file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => SnapshotFormat::Yaml,
            Some("toml") => SnapshotFormat::Toml,
            _ => SnapshotFormat::Json,
        }
    }
}

/// A graph built from a snapshot, plus any blob rows it carried.
#[derive(Debug)]
pub struct LoadedSnapshot {
    pub graph: NoteGraph,
    pub blob_stats: Option<InMemoryBlobStats>,
}

impl Snapshot {
    pub fn parse(text: &str, format: SnapshotFormat) -> Result<Self> {
        let snapshot = match format {
            SnapshotFormat::Json => serde_json::from_str(text)?,
            SnapshotFormat::Yaml => serde_yaml::from_str(text)?,
            SnapshotFormat::Toml => toml::from_str(text)?,
        };
        Ok(snapshot)
    }

    /// Build the graph. Notes are added first, then branches, then attributes.
    pub fn into_graph(self) -> Result<LoadedSnapshot> {
        let mut graph = NoteGraph::default();
        for note in self.notes {
            graph.add_note(note)?;
        }
        graph.ensure_root();
        for branch in self.branches {
            graph.add_branch(branch)?;
        }
        for attribute in self.attributes {
            graph.add_attribute(attribute)?;
        }
        Ok(LoadedSnapshot {
            graph,
            blob_stats: self.blobs,
        })
    }
}

/// Read and build a snapshot from disk.
pub fn load_snapshot(path: &Path) -> Result<LoadedSnapshot> {
    if !path.exists() {
        return Err(NoteQueryError::SnapshotNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    let invalid = |e: NoteQueryError| NoteQueryError::InvalidSnapshot {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let snapshot = Snapshot::parse(&text, SnapshotFormat::from_path(path)).map_err(invalid)?;
    let loaded = snapshot.into_graph().map_err(invalid)?;
    log::debug!(
        "loaded snapshot {} with {} notes",
        path.display(),
        loaded.graph.len()
    );
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "notes": [
            {"noteId": "root", "title": "root"},
            {"noteId": "a", "title": "Alpha", "content": "<p>hello</p>"},
            {"noteId": "b", "title": "Beta", "type": "code", "mime": "text/x-rust"}
        ],
        "branches": [
            {"noteId": "a", "parentNoteId": "root", "notePosition": 10},
            {"noteId": "b", "parentNoteId": "a", "prefix": "pre"}
        ],
        "attributes": [
            {"noteId": "a", "type": "label", "name": "book"},
            {"noteId": "b", "type": "relation", "name": "author", "value": "a"}
        ],
        "blobs": {"notes": [{"noteId": "a", "blobId": "x", "length": 12}]}
    }"#;

    #[test]
    fn test_parse_json() {
        let loaded = Snapshot::parse(SAMPLE, SnapshotFormat::Json)
            .unwrap()
            .into_graph()
            .unwrap();
        assert_eq!(loaded.graph.len(), 3);
        assert_eq!(loaded.graph.title_in_parent("b", "a"), "pre - Beta");
        assert!(loaded.graph.has_label("a", "book"));
        assert_eq!(loaded.blob_stats.unwrap().notes.len(), 1);
    }

    #[test]
    fn test_root_added_when_missing() {
        let text = r#"{"notes": [{"noteId": "a", "title": "A"}], "branches": [{"noteId": "a", "parentNoteId": "root"}]}"#;
        let loaded = Snapshot::parse(text, SnapshotFormat::Json)
            .unwrap()
            .into_graph()
            .unwrap();
        assert!(loaded.graph.contains("root"));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SnapshotFormat::from_path(Path::new("a.yml")), SnapshotFormat::Yaml);
        assert_eq!(SnapshotFormat::from_path(Path::new("a.TOML")), SnapshotFormat::Toml);
        assert_eq!(SnapshotFormat::from_path(Path::new("a")), SnapshotFormat::Json);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_snapshot(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, NoteQueryError::SnapshotNotFound(_)));
    }

    #[test]
    fn test_load_invalid_branch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        let mut f = fs::File::create(&path).unwrap();
        write!(f, r#"{{"branches": [{{"noteId": "x", "parentNoteId": "root"}}]}}"#).unwrap();

        let err = load_snapshot(&path).unwrap_err();
        assert!(matches!(err, NoteQueryError::InvalidSnapshot { .. }));
    }

    #[test]
    fn test_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.yaml");
        fs::write(
            &path,
            "notes:\n  - noteId: a\n    title: A\nbranches:\n  - noteId: a\n    parentNoteId: root\n",
        )
        .unwrap();
        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded.graph.child_notes("root").len(), 1);
    }
}
