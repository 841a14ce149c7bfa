//! Per-note size statistics derived from blob rows.
//!
//! Several objects (the note itself, its attachments, its revisions) can
//! point at the same blob. Each blob counts once towards a note's totals, so
//! the rows are folded into a `note id -> {blob id -> size}` map first.

use super::note_graph::NoteGraph;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One `(note, blob, length)` tuple as returned by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobRow {
    pub note_id: String,
    pub blob_id: String,
    pub length: u64,
    /// Revision rows only: true for the revision's own content, false for
    /// attachments of a revision.
    #[serde(default)]
    pub is_note_revision: bool,
}

impl BlobRow {
    pub fn new(note_id: impl Into<String>, blob_id: impl Into<String>, length: u64) -> Self {
        Self {
            note_id: note_id.into(),
            blob_id: blob_id.into(),
            length,
            is_note_revision: false,
        }
    }

    pub fn revision(mut self) -> Self {
        self.is_note_revision = true;
        self
    }
}

/// Read access to blob sizes.
pub trait BlobStatsSource {
    /// Content blob of each note.
    fn note_rows(&self) -> Vec<BlobRow>;
    /// Attachment blobs, keyed by owning note.
    fn attachment_rows(&self) -> Vec<BlobRow>;
    /// Revision blobs and revision attachments, keyed by note.
    fn revision_rows(&self) -> Vec<BlobRow>;
}

/// Blob rows held in memory, typically loaded with a snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryBlobStats {
    pub notes: Vec<BlobRow>,
    pub attachments: Vec<BlobRow>,
    pub revisions: Vec<BlobRow>,
}

impl BlobStatsSource for InMemoryBlobStats {
    fn note_rows(&self) -> Vec<BlobRow> {
        self.notes.clone()
    }

    fn attachment_rows(&self) -> Vec<BlobRow> {
        self.attachments.clone()
    }

    fn revision_rows(&self) -> Vec<BlobRow> {
        self.revisions.clone()
    }
}

/// Derived sizes for one note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSizes {
    pub content_size: u64,
    pub content_and_attachments_size: u64,
    pub content_and_attachments_and_revisions_size: u64,
    pub revision_count: u64,
}

/// Size statistics for every note that has a content blob.
#[derive(Debug, Clone, Default)]
pub struct NoteSizeStats {
    blobs: HashMap<String, HashMap<String, u64>>,
    sizes: HashMap<String, NoteSizes>,
}

impl NoteSizeStats {
    pub fn load(graph: &NoteGraph, source: &dyn BlobStatsSource) -> Self {
        let mut stats = NoteSizeStats::default();

        for row in source.note_rows() {
            if !graph.contains(&row.note_id) {
                log::error!("Note '{}' not found in graph", row.note_id);
                continue;
            }
            stats.sizes.insert(
                row.note_id.clone(),
                NoteSizes {
                    content_size: row.length,
                    ..NoteSizes::default()
                },
            );
            stats
                .blobs
                .insert(row.note_id, HashMap::from([(row.blob_id, row.length)]));
        }

        for row in source.attachment_rows() {
            stats.insert_blob(graph, row);
        }
        for (note_id, blobs) in &stats.blobs {
            if let Some(sizes) = stats.sizes.get_mut(note_id) {
                sizes.content_and_attachments_size = blobs.values().sum();
            }
        }

        for row in source.revision_rows() {
            let note_id = row.note_id.clone();
            let is_revision = row.is_note_revision;
            if stats.insert_blob(graph, row) && is_revision {
                if let Some(sizes) = stats.sizes.get_mut(&note_id) {
                    sizes.revision_count += 1;
                }
            }
        }
        for (note_id, blobs) in &stats.blobs {
            if let Some(sizes) = stats.sizes.get_mut(note_id) {
                sizes.content_and_attachments_and_revisions_size = blobs.values().sum();
            }
        }

        log::debug!("loaded size statistics for {} notes", stats.sizes.len());
        stats
    }

    fn insert_blob(&mut self, graph: &NoteGraph, row: BlobRow) -> bool {
        if !graph.contains(&row.note_id) {
            log::error!("Note '{}' not found in graph", row.note_id);
            return false;
        }
        match self.blobs.get_mut(&row.note_id) {
            Some(blobs) => {
                blobs.insert(row.blob_id, row.length);
                true
            }
            None => {
                log::error!("Did not find '{}' in the note blobs", row.note_id);
                false
            }
        }
    }

    pub fn get(&self, note_id: &str) -> Option<&NoteSizes> {
        self.sizes.get(note_id)
    }

    /// Distinct blobs counted for a note.
    pub fn blob_count(&self, note_id: &str) -> usize {
        self.blobs.get(note_id).map_or(0, HashMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Note;

    fn graph() -> NoteGraph {
        let mut g = NoteGraph::new();
        g.insert_child("root", Note::new("a", "A")).unwrap();
        g.insert_child("root", Note::new("b", "B")).unwrap();
        g
    }

    #[test]
    fn test_shared_blobs_counted_once() {
        let source = InMemoryBlobStats {
            notes: vec![BlobRow::new("a", "blob1", 100)],
            attachments: vec![BlobRow::new("a", "blob2", 50)],
            revisions: vec![
                BlobRow::new("a", "blob1", 100).revision(),
                BlobRow::new("a", "blob3", 30).revision(),
                BlobRow::new("a", "blob4", 5),
            ],
        };
        let stats = NoteSizeStats::load(&graph(), &source);
        let sizes = stats.get("a").unwrap();

        assert_eq!(sizes.content_size, 100);
        assert_eq!(sizes.content_and_attachments_size, 150);
        assert_eq!(sizes.content_and_attachments_and_revisions_size, 185);
        assert_eq!(sizes.revision_count, 2);
        assert_eq!(stats.blob_count("a"), 4);
    }

    #[test]
    fn test_unknown_notes_skipped() {
        let source = InMemoryBlobStats {
            notes: vec![BlobRow::new("ghost", "x", 1), BlobRow::new("b", "y", 2)],
            attachments: vec![BlobRow::new("a", "z", 3)],
            revisions: vec![],
        };
        let stats = NoteSizeStats::load(&graph(), &source);
        assert!(stats.get("ghost").is_none());
        assert!(stats.get("a").is_none());
        assert_eq!(stats.get("b").unwrap().content_and_attachments_size, 2);
    }
}
