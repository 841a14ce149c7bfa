//! Note graph: the read-only collaborator the search engine queries.

mod note;
mod note_graph;
pub mod protected;
pub mod snapshot;
pub mod stats;

pub use note::{Attribute, AttributeType, Branch, Note, NoteType};
pub use note_graph::{HIDDEN_NOTE_ID, NoteGraph, PATH_TITLE_SEPARATOR, ROOT_NOTE_ID};
pub use protected::{NoProtectedSession, ProtectedSession};
pub use snapshot::{LoadedSnapshot, Snapshot, SnapshotFormat, load_snapshot};
pub use stats::{BlobRow, BlobStatsSource, InMemoryBlobStats, NoteSizeStats, NoteSizes};
